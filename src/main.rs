use qcsubmit::command_line::{create_optimization_dataset, create_torsiondrive_dataset};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = clap::Command::new("qcsubmit")
        .about("Build QCFractal datasets from prepared molecule sets")
        .subcommand_required(true)
        .subcommand(create_optimization_dataset::command())
        .subcommand(create_torsiondrive_dataset::command());

    let matches = app.get_matches();

    match matches.subcommand() {
        Some((create_optimization_dataset::NAME, args)) => {
            create_optimization_dataset::action(args).await
        }
        Some((create_torsiondrive_dataset::NAME, args)) => {
            create_torsiondrive_dataset::action(args).await
        }
        Some((other, _args)) => Err(eyre::eyre!("can't handle {}", other)),
        None => Err(eyre::eyre!("no subcommand given")),
    }
}
