pub mod create_optimization_dataset;
pub mod create_torsiondrive_dataset;

pub mod prelude {
    pub use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

    pub use crate::portal::{FractalClient, MemoryPortal, PortalClient};
    pub use crate::submission::*;
}

use prelude::*;

/// Flags both dataset commands understand.
pub fn submission_args() -> Vec<Arg> {
    vec![
        Arg::new("spec-name")
            .long("spec-name")
            .num_args(1)
            .default_value(DEFAULT_SPEC_NAME)
            .help("Name of the specification registered on the dataset"),
        Arg::new("batch-size")
            .long("batch-size")
            .num_args(1)
            .value_parser(value_parser!(usize))
            .default_value("30")
            .help("Save the dataset after this many added entries, 0 saves only at the end"),
        Arg::new("dry-run")
            .long("dry-run")
            .action(ArgAction::SetTrue)
            .help("Run against an in-process server instead of the configured one"),
    ]
}

pub fn submission_options(matches: &ArgMatches) -> eyre::Result<SubmissionOptions> {
    let spec_name = matches
        .get_one::<String>("spec-name")
        .ok_or(eyre::eyre!("Failed to extract spec name"))?;
    let batch_size = matches
        .get_one::<usize>("batch-size")
        .copied()
        .ok_or(eyre::eyre!("Failed to extract batch size"))?;

    Ok(SubmissionOptions {
        spec_name: spec_name.clone(),
        batch_size,
        show_progress: !matches.get_flag("dry-run"),
        ..Default::default()
    })
}
