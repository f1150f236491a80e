use std::path::Path;

use super::prelude::*;
use super::{submission_args, submission_options};
use crate::indexing::index_torsions;
use crate::input::read_selected_torsions;
use crate::portal::{DatasetKind, EntryRequest};

pub const NAME: &str = "create-torsiondrive-dataset";

pub const DEFAULT_INPUT: &str = "coverage_selected_torsions.json";
pub const DEFAULT_DATASET_NAME: &str = "OpenFF Gen 2 Torsion Set 2 Coverage";
pub const DEFAULT_TAG: &str = "openff";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Create or extend a TorsionDriveDataset from selected torsions and start computing it")
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .num_args(1)
                .default_value(DEFAULT_INPUT)
                .help("Selected torsions json, extracted from <input>.tar.gz when missing"),
        )
        .arg(
            Arg::new("dataset-name")
                .long("dataset-name")
                .short('n')
                .num_args(1)
                .default_value(DEFAULT_DATASET_NAME),
        )
        .arg(
            Arg::new("client-config")
                .long("client-config")
                .short('c')
                .num_args(1)
                .help("Client configuration file, searched in . and ~/.qca when omitted"),
        )
        .arg(
            Arg::new("update")
                .long("update")
                .action(ArgAction::SetTrue)
                .help("Add to an existing dataset instead of creating one"),
        )
        .arg(
            Arg::new("tag")
                .long("tag")
                .num_args(1)
                .default_value(DEFAULT_TAG),
        )
        .arg(
            Arg::new("no-compute")
                .long("no-compute")
                .action(ArgAction::SetTrue)
                .help("Only build the dataset, do not submit computations"),
        )
        .arg(
            Arg::new("grid-spacing")
                .long("grid-spacing")
                .num_args(1)
                .value_parser(value_parser!(i64))
                .default_value("15")
                .help("Degrees between scan points"),
        )
        .arg(
            Arg::new("energy-upper-limit")
                .long("energy-upper-limit")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .default_value("0.05")
                .help("Energy window of the scan in hartree"),
        )
        .arg(
            Arg::new("strict-connectivity")
                .long("strict-connectivity")
                .action(ArgAction::SetTrue)
                .help("Abort on the first torsion failing the connectivity check"),
        )
        .args(submission_args())
}

pub async fn action(matches: &ArgMatches) -> eyre::Result<()> {
    let input = matches
        .get_one::<String>("input")
        .ok_or(eyre::eyre!("Failed to extract input path"))?;
    let dataset_name = matches
        .get_one::<String>("dataset-name")
        .ok_or(eyre::eyre!("Failed to extract dataset name"))?;
    let client_config = matches.get_one::<String>("client-config");
    let tag = matches.get_one::<String>("tag").map(|t| t.as_str());
    let grid_spacing = matches
        .get_one::<i64>("grid-spacing")
        .copied()
        .ok_or(eyre::eyre!("Failed to extract grid spacing"))?;
    let energy_upper_limit = matches
        .get_one::<f64>("energy-upper-limit")
        .copied()
        .ok_or(eyre::eyre!("Failed to extract energy upper limit"))?;

    let mut options = submission_options(matches)?;
    options.check_connectivity = true;
    options.strict_connectivity = matches.get_flag("strict-connectivity");

    let torsions = read_selected_torsions(input)?;
    let entries = index_torsions(&torsions, grid_spacing)?;

    let job = TorsionDriveJob {
        dataset_name,
        update: matches.get_flag("update"),
        spec: torsiondrive_specification(&options.spec_name),
        requests: torsiondrive_requests(entries, Some(energy_upper_limit)),
        compute: !matches.get_flag("no-compute"),
        tag,
    };

    if matches.get_flag("dry-run") {
        let client = MemoryPortal::new();
        job.run(&client, options).await?;
    } else {
        let client = FractalClient::from_file(client_config.map(Path::new))?;
        job.run(&client, options).await?;
    }

    Ok(())
}

pub struct TorsionDriveJob<'a> {
    pub dataset_name: &'a str,
    pub update: bool,
    pub spec: SpecificationRequest,
    pub requests: Vec<EntryRequest>,
    pub compute: bool,
    pub tag: Option<&'a str>,
}

impl TorsionDriveJob<'_> {
    pub async fn run<C: PortalClient>(
        self,
        client: &C,
        options: SubmissionOptions,
    ) -> eyre::Result<SubmissionReport> {
        let submitter = Submitter::new(client, options);

        let mut dataset = submitter
            .prepare_dataset(
                DatasetKind::TorsionDrive,
                self.dataset_name,
                self.update,
                self.spec,
            )
            .await?;
        let report = submitter.submit(&mut dataset, self.requests).await?;

        if self.compute {
            let response = submitter.compute(&dataset, self.tag).await?;
            log::info!("{}", response);
        }

        Ok(report)
    }
}
