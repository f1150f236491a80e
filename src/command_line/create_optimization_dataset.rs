use std::path::Path;

use super::prelude::*;
use super::{submission_args, submission_options};
use crate::indexing::{index_molecules, DEFAULT_ID_FIELD};
use crate::input::read_molecule_records;
use crate::portal::{DatasetKind, EntryRequest};

pub const NAME: &str = "create-optimization-dataset";

pub fn command() -> Command {
    Command::new(NAME)
        .about("Create an OptimizationDataset from a list of {initial_molecules, cmiles_identifiers}")
        .arg(
            Arg::new("input_json")
                .required(true)
                .help("Input json file that contains a list of {initial_molecules,cmiles_identifiers}"),
        )
        .arg(
            Arg::new("dataset_name")
                .required(true)
                .help("Name of the OptimizationDataset to be created"),
        )
        .arg(
            Arg::new("client_config")
                .required(true)
                .help("Configuration file for connecting to the server"),
        )
        .arg(
            Arg::new("qm_method")
                .short('m')
                .long("qm_method")
                .num_args(1)
                .default_value(DEFAULT_QM_METHOD)
                .help("QM method to use for optimization"),
        )
        .arg(
            Arg::new("qm_basis")
                .short('b')
                .long("qm_basis")
                .num_args(1)
                .default_value(DEFAULT_QM_BASIS)
                .help("QM basis to use for optimization"),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .action(ArgAction::SetTrue)
                .help("Start compute for the created dataset"),
        )
        .arg(
            Arg::new("tag")
                .long("tag")
                .num_args(1)
                .help("Tag the computations are submitted under"),
        )
        .arg(
            Arg::new("id-field")
                .long("id-field")
                .num_args(1)
                .default_value(DEFAULT_ID_FIELD)
                .help("cmiles identifier used as the base of every entry name"),
        )
        .args(submission_args())
}

pub async fn action(matches: &ArgMatches) -> eyre::Result<()> {
    let input_json = matches
        .get_one::<String>("input_json")
        .ok_or(eyre::eyre!("Failed to extract input json"))?;
    let dataset_name = matches
        .get_one::<String>("dataset_name")
        .ok_or(eyre::eyre!("Failed to extract dataset name"))?;
    let client_config = matches
        .get_one::<String>("client_config")
        .ok_or(eyre::eyre!("Failed to extract client config"))?;
    let qm_method = matches
        .get_one::<String>("qm_method")
        .ok_or(eyre::eyre!("Failed to extract qm method"))?;
    let qm_basis = matches
        .get_one::<String>("qm_basis")
        .ok_or(eyre::eyre!("Failed to extract qm basis"))?;
    let id_field = matches
        .get_one::<String>("id-field")
        .ok_or(eyre::eyre!("Failed to extract id field"))?;
    let tag = matches.get_one::<String>("tag").map(|t| t.as_str());
    let start = matches.get_flag("start");
    let options = submission_options(matches)?;

    let records = read_molecule_records(input_json)?;
    let index = index_molecules(&records, id_field)?;
    let requests = optimization_requests(&index);

    let spec = optimization_specification(&options.spec_name, qm_method, qm_basis);
    let job = OptimizationJob {
        dataset_name,
        spec,
        requests,
        start,
        tag,
    };

    if matches.get_flag("dry-run") {
        let client = MemoryPortal::new();
        job.run(&client, options).await?;
    } else {
        let client = FractalClient::from_file(Some(Path::new(client_config)))?;
        job.run(&client, options).await?;
    }

    Ok(())
}

pub struct OptimizationJob<'a> {
    pub dataset_name: &'a str,
    pub spec: SpecificationRequest,
    pub requests: Vec<EntryRequest>,
    pub start: bool,
    pub tag: Option<&'a str>,
}

impl OptimizationJob<'_> {
    pub async fn run<C: PortalClient>(
        self,
        client: &C,
        options: SubmissionOptions,
    ) -> eyre::Result<SubmissionReport> {
        let submitter = Submitter::new(client, options);

        let mut dataset = submitter
            .prepare_dataset(DatasetKind::Optimization, self.dataset_name, false, self.spec)
            .await?;
        let report = submitter.submit(&mut dataset, self.requests).await?;

        if self.start {
            let response = submitter.compute(&dataset, self.tag).await?;
            log::info!("{}", response);
        }

        Ok(report)
    }
}
