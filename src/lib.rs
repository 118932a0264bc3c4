pub mod config;
pub mod db;
pub mod pipeline; // Case assembling pipeline

use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use config::JobConfig;
use pipeline::assembly::{
    start_scheduler, AssemblyError, FullModelHeaderParser, HttpBoundaryService,
    HttpCaseImportService, LocalDirectoryStore, PipelineOrchestrator, RunSettings, RunSummary,
    SqliteLedger,
};

/// Options given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Job configuration file, defaults to `~/CgmesAssembling/config.toml`.
    pub config_path: Option<PathBuf>,
    /// Force strict boundary mode regardless of the configuration.
    pub strict: bool,
    /// Run a single pass even when a schedule is configured.
    pub once: bool,
}

pub fn run(options: RunOptions) -> Result<(), AssemblyError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(config::default_config_path);
    let job = JobConfig::load(&config_path)?;
    let settings = run_settings(&job, options.strict);
    tracing::info!(
        config = %config_path.display(),
        origin = %settings.origin,
        directory = %settings.directory,
        strict_mode = settings.strict_mode,
        "Job configuration loaded"
    );

    let interval = if options.once {
        None
    } else {
        job.schedule.interval_secs
    };

    match interval {
        None => run_once(&job, &settings).map(|_| ()),
        Some(secs) => {
            let handle = start_scheduler(Duration::from_secs(secs), move || {
                run_once(&job, &settings).map(|_| ())
            });
            handle.join();
            Ok(())
        }
    }
}

/// Per-run settings from the job configuration.
pub fn run_settings(job: &JobConfig, force_strict: bool) -> RunSettings {
    RunSettings {
        origin: job.acquisition_server.label.clone(),
        directory: job.acquisition_server.cases_directory.clone(),
        strict_mode: force_strict || job.acquisition_server.dependencies_strict_mode,
    }
}

/// Wire the concrete collaborators and run one pass.
/// The ledger is reopened for every run.
pub fn run_once(job: &JobConfig, settings: &RunSettings) -> Result<RunSummary, AssemblyError> {
    let ledger = SqliteLedger::open(&job.ledger_path())?;
    let store = LocalDirectoryStore::new(&job.acquisition_server.root);
    let parser = FullModelHeaderParser::new();
    let boundaries = HttpBoundaryService::new(&job.cgmes_boundary_server.url)?;
    let importer = HttpCaseImportService::new(&job.case_server.url)?;

    PipelineOrchestrator::new(&ledger, &store, &parser, &boundaries, &boundaries, &importer)
        .run(settings)
}
