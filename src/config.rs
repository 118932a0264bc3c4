use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::pipeline::assembly::AssemblyError;

/// Application-level constants
pub const APP_NAME: &str = "CgmesAssembling";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Import requests carry a whole case archive, so they get a long timeout.
pub const CASE_IMPORT_TIMEOUT_SECS: u64 = 120;

/// Lookups against the boundary server are small JSON documents.
pub const BOUNDARY_LOOKUP_TIMEOUT_SECS: u64 = 30;

/// Get the application data directory
/// ~/CgmesAssembling/ (falls back to the working directory without a home)
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the assembling ledger
pub fn default_ledger_path() -> PathBuf {
    app_data_dir().join("ledger.db")
}

/// Default location of the job configuration file
pub fn default_config_path() -> PathBuf {
    app_data_dir().join("config.toml")
}

/// Expand a leading `~` to the home directory. Other paths are returned as given.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Log filter used when `RUST_LOG` is not set
pub fn default_log_filter() -> &'static str {
    "info,cgmes_assembling_lib=debug"
}

// ═══════════════════════════════════════════════════════════
// Job configuration
// ═══════════════════════════════════════════════════════════

/// Job configuration, one TOML table per external server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobConfig {
    pub acquisition_server: AcquisitionServerConfig,
    pub case_server: ServiceConfig,
    pub cgmes_boundary_server: ServiceConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AcquisitionServerConfig {
    /// Root of the mounted acquisition file store.
    pub root: PathBuf,
    /// Directory (relative to `root`) where profile files are deposited.
    pub cases_directory: String,
    /// Origin label recorded in the ledger for every file of this store.
    pub label: String,
    #[serde(default)]
    pub dependencies_strict_mode: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleConfig {
    /// Seconds between two runs. Absent means a single run.
    pub interval_secs: Option<u64>,
}

impl JobConfig {
    /// Read and parse a TOML job configuration file.
    pub fn load(path: &Path) -> Result<Self, AssemblyError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AssemblyError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, AssemblyError> {
        let mut config: JobConfig =
            toml::from_str(raw).map_err(|e| AssemblyError::Config(e.to_string()))?;
        config.validate()?;
        config.acquisition_server.root = expand_home(&config.acquisition_server.root);
        config.ledger.path = config.ledger.path.as_deref().map(expand_home);
        Ok(config)
    }

    fn validate(&self) -> Result<(), AssemblyError> {
        if self.acquisition_server.label.trim().is_empty() {
            return Err(AssemblyError::Config(
                "acquisition-server.label must not be empty".into(),
            ));
        }
        if self.schedule.interval_secs == Some(0) {
            return Err(AssemblyError::Config(
                "schedule.interval-secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger.path.clone().unwrap_or_else(default_ledger_path)
    }
}
