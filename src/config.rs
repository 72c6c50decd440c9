use std::path::PathBuf;
use std::time::Duration;

use crate::openlibrary::DEFAULT_API_BASE;

const HTTP_TIMEOUT_SECS: u64 = 6;
const APP_DIR_NAME: &str = "booktrail";
const DB_FILE_NAME: &str = "booktrail.db";

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Log every lookup at info level instead of debug.
    pub debug: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            debug: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub lookup: LookupConfig,
}

impl AppConfig {
    /// Reads `BOOKTRAIL_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("BOOKTRAIL_DATA_DIR")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let mut lookup = LookupConfig::default();
        if let Some(base_url) = var("BOOKTRAIL_OPENLIBRARY_URL").filter(|value| !value.trim().is_empty()) {
            lookup.base_url = base_url.trim().to_string();
        }
        match var("BOOKTRAIL_HTTP_TIMEOUT_SECS").map(|value| value.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => lookup.timeout = Duration::from_secs(secs),
            Some(_) => log::warn!(
                "ignoring BOOKTRAIL_HTTP_TIMEOUT_SECS; using {}s",
                HTTP_TIMEOUT_SECS
            ),
            None => {}
        }
        lookup.debug = var("BOOKTRAIL_METADATA_DEBUG")
            .map(|value| is_truthy(&value))
            .unwrap_or(false);

        Self { data_dir, lookup }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR_NAME)))
}

fn is_truthy(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    lowered == "1" || lowered == "true" || lowered == "yes" || lowered == "on"
}
