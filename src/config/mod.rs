use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every run. CLI flags take precedence over these.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Rules file.
    #[serde(default)]
    pub filters: Option<PathBuf>,
    /// File holding the id of the newest post already processed.
    #[serde(default)]
    pub cursor: Option<PathBuf>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    /// Posts examined per run, newest first.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filters: None,
            cursor: None,
            subject_prefix: default_subject_prefix(),
            batch_limit: default_batch_limit(),
        }
    }
}

fn default_subject_prefix() -> String {
    "Price Alert".to_string()
}

fn default_batch_limit() -> usize {
    20
}

impl Settings {
    /// Read the optional settings file, then `DEALWATCH_*` environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let settings = builder
            .add_source(::config::Environment::with_prefix("DEALWATCH").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
