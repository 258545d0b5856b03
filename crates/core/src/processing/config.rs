//! Processor definitions as they arrive from configuration.

use serde::Deserialize;

/// One `[[processor]]` entry from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessorConfig {
    pub name: String,
    /// Regular expression matched against the submitted URL.
    pub pattern: String,
    pub command: String,
    /// Argument templates; `{url}` is replaced with the job's URL.
    #[serde(default)]
    pub args: Vec<String>,
    /// Output directory. Defaults to `~/Videos`; a leading `~` is expanded.
    #[serde(default)]
    pub target_dir: Option<String>,
    /// Run in a private temp directory and move files on success.
    /// Defaults to `true`.
    #[serde(default)]
    pub isolate: Option<bool>,
}

/// A processor definition that cannot be turned into a processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorConfigError {
    #[error("processor '{name}': invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        name: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("processor '{name}': command must not be empty")]
    MissingCommand { name: String },
}
