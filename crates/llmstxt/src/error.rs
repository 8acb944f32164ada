//! CLI error types.

use llmstxt_config::ConfigError;
use llmstxt_site::{RewriteError, ScanError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Rewrite(#[from] RewriteError),

    #[error("{0}")]
    Scan(#[from] ScanError),

    #[error("All {0} generation tasks failed")]
    AllTasksFailed(usize),
}
