//! CLI subcommand implementations.

use cartbridge_storefront::catalog::CatalogError;
use cartbridge_storefront::stores::RemoteError;
use thiserror::Error;

pub mod catalog;
pub mod remote;

/// Errors a CLI command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Catalog file could not be loaded.
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart service call failed.
    #[error("cart service: {0}")]
    Remote(#[from] RemoteError),

    /// Output could not be serialized.
    #[error("output: {0}")]
    Output(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_prefixes_source() {
        let err = CliError::from(RemoteError::Unavailable("down".to_string()));
        assert_eq!(
            err.to_string(),
            "cart service: cart service unavailable: down"
        );
    }
}
