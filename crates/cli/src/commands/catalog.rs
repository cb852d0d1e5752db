//! Catalog file commands.
//!
//! # Usage
//!
//! ```bash
//! # Check a catalog before pointing the storefront at it
//! cartbridge catalog validate crates/storefront/catalog.json
//! ```

use std::path::Path;

use cartbridge_storefront::catalog::{CatalogError, StaticCatalog};

/// Parse and validate a catalog file.
///
/// # Returns
///
/// The number of products in the catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid catalog JSON,
/// or fails validation (duplicate IDs, negative prices, mixed currencies).
pub fn validate(path: &Path) -> Result<usize, CatalogError> {
    tracing::info!("Validating catalog at {}", path.display());
    let catalog = StaticCatalog::load(path)?;
    Ok(catalog.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_catalog(name: &str, json: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "cartbridge-cli-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_validate_counts_products() {
        let path = write_catalog(
            "valid",
            r#"{"products": [
                {"id": "tee", "name": "Tee", "price": {"amount": "20.00", "currency_code": "USD"}},
                {"id": "mug", "name": "Mug", "price": {"amount": "12.50", "currency_code": "USD"}}
            ]}"#,
        );

        assert_eq!(validate(&path).unwrap(), 2);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let path = write_catalog(
            "duplicate",
            r#"{"products": [
                {"id": "tee", "name": "Tee", "price": {"amount": "20.00", "currency_code": "USD"}},
                {"id": "tee", "name": "Tee again", "price": {"amount": "21.00", "currency_code": "USD"}}
            ]}"#,
        );

        assert!(matches!(validate(&path), Err(CatalogError::Duplicate(_))));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_validate_missing_file() {
        let missing = std::env::temp_dir().join("cartbridge-cli-does-not-exist.json");
        assert!(validate(&missing).is_err());
    }
}
