use thiserror::Error;

use crate::business_actor::BusinessError;
use crate::catalog_actor::CatalogError;
use crate::config::ConfigError;
use crate::search::SearchError;

/// Errors raised while starting or stopping the system.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Catalog client setup failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Users client setup failed: {0}")]
    Business(#[from] BusinessError),
    #[error("Search index setup failed: {0}")]
    Search(#[from] SearchError),
    #[error("Task failed during shutdown: {0}")]
    Shutdown(String),
}
