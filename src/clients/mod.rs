//! Client handles: typed wrappers over the actors and the external services.

#[macro_use]
mod macros;

pub mod business_client;
pub mod cached_catalog;
pub mod catalog_client;
pub mod group_client;
pub mod http;
pub mod order_client;
pub mod order_store;

pub use business_client::*;
pub use cached_catalog::*;
pub use catalog_client::*;
pub use group_client::*;
pub use http::*;
pub use order_client::*;
pub use order_store::*;
