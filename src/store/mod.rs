//! Persistence layer: the `SignalStore` trait and its backends.

pub mod libsql_backend;
pub mod migrations;
pub mod rest_backend;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use rest_backend::RestStore;
pub use traits::SignalStore;
