//! CouchDB game store over the HTTP API, with `_rev` as the version token.

mod config;
mod error;
mod models;
mod store;

pub use config::{CouchConfig, DEFAULT_DATABASE};
pub use error::CouchDaoError;
pub use store::CouchGameStore;
