//! MongoDB game store. Documents carry an integer `version` used as the compare-and-swap key.

mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::{DEFAULT_DATABASE, MongoConfig};
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
