//! MongoDB connection settings.

use std::env;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

/// Database used when `MONGO_DB` is not set.
pub const DEFAULT_DATABASE: &str = "hunt_back";
const APP_NAME: &str = "hunt-back";

/// Parsed driver options plus the database holding the `games` collection.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the URI.
    pub options: ClientOptions,
    /// Database holding the `games` collection.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri`, tagging connections with the application name unless the URI sets one.
    pub async fn from_uri(uri: &str, database_name: Option<&str>) -> MongoResult<Self> {
        let mut options = ClientOptions::parse(uri).await.map_err(|source| {
            MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            }
        })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());

        Ok(Self {
            options,
            database_name: database_name.unwrap_or(DEFAULT_DATABASE).to_owned(),
        })
    }

    /// Read `MONGO_URI` (required) and `MONGO_DB`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri =
            env::var("MONGO_URI").map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let database = env::var("MONGO_DB").ok().filter(|name| !name.is_empty());
        Self::from_uri(&uri, database.as_deref()).await
    }
}
