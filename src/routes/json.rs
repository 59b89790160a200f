//! JSON body extraction with API-shaped rejections.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use axum_valid::HasValidate;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Json` extractor whose rejections answer 400 with the usual `{message}` body, whether the
/// body is malformed, mistyped or sent without a JSON content type.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

impl<T> HasValidate for ApiJson<T> {
    type Validate = T;

    fn get_validate(&self) -> &T {
        &self.0
    }
}
