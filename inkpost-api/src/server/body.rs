//! Request and response bodies whose failures become [`ServerError`]s.

use crate::server::ServerError;
use axum::{
    Form, Json as AxumJson,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use serde::{Serialize, de::DeserializeOwned};

/// JSON response. Serialization failures turn into a 500 reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(json) => (TypedHeader(ContentType::json()), json).into_response(),
            Err(err) => ServerError::JsonResponse(err).into_response(),
        }
    }
}

/// A request body sent either as JSON or as an urlencoded form.
///
/// JSON is used when the content type says so; everything else goes through
/// the form extractor and is rejected there if it isn't a form either.
#[derive(Clone, Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let AxumJson(value) = AxumJson::<T>::from_request(request, state).await?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(request, state).await?;
            Ok(Self(value))
        }
    }
}
