pub mod auth;
pub mod file;
pub mod post;
pub mod role;
pub mod user;

use crate::{
    model::{
        auth::InvalidSessionTokenHashError, file::InvalidFileNameError,
        post::InvalidPostError, user::InvalidUsernameError,
    },
    util::{NonPositiveDurationError, TimestampOutOfRangeError},
};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    Post(#[from] InvalidPostError),
    #[error(transparent)]
    FileName(#[from] InvalidFileNameError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidSessionTokenHashError),
    #[error(transparent)]
    Timestamp(#[from] TimestampOutOfRangeError),
    #[error("Like count was negative: {0}")]
    NegativeLikeCount(i64),
}

/// String-backed id, tagged with a marker type so ids of different tables can't be mixed up.
#[derive_where(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(String, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into(), PhantomData)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<String> for Id<Marker> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<&str> for Id<Marker> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for String {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}
