//! HTTP handlers for the `/v1` catalog resources.

pub(crate) mod movies;
pub(crate) mod tokens;
pub(crate) mod users;
