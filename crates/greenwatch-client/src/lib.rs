//! Client glue for the Greenwatch backend.
//!
//! [`ApiClient`] owns the [`Session`](greenwatch_types::session::Session) a
//! front end renders from, so signing in through it keeps the navigation gate
//! and the bearer token in step. [`screen::Refreshable`] holds per-screen data
//! that is re-fetched after every mutation.

pub mod client;
pub mod error;
pub mod screen;

pub use client::{ApiClient, Environment, ImageFile, ImageInput};
pub use error::ClientError;
