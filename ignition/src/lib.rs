pub mod auth;
pub mod context;
pub mod error;
pub mod organization;
pub mod routes;
pub mod session;
pub mod tenant;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
