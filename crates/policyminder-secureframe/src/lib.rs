//! Secureframe personnel sources: bearer-token GraphQL and access-key REST.

#[cfg(feature = "http")]
mod error;
#[cfg(feature = "http")]
pub mod graphql;
#[cfg(feature = "http")]
pub mod rest;

#[cfg(feature = "http")]
pub use error::SecureframeError;
#[cfg(feature = "http")]
pub use graphql::{Company, GraphqlClient};
#[cfg(feature = "http")]
pub use rest::RestClient;
