//! REST collaborator interface, its HTTP implementation, and channel name resolution.

pub mod api;
pub mod resolver;
pub mod rest;

/// Trait implemented by REST collaborators.
pub use api::MessagingApi;
/// Channel name → id cache.
pub use resolver::ChannelResolver;
/// reqwest-backed REST client.
pub use rest::{DEFAULT_API_BASE_URL, RestClient};
