//! Typed HTTP client for the booking API.
//!
//! Every call goes through [`ApiClient::handle_request`], which injects the
//! stored bearer token and unwraps the `{ success, data, message }` envelope.

pub mod api;
pub mod error;
pub mod headers;
pub mod http;
pub mod token;
pub mod types;

pub use error::{ClientError, ClientResult};
pub use headers::auth_headers;
pub use http::ApiClient;
pub use token::{MemoryTokenStore, TokenStore};
