//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login, password changes and JWT issuing/decoding live here;
//! the HTTP layer only extracts tokens and maps `AuthError` to status codes.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use domain::{Actor, Claims};
pub use errors::AuthError;
pub use service::{decode_token, AuthConfig, AuthService};
