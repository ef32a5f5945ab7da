//! Shared building blocks for every crate in the booking workspace:
//! response envelope, pagination, logging setup, metrics and startup checks.

pub mod types;
pub mod utils;
pub mod pagination;
pub mod env;
pub mod metrics;

pub use pagination::{Page, Pagination};
pub use types::{ApiResponse, Health};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }
}
