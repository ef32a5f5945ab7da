//! Pagination helpers for the service layer
//!
//! Request/response shapes live in `common::pagination`; this module runs a
//! SeaORM select as one counted page.

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};

pub use common::pagination::{total_pages, Page, Pagination};

use crate::errors::ServiceError;

/// Count and fetch one page of `select`.
pub async fn fetch_page<E>(db: &DatabaseConnection, select: Select<E>, opts: Pagination) -> Result<Page<E::Model>, ServiceError>
where
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let (page_idx, limit) = opts.normalize();
    // SeaORM's paginate uses 0-based page index internally via fetch_page
    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page::new(items, opts, total))
}

/// `%term%` for case-insensitive LIKE matching against `LOWER(col)`.
pub fn like_pattern(term: &str) -> String {
    let escaped = term.trim().to_lowercase().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}
