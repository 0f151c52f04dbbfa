pub mod paginator;
pub mod queries;

pub use paginator::{resolve_references, Paginator, PaginatorBuilder, Reference, MAX_REFERENCE_DEPTH};
