//! Request models with validation at construction
//!
//! All user input is validated before it reaches a repository.
//! Invalid input returns `ValidationError` (400), never a panic.

pub mod banking;
pub mod core_entities;
pub mod pagination;
pub mod patch;

pub use pagination::{Paginated, Pagination, PaginationParams};
pub use stoactl_core::ValidationError;
