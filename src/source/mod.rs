//! External data sources
//!
//! This module contains:
//! - The source traits the crawl engine and bulk pool depend on
//! - Crossref, OpenCitations and templated-URL implementations
//! - The per-item relation resolver

mod crossref;
mod opencitations;
mod resolver;
mod resource;
mod traits;

pub use crossref::CrossrefSource;
pub use opencitations::OpenCitationsSource;
pub use resolver::{DependentRelationResolver, RelationUnavailable};
pub use resource::HttpResourceSource;
pub use traits::{PaginatedSource, RelationSource, ResourceSource};
