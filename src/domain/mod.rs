//! Domain layer: article records, facets, ordering, and their invariants.

pub mod articles;
pub mod error;
pub mod facets;
pub mod frontmatter;
pub mod images;
pub mod listing;
