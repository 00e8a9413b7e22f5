//! Application services: content loading, listing, and publishing outputs.

pub mod content;
pub mod error;
pub mod export;
pub mod pagination;
pub mod retry;
pub mod sitemap;
pub mod writing;
