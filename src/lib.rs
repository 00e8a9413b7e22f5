//! folio: the writing index behind a portfolio site.
//!
//! Articles come from a headless CMS or a directory of Markdown files, are
//! normalized once per load, and are then filtered, ordered featured-first,
//! and paginated on every request without refetching.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
