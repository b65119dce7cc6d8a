//! Core types, derived views, and trait definitions for the planner catalog.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::CatalogStore`]; the HTTP layer talks to
//! [`catalog::Catalog`], which owns the traveling-visit aggregation.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod image;
pub mod page;
pub mod project;
pub mod season;
pub mod soul;
pub mod store;
pub mod visit;

pub use error::{Error, Result};

#[cfg(test)]
mod fixtures;

/// Primary key of a season row.
pub type SeasonId = i64;
/// Primary key of a soul row.
pub type SoulId = i64;
/// Primary key of a visit row.
pub type VisitId = i64;
/// Primary key of an image row.
pub type ImageId = i64;
