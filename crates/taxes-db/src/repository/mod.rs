//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Available Repositories
//!
//! - [`package::PackageRepository`] - Per-shop package settings CRUD
//! - [`package::SqliteShopTaxConfigStore`] - Read-only adapter serving tax
//!   settings to `taxes-core`

pub mod package;
