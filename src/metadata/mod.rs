// SPDX-License-Identifier: Apache-2.0

//! Catalog metadata
//!
//! [`MetadataClient`] is what the tools call. It is backed by a
//! [`tablechat_core::CatalogBackend`]: Unity Catalog over HTTP in production,
//! [`InMemoryCatalog`] in tests.

pub mod client;
pub mod memory;
pub mod relationships;
pub mod statement;
pub mod unity;

pub use client::{MetadataClient, DEFAULT_SQL_WAIT_SECS};
pub use memory::InMemoryCatalog;
pub use unity::UnityCatalogBackend;
