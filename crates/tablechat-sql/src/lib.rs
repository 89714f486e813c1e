// SPDX-License-Identifier: Apache-2.0

//! # tablechat-sql
//!
//! SQL text helpers: quoting, the read-only guard applied to model-supplied
//! queries, and the information_schema queries behind relationship discovery.

pub mod guard;
pub mod quote;
pub mod relationships;

pub use guard::{ensure_read_only, SqlGuardError};
pub use quote::{quote_ident, quote_literal};
pub use relationships::{constraint_query, schema_columns_query, Direction};
