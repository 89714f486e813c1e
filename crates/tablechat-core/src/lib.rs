// SPDX-License-Identifier: Apache-2.0

//! # tablechat-core
//!
//! Data model, collaborator traits, and error types shared by the tablechat
//! workspace. Nothing in this crate performs I/O.

pub mod error;
pub mod request;
pub mod traits;
pub mod types;

pub use error::{ChatError, ChatResult};
pub use request::{ChatRequest, ToolChoice};
pub use traits::{CatalogBackend, ChatTransport};
pub use types::*;
