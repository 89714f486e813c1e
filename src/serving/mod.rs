// SPDX-License-Identifier: Apache-2.0

//! Model serving
//!
//! [`HttpServingClient`] is the production [`tablechat_core::ChatTransport`];
//! `wire` and `extract` turn its raw payloads into assistant turns and text.

pub mod extract;
pub mod http;
pub mod wire;

pub use extract::{extract_text, ExtractionStrategy};
pub use http::HttpServingClient;
pub use wire::{encode_request, parse_assistant_turn, AssistantTurn};
