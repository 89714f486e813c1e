// SPDX-License-Identifier: Apache-2.0

//! Tools the model can call

pub mod definitions;
pub mod format;
pub mod registry;

pub use definitions::ToolKind;
pub use registry::ToolRegistry;
