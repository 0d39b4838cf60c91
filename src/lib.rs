// Clippy allows for reasonable defaults
// These suppress warnings where the suggested change doesn't improve readability
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::derivable_impls)] // Explicit Default impls can be clearer
#![allow(clippy::field_reassign_with_default)] // Builder pattern is clearer
#![allow(clippy::unnecessary_map_or)] // map_or can be clearer than alternatives
#![allow(clippy::needless_borrow)] // Explicit borrows can clarify ownership
#![allow(clippy::double_ended_iterator_last)] // .last() on chains can be clearer
#![allow(clippy::format_in_format_args)] // Nested format! can be clearer for complex strings

// Module declarations
pub mod completion;
pub mod config;
pub mod error;
pub mod file_storage;
pub mod models;
pub mod research;
pub mod shutdown;
pub mod templates;

// Server module (HTTP API)
pub mod server;

pub use error::{LabError, LabResult};
pub use models::*;
