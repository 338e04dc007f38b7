//! # Memory Management
//!
//! Raw blocks and column layouts backing archetype storages.
//!
//! ## Design Philosophy
//!
//! One allocation per storage capacity:
//! - Columns are carved out of a single block
//! - Growth happens only on explicit reserve
//! - Dead slots can be poisoned to surface stale reads

mod arena;
mod layout;

pub use arena::Arena;
pub use layout::{align_up, ColumnLayout};
