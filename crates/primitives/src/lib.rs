//! Core types for snippet-aware text editing: character ranges, change sets,
//! and a mark-carrying text buffer.

#![cfg_attr(test, allow(unused_crate_dependencies))]

/// Text buffer with bias-carrying marks and tagged edit notifications.
pub mod buffer;
/// Character index and length types plus span helpers.
pub mod range;
/// Change set primitives: operations, position mapping, composition.
pub mod transaction;

pub use buffer::{Buffer, BufferEdit, EditOrigin, MarkId};
pub use range::{CharIdx, CharLen};
pub use ropey::{Rope, RopeSlice};
pub use transaction::{Bias, Change, ChangeSet, Operation, Transaction};
