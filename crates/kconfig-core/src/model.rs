//! In-memory model of a parsed Kconfig tree.
//!
//! The model is built once from a parsed [`KConfig`][crate::parser::KConfig] hierarchy and is
//! structurally immutable thereafter: only user values, choice selections, and the memoized
//! value caches change. Symbols, choices, and item-tree nodes are owned by the [`Model`] and
//! referenced by [`slotmap`] handles, never by owning pointers; this keeps the `select`/`imply`
//! back-edges acyclic at the ownership level.

/// Lowering of parsed blocks into the interned model.
pub mod build;
/// Choice groups and their election state.
pub mod choice;
/// The [`Model`] type and its query/mutation surface.
pub mod engine;
/// Expression evaluation over the current model state.
pub mod eval;
/// Handle-based dependency expressions.
pub mod expr;
/// The ordered item tree driving display and `.config` output.
pub mod item;
/// Symbol storage and its flattened properties.
pub mod symbol;
/// The value engine: visibility, derivation, ranges, and elections.
pub mod value;

pub use {choice::*, engine::*, expr::*, item::*, symbol::*};
