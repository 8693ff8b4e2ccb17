//! Kconfig parsing and evaluation crate.
//!
//! The engine parses a tree of Kconfig files rooted at a top-level file,
//! builds an in-memory [`Model`] of the symbols, choices, menus, and
//! comments declared there, evaluates the dependency expressions attached to
//! every construct, and reads and writes `.config` files compatibly with the
//! kernel's `conf` tool.
#![warn(clippy::all)]
#![allow(clippy::result_large_err)]
#![warn(missing_docs)]

mod context;
mod tristate;

pub mod configfile;
pub mod model;
pub mod parser;

pub use {
    context::*,
    model::{
        ChoiceGroup, ChoiceId, Item, ItemId, ItemPayload, Model, Symbol, SymbolId, SymbolValue, UserValue, Warning,
    },
    tristate::*,
};
