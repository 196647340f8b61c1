#![deny(warnings)]

//! System-dynamics evaluation engine.
//!
//! A model is a table of named numeric variables. Each variable is recomputed
//! once per tick from a base value folded through an ordered list of
//! modifiers. Variables are evaluated in ascending priority; a reference to
//! another variable observes that variable's fresh value only when its
//! priority is strictly lower than the referencing variable's, and its
//! previous-tick value otherwise. This lets stocks reference themselves and
//! lets staged converters and flows form a single-pass pipeline without cycle
//! detection.

mod engine;
mod error;
mod model;

pub use engine::{
    group_thousands, Diagnostic, Dump, DumpRow, Engine, EngineConfig, ReferencePolicy,
    TickReport,
};
pub use error::{EngineError, ModelError};
pub use model::{
    Model, Modifier, ModifierKind, Reference, VariableDef, DEFAULT_PRIORITY,
    UNSET_SOURCE_PRIORITY,
};
