//! Pattern matching, cursor editing, override dispatch, and the hook
//! lifecycle for the ilweave method-body patching engine.
//!
//! The expected flow: a host registers hooks with a [`Patcher`]. Each hook
//! names an opaque method target and supplies an edit function built from
//! [`Pattern`] searches and [`Cursor`] splices. [`Patcher::load`] captures
//! original bodies, applies the edits to working copies, and installs the
//! results; [`Patcher::unload`] restores the originals. Spliced call sites
//! resolve their behavior in an [`OverrideRegistry`] at execution time, so
//! toggling host settings needs no re-patching.

pub mod cursor;
pub mod error;
pub mod exec;
pub mod hook;
pub mod pattern;
pub mod registry;

pub use cursor::{Cursor, OperandLoader};
pub use error::{Error, Result};
pub use exec::{CallHost, Value, run};
pub use hook::{
    HookId, LifecycleState, LoadReport, MemoryTargets, MethodTargets, Patcher, TargetId,
    UnloadReport,
};
pub use pattern::{Pattern, find_next};
pub use registry::{Override, OverrideRegistry};
