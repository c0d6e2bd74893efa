//! External recommendation-engine invocation.
//!
//! The engine is an opaque external process: it receives a formatted input
//! string via `--input=` and a variant selector via `--model=`, and writes
//! its recommendations to stdout. This module provides the [`EngineRunner`]
//! trait as the mockable seam plus [`CommandRunner`], a blocking subprocess
//! implementation with a bounded wall-clock timeout.

mod invoker;

pub use invoker::{
    CommandRunner, CommandRunnerBuilder, ENGINE_CMD_ENV, EngineError, EngineRunner, ModelKind,
    ParseModelKindError,
};
