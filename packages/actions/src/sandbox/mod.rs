//! # Custom-code sandbox
//!
//! `custom.code` steps run scripts in a small JavaScript-flavoured language.
//! Scripts see nothing but five capabilities:
//!
//! - `state`: `get/set/delete/has` on the shared state bag
//! - `visibility`: `show/hide/toggle/isVisible`
//! - `events`: `emit(name, payload?)`
//! - `console`: `log/info/warn/error`, routed to a [`Console`]
//! - `context`: `get/set` on the invocation's context state, plus the
//!   read-only `pageId`, `widgetId` and `triggerData`
//!
//! Every statement, loop iteration and padded array slot costs one unit of
//! fuel, as does each element copied when a variable holding an array or
//! object is read. Runaway loops end with [`ScriptError::FuelExhausted`]
//! instead of hanging the workflow. Source nesting is capped at parse time
//! ([`ScriptError::TooDeep`]), and values are capped in nesting depth and
//! string length, so no script can exhaust the stack.

pub mod ast;
pub mod error;
mod eval;
pub mod lexer;
pub mod parser;

pub use error::{format_script_error, ScriptError, ScriptResult};

use crate::events::EventBus;
use crate::state::{ExecutionContext, SharedState};
use crate::visibility::VisibilityControl;
use serde_json::Value;
use std::sync::Mutex;

pub const DEFAULT_FUEL: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
}

/// Destination of `console.*` calls
pub trait Console: Send + Sync {
    fn write(&self, level: ConsoleLevel, message: &str);
}

/// Console that forwards to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => tracing::info!(target: "widgetforge::script", "{}", message),
            ConsoleLevel::Warn => tracing::warn!(target: "widgetforge::script", "{}", message),
            ConsoleLevel::Error => tracing::error!(target: "widgetforge::script", "{}", message),
        }
    }
}

/// Console that keeps every line, for tests and the CLI
#[derive(Debug, Default)]
pub struct RecordingConsole {
    lines: Mutex<Vec<(ConsoleLevel, String)>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(ConsoleLevel, String)> {
        self.lines.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, line)| line).collect()
    }
}

impl Console for RecordingConsole {
    fn write(&self, level: ConsoleLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((level, message.to_string()));
    }
}

/// Everything a script may touch
pub struct Capabilities<'a> {
    pub state: &'a SharedState,
    pub visibility: &'a VisibilityControl,
    pub events: &'a EventBus,
    pub console: &'a dyn Console,
    pub context: &'a mut ExecutionContext,
}

#[derive(Debug, Clone, Copy)]
pub struct Sandbox {
    fuel: u64,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self { fuel: DEFAULT_FUEL }
    }
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    /// Parse without running
    pub fn check(&self, source: &str) -> ScriptResult<()> {
        parser::parse(source).map(|_| ())
    }

    /// Parse and run a script. Returns the value of a top-level `return`,
    /// or null.
    pub fn run(&self, source: &str, capabilities: Capabilities<'_>) -> ScriptResult<Value> {
        let script = parser::parse(source)?;
        eval::Evaluator::new(capabilities, self.fuel).run(&script)
    }
}
