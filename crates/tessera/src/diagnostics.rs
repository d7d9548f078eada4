//! Diagnostics reported while rendering.
//!
//! Problems the compiler should have rejected (unknown operations, disallowed local
//! steps) and data problems the renderer recovers from (duplicate keys) are reported
//! here instead of aborting the render.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Two items of one keyed list snapshot produced the same key.
    DuplicateKey,
    /// A state mutation was rejected by the store.
    RejectedUpdate,
    /// A component-local action tried to run a step outside the state-only subset.
    UnsupportedLocalStep,
    /// An event handler named an action that does not exist.
    UnknownAction,
    /// An external step reached a host that does not handle it.
    UnhandledStep,
    /// A portal target could not be resolved.
    PortalTarget,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::DuplicateKey => "duplicate-key",
            DiagnosticKind::RejectedUpdate => "rejected-update",
            DiagnosticKind::UnsupportedLocalStep => "unsupported-local-step",
            DiagnosticKind::UnknownAction => "unknown-action",
            DiagnosticKind::UnhandledStep => "unhandled-step",
            DiagnosticKind::PortalTarget => "portal-target",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Receiver for diagnostics. Reporting never fails and never panics.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
    }
}

/// Sink that keeps every diagnostic in memory, for tests and the CLI `check` command.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    diagnostics: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        log::debug!("{diagnostic}");
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}
