//! Reactive runtime core for compiled Tessera programs.
//!
//! A compiled program (state declarations, actions and a view tree, loaded from
//! JSON) is rendered into an in-memory [`Document`] and kept in sync with its
//! [`StateStore`]: every dynamic value is a binding that patches exactly the
//! attribute, text or list it depends on. Keyed lists reuse document nodes across
//! reorders, so focus and input state survive updates.
//!
//! Start with [`App`], or [`render_to_string`] for string mode.

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod eval;
pub mod program;
pub mod render;
pub mod state;
pub mod value;

pub use app::{App, AppOptions, render_to_string};
pub use config::{MoveStrategy, RenderConfig};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticKind, DiagnosticSink, LogSink};
pub use dom::{Document, NodeId};
pub use error::{Error, StateError};
pub use eval::{EvalContext, RouteContext, Tables, evaluate};
pub use program::{CompiledProgram, Expression, Node};
pub use render::{ActionHost, ExternalStep, NoHost, RenderContext, Renderer, RendererOptions};
pub use state::{CookieSource, NoCookies, StateStore, Subscription, UpdateOperation};
pub use value::Value;
