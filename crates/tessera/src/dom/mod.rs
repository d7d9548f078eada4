//! In-memory DOM.
//!
//! The renderer writes into a [`Document`]; a browser host mirrors it, string mode
//! serializes it with [`to_html`].

mod document;
mod html;

pub use document::{DomStats, Document, EventCallback, ListenerId, NodeId, NodeKind};
pub use html::{HtmlOptions, inner_html, to_html};
