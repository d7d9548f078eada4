//! Elements and text nodes.

use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use super::actions::handle_event;
use super::binding::bind;
use super::scope::Cleanup;
use super::{RenderContext, RenderedRange, Renderer};
use crate::dom::{Document, NodeId};
use crate::program::{EventHandler, Expression, Node, Prop};
use crate::value::Value;

pub(super) struct ElementParts<'a> {
    pub tag: &'a str,
    pub props: &'a IndexMap<String, Prop>,
    pub children: &'a [Node],
    pub reference: Option<&'a str>,
}

/// Creates the element, renders its children into it while it is still detached,
/// wires props and handlers, then inserts it.
pub(super) fn render_element(
    renderer: &Renderer,
    ctx: &RenderContext,
    parts: ElementParts<'_>,
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let element = renderer.document().borrow_mut().create_element(parts.tag);

    for child in parts.children {
        renderer.render(child, ctx, element, None);
    }

    for (name, prop) in parts.props {
        match prop {
            Prop::Value(expr) => {
                let document = Rc::downgrade(renderer.document());
                let name = name.clone();
                bind(renderer, ctx, expr.clone(), move |value| {
                    if let Some(document) = document.upgrade() {
                        apply_prop(&mut document.borrow_mut(), element, &name, value);
                    }
                });
            }
            Prop::Handler(handler) => attach_handler(renderer, ctx, element, handler),
        }
    }

    if let Some(name) = parts.reference {
        register_ref(renderer, ctx, name, element);
    }

    renderer.insert(parent, element, before);
    RenderedRange::single(element)
}

pub(super) fn render_text(
    renderer: &Renderer,
    ctx: &RenderContext,
    value: &Arc<Expression>,
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let node = renderer.document().borrow_mut().create_text("");
    let document = Rc::downgrade(renderer.document());
    bind(renderer, ctx, value.clone(), move |value| {
        if let Some(document) = document.upgrade() {
            document.borrow_mut().set_text(node, &value.to_text());
        }
    });
    renderer.insert(parent, node, before);
    RenderedRange::single(node)
}

/// Writes one prop value to the element.
///
/// `value`, `checked` and `selected` are live properties; everything else is an
/// attribute. `null`, `undefined` and `false` remove the attribute, `true` sets it
/// empty.
fn apply_prop(doc: &mut Document, element: NodeId, name: &str, value: &Value) {
    match name {
        "value" => doc.set_property(element, "value", Value::string(value.to_text())),
        "checked" | "selected" => {
            doc.set_property(element, name, Value::Bool(value.is_truthy()))
        }
        _ => {
            let attribute = if name == "className" { "class" } else { name };
            match value {
                Value::Undefined | Value::Null | Value::Bool(false) => {
                    doc.remove_attribute(element, attribute)
                }
                Value::Bool(true) => doc.set_attribute(element, attribute, ""),
                Value::Object(declarations) if attribute == "style" => {
                    let text = declarations
                        .iter()
                        .filter(|(_, value)| !value.is_nullish())
                        .map(|(property, value)| format!("{property}: {}", value.to_text()))
                        .collect::<Vec<_>>()
                        .join("; ");
                    doc.set_attribute(element, attribute, &text);
                }
                other => doc.set_attribute(element, attribute, &other.to_text()),
            }
        }
    }
}

fn attach_handler(renderer: &Renderer, ctx: &RenderContext, element: NodeId, handler: &EventHandler) {
    let weak = renderer.downgrade();
    let owner = ctx.clone();
    let spec = handler.clone();
    let callback = Rc::new(move |event: &Value| {
        if let Some(renderer) = weak.upgrade() {
            handle_event(&renderer, &owner, &spec, event);
        }
    });
    let listener = renderer
        .document()
        .borrow_mut()
        .add_listener(element, &handler.event, callback);

    let document = Rc::downgrade(renderer.document());
    renderer.add_cleanup(
        ctx.scope(),
        Cleanup::Run(Box::new(move || {
            let Some(document) = document.upgrade() else {
                return;
            };
            // The callback holds a context; drop it after the document borrow ends.
            let removed = document.borrow_mut().remove_listener(element, listener);
            drop(removed);
        })),
    );
}

fn register_ref(renderer: &Renderer, ctx: &RenderContext, name: &str, element: NodeId) {
    ctx.refs().borrow_mut().insert(name.to_string(), element);
    let refs = Rc::downgrade(ctx.refs());
    let name = name.to_string();
    renderer.add_cleanup(
        ctx.scope(),
        Cleanup::Run(Box::new(move || {
            let Some(refs) = refs.upgrade() else {
                return;
            };
            let mut refs = refs.borrow_mut();
            if refs.get(&name) == Some(&element) {
                refs.shift_remove(&name);
            }
        })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document) -> NodeId {
        doc.create_element("input")
    }

    #[test]
    fn boolean_attributes_toggle_presence() {
        let mut doc = Document::new();
        let input = element(&mut doc);
        apply_prop(&mut doc, input, "disabled", &Value::Bool(true));
        assert_eq!(doc.attribute(input, "disabled"), Some(""));
        apply_prop(&mut doc, input, "disabled", &Value::Bool(false));
        assert_eq!(doc.attribute(input, "disabled"), None);
        apply_prop(&mut doc, input, "title", &Value::from("hi"));
        apply_prop(&mut doc, input, "title", &Value::Null);
        assert_eq!(doc.attribute(input, "title"), None);
    }

    #[test]
    fn class_name_and_style_objects() {
        let mut doc = Document::new();
        let input = element(&mut doc);
        apply_prop(&mut doc, input, "className", &Value::from("btn primary"));
        assert_eq!(doc.attribute(input, "class"), Some("btn primary"));

        let style = Value::object([
            ("color", Value::from("red")),
            ("width", Value::Null),
            ("opacity", Value::from(0.5)),
        ]);
        apply_prop(&mut doc, input, "style", &style);
        assert_eq!(doc.attribute(input, "style"), Some("color: red; opacity: 0.5"));
    }

    #[test]
    fn live_properties_are_not_attributes() {
        let mut doc = Document::new();
        let input = element(&mut doc);
        apply_prop(&mut doc, input, "value", &Value::from(42));
        apply_prop(&mut doc, input, "checked", &Value::from("yes"));
        assert_eq!(doc.property(input, "value"), Value::from("42"));
        assert_eq!(doc.property(input, "checked"), Value::Bool(true));
        assert_eq!(doc.attribute(input, "value"), None);
    }
}
