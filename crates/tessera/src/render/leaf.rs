//! Markdown, code and portal nodes.

use std::rc::Rc;
use std::sync::Arc;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

use super::binding::bind;
use super::scope::Cleanup;
use super::{RenderContext, RenderedRange, Renderer};
use crate::diagnostics::DiagnosticKind;
use crate::dom::NodeId;
use crate::program::{Expression, Node};

/// Renders CommonMark (plus tables, strikethrough and task lists) to HTML.
/// Raw HTML in the source is escaped, never passed through. Link and image
/// destinations with a scheme other than http, https or mailto are emptied.
pub fn markdown_to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let events = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Relative destinations and allowed schemes pass; everything else becomes `""`.
/// Browsers drop whitespace and control characters inside a scheme, so they are
/// ignored when reading it.
fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    let cleaned: String = dest
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    let Some(colon) = cleaned.find(':') else {
        return dest;
    };
    let scheme = &cleaned[..colon];
    if scheme.contains(['/', '?', '#']) {
        return dest;
    }
    if SAFE_SCHEMES.iter().any(|safe| scheme.eq_ignore_ascii_case(safe)) {
        return dest;
    }
    log::debug!("dropping markdown link destination with scheme `{scheme}`");
    CowStr::Borrowed("")
}

pub(super) fn render_markdown(
    renderer: &Renderer,
    ctx: &RenderContext,
    content: &Arc<Expression>,
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let container = {
        let mut doc = renderer.document().borrow_mut();
        let container = doc.create_element("div");
        doc.set_attribute(container, "class", "markdown");
        container
    };
    let document = Rc::downgrade(renderer.document());
    bind(renderer, ctx, content.clone(), move |value| {
        if let Some(document) = document.upgrade() {
            let html = markdown_to_html(&value.to_text());
            document.borrow_mut().set_inner_html(container, html);
        }
    });
    renderer.insert(parent, container, before);
    RenderedRange::single(container)
}

/// `<pre><code class="language-…">` with the content as a text node.
pub(super) fn render_code(
    renderer: &Renderer,
    ctx: &RenderContext,
    language: &Arc<Expression>,
    content: &Arc<Expression>,
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let (pre, code, text) = {
        let mut doc = renderer.document().borrow_mut();
        let pre = doc.create_element("pre");
        let code = doc.create_element("code");
        let text = doc.create_text("");
        doc.append_child(code, text);
        doc.append_child(pre, code);
        (pre, code, text)
    };

    let document = Rc::downgrade(renderer.document());
    bind(renderer, ctx, language.clone(), move |value| {
        let Some(document) = document.upgrade() else {
            return;
        };
        let mut doc = document.borrow_mut();
        match value.to_text().trim() {
            "" => doc.remove_attribute(code, "class"),
            language => doc.set_attribute(code, "class", &format!("language-{language}")),
        }
    });

    let document = Rc::downgrade(renderer.document());
    bind(renderer, ctx, content.clone(), move |value| {
        if let Some(document) = document.upgrade() {
            document.borrow_mut().set_text(text, &value.to_text());
        }
    });

    renderer.insert(parent, pre, before);
    RenderedRange::single(pre)
}

/// Leaves a placeholder comment in place and renders `children` into the named
/// container. Portal content is owned by its own child scope and removed from the
/// container when that scope is disposed. Without a matching container the
/// children render inline after the placeholder.
pub(super) fn render_portal(
    renderer: &Renderer,
    ctx: &RenderContext,
    target: &str,
    children: &[Node],
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let (placeholder, container) = {
        let mut doc = renderer.document().borrow_mut();
        let placeholder = doc.create_comment(&format!("portal:{target}"));
        doc.insert_before(parent, placeholder, before);
        (placeholder, doc.container(target))
    };

    let Some(container) = container else {
        renderer.report(
            DiagnosticKind::PortalTarget,
            format!("no container named `{target}`; portal rendered in place"),
        );
        let last = children
            .iter()
            .map(|child| renderer.render(child, ctx, parent, before).last)
            .last()
            .unwrap_or(placeholder);
        return RenderedRange {
            first: placeholder,
            last,
        };
    };

    let scope = renderer.create_scope(Some(ctx.scope()));
    let portal = ctx.with_scope(scope);
    let ranges: Vec<RenderedRange> = children
        .iter()
        .map(|child| renderer.render(child, &portal, container, None))
        .collect();
    log::debug!("portal into `{target}`: {} node(s) in {scope}", ranges.len());

    let weak = renderer.downgrade();
    renderer.add_cleanup(
        scope,
        Cleanup::Run(Box::new(move || {
            if let Some(renderer) = weak.upgrade() {
                for range in ranges {
                    renderer.remove_range(range);
                }
            }
        })),
    );

    RenderedRange::single(placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_renders_common_blocks() {
        let html = markdown_to_html("# Title\n\n- [x] done\n- ~~old~~\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("checkbox"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = markdown_to_html("hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn script_links_lose_their_destination() {
        let html = markdown_to_html(
            "[a](javascript:alert(1)) [b](JavaScript:x) ![c](data:text/html,x) <vbscript:y>",
        );
        assert_eq!(html.matches(r#"href="""#).count(), 3, "{html}");
        assert!(html.contains(r#"<a href="">a</a>"#), "{html}");
        assert!(html.contains(r#"src="""#), "{html}");
        assert!(!html.contains("data:"), "{html}");
    }

    #[test]
    fn web_and_relative_links_are_kept() {
        let html = markdown_to_html(
            "[a](https://example.com/x) [b](/docs?q=1:2) [c](mailto:me@example.com) [d](#top)",
        );
        assert!(html.contains(r#"href="https://example.com/x""#), "{html}");
        assert!(html.contains(r#"href="/docs?q=1:2""#), "{html}");
        assert!(html.contains(r#"href="mailto:me@example.com""#), "{html}");
        assert!(html.contains(r##"href="#top""##), "{html}");
    }

    #[test]
    fn tables_are_enabled() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }
}
