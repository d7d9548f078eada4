//! Keyed list reconciliation.
//!
//! Every rendered item owns a scope, a document range and an item cell: a private
//! two-field store (`item`, `index`) its loop variables read through. Reusing an
//! item therefore never re-renders it; writing the cell updates exactly the
//! bindings that read the loop variables.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::binding::watch;
use super::scope::ScopeId;
use super::{RenderContext, RenderedRange, Renderer};
use crate::config::MoveStrategy;
use crate::diagnostics::DiagnosticKind;
use crate::dom::NodeId;
use crate::eval::{LocalValue, dependencies, dependencies_within, evaluate};
use crate::program::{Expression, Node};
use crate::state::StateStore;
use crate::value::Value;

const ITEM_FIELD: &str = "item";
const INDEX_FIELD: &str = "index";

pub(super) struct EachTemplate {
    pub items: Arc<Expression>,
    pub alias: Arc<str>,
    pub index: Option<Arc<str>>,
    pub key: Option<Arc<Expression>>,
    pub body: Arc<Node>,
}

/// Identity of a list item within one snapshot.
///
/// Without a key expression every item is keyed by its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Position(usize),
    Nullish,
    Bool(bool),
    /// Bit pattern of the number, with `-0` folded into `0` and one canonical NaN.
    Number(u64),
    String(Arc<str>),
    /// JSON text of a list or object key.
    Composite(String),
}

impl ItemKey {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Undefined | Value::Null => ItemKey::Nullish,
            Value::Bool(b) => ItemKey::Bool(*b),
            Value::Number(n) => {
                let n = if n.is_nan() {
                    f64::NAN
                } else if *n == 0.0 {
                    0.0
                } else {
                    *n
                };
                ItemKey::Number(n.to_bits())
            }
            Value::String(s) => ItemKey::String(s.clone()),
            Value::List(_) | Value::Object(_) => {
                ItemKey::Composite(serde_json::Value::from(value.clone()).to_string())
            }
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Position(i) => write!(f, "#{i}"),
            ItemKey::Nullish => f.write_str("null"),
            ItemKey::Bool(b) => write!(f, "{b}"),
            ItemKey::Number(bits) => write!(f, "{}", f64::from_bits(*bits)),
            ItemKey::String(s) => write!(f, "{s:?}"),
            ItemKey::Composite(json) => f.write_str(json),
        }
    }
}

struct RenderedItem {
    key: ItemKey,
    cell: StateStore,
    scope: ScopeId,
    range: RenderedRange,
}

enum Slot {
    Reused {
        item: RenderedItem,
        old_position: usize,
    },
    Fresh,
}

pub(super) fn render_each(
    renderer: &Renderer,
    ctx: &RenderContext,
    template: EachTemplate,
    parent: NodeId,
    before: Option<NodeId>,
) -> RenderedRange {
    let (start, end) = {
        let mut doc = renderer.document().borrow_mut();
        let start = doc.create_comment("each");
        let end = doc.create_comment("/each");
        doc.insert_before(parent, start, before);
        doc.insert_before(parent, end, before);
        (start, end)
    };

    let template = Rc::new(template);
    let rendered: Rc<RefCell<Vec<RenderedItem>>> = Rc::default();
    reconcile(renderer, ctx, &template, &rendered, end);

    let mut deps = dependencies(&template.items);
    if let Some(key) = &template.key {
        let params: Vec<Arc<str>> = std::iter::once(template.alias.clone())
            .chain(template.index.clone())
            .collect();
        deps.merge(&dependencies_within(key, &params));
    }
    if !deps.is_empty() {
        let weak = renderer.downgrade();
        let owner = ctx.clone();
        let on_change = move || {
            if let Some(renderer) = weak.upgrade() {
                reconcile(&renderer, &owner, &template, &rendered, end);
            }
        };
        watch(renderer, ctx, &deps, Rc::new(on_change));
    }

    RenderedRange {
        first: start,
        last: end,
    }
}

/// Brings the rendered items in line with the current value of the items
/// expression. Items are inserted before `end`.
fn reconcile(
    renderer: &Renderer,
    owner: &RenderContext,
    template: &EachTemplate,
    rendered: &RefCell<Vec<RenderedItem>>,
    end: NodeId,
) {
    let Some(parent) = renderer.parent_of(end) else {
        return;
    };
    let values = match owner.evaluate(&template.items) {
        Value::List(items) => items,
        other => {
            if !other.is_nullish() {
                log::debug!("each over a {} value renders nothing", other.type_name());
            }
            Arc::default()
        }
    };
    let keys: Vec<ItemKey> = values
        .iter()
        .enumerate()
        .map(|(i, value)| item_key(owner, template, value, i))
        .collect();

    // Old key -> old position. With duplicates in the old list the first one wins;
    // the others stay unmatched and are torn down.
    let mut old: Vec<Option<RenderedItem>> = std::mem::take(&mut *rendered.borrow_mut())
        .into_iter()
        .map(Some)
        .collect();
    let mut lookup: FxHashMap<ItemKey, usize> = FxHashMap::default();
    for (position, item) in old.iter().enumerate() {
        if let Some(item) = item {
            lookup.entry(item.key.clone()).or_insert(position);
        }
    }

    let mut seen: FxHashSet<&ItemKey> = FxHashSet::default();
    let mut plan: Vec<Slot> = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if !seen.insert(key) {
            renderer.report(
                DiagnosticKind::DuplicateKey,
                format!("duplicate key {key} at index {i}; the item is rendered separately"),
            );
            plan.push(Slot::Fresh);
            continue;
        }
        let reused = lookup
            .get(key)
            .and_then(|&position| old[position].take().map(|item| (position, item)));
        plan.push(match reused {
            Some((old_position, item)) => Slot::Reused { item, old_position },
            None => Slot::Fresh,
        });
    }

    let mut removed = 0;
    for item in old.into_iter().flatten() {
        renderer.dispose(item.scope);
        renderer.remove_range(item.range);
        removed += 1;
    }

    let strategy = renderer.config().move_strategy;
    let stable = match strategy {
        MoveStrategy::Lis => stable_items(&plan),
        MoveStrategy::Reinsert => vec![false; plan.len()],
    };

    let (mut created, mut moved) = (0, 0);
    let mut anchor = end;
    let mut next: Vec<RenderedItem> = Vec::with_capacity(plan.len());
    for (i, slot) in plan.into_iter().enumerate().rev() {
        let item = match slot {
            Slot::Reused { item, .. } => {
                let in_place = match strategy {
                    MoveStrategy::Lis => stable[i],
                    MoveStrategy::Reinsert => renderer.after(item.range) == Some(anchor),
                };
                if !in_place {
                    renderer.move_range(item.range, parent, Some(anchor));
                    moved += 1;
                }
                sync_cell(&item.cell, &values[i], i);
                item
            }
            Slot::Fresh => {
                created += 1;
                instantiate(renderer, owner, template, &values[i], i, keys[i].clone(), parent, anchor)
            }
        };
        anchor = item.range.first;
        next.push(item);
    }
    next.reverse();

    log::debug!(
        "each in {}: {} item(s), {created} created, {removed} removed, {moved} moved",
        owner.scope(),
        next.len()
    );
    *rendered.borrow_mut() = next;
}

fn item_key(owner: &RenderContext, template: &EachTemplate, value: &Value, index: usize) -> ItemKey {
    let Some(key) = &template.key else {
        return ItemKey::Position(index);
    };
    let mut locals = owner.locals().bind(template.alias.clone(), value.clone());
    if let Some(name) = &template.index {
        locals = locals.bind(name.clone(), Value::from(index));
    }
    ItemKey::from_value(&evaluate(key, &owner.eval_context().with_locals(locals)))
}

/// Marks the reused items that keep their place: those on a longest increasing
/// run of old positions.
fn stable_items(plan: &[Slot]) -> Vec<bool> {
    let reused: Vec<(usize, usize)> = plan
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| match slot {
            Slot::Reused { old_position, .. } => Some((i, *old_position)),
            Slot::Fresh => None,
        })
        .collect();
    let positions: Vec<usize> = reused.iter().map(|(_, old)| *old).collect();
    let mut stable = vec![false; plan.len()];
    for k in longest_increasing_subsequence(&positions) {
        stable[reused[k].0] = true;
    }
    stable
}

/// Indices of one longest strictly increasing subsequence of `values`.
pub fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    let mut predecessors: Vec<Option<usize>> = vec![None; values.len()];
    // tails[k]: index of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    for (i, &value) in values.iter().enumerate() {
        let length = tails.partition_point(|&t| values[t] < value);
        if length > 0 {
            predecessors[i] = Some(tails[length - 1]);
        }
        if length == tails.len() {
            tails.push(i);
        } else {
            tails[length] = i;
        }
    }
    let mut run = Vec::with_capacity(tails.len());
    let mut current = tails.last().copied();
    while let Some(i) = current {
        run.push(i);
        current = predecessors[i];
    }
    run.reverse();
    run
}

fn sync_cell(cell: &StateStore, value: &Value, index: usize) {
    if !cell.get(ITEM_FIELD).same(value) {
        if let Err(err) = cell.set(ITEM_FIELD, value.clone()) {
            log::debug!("item cell: {err}");
        }
    }
    let index = Value::from(index);
    if cell.get(INDEX_FIELD) != index {
        if let Err(err) = cell.set(INDEX_FIELD, index) {
            log::debug!("item cell: {err}");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn instantiate(
    renderer: &Renderer,
    owner: &RenderContext,
    template: &EachTemplate,
    value: &Value,
    index: usize,
    key: ItemKey,
    parent: NodeId,
    before: NodeId,
) -> RenderedItem {
    let cell = StateStore::with_fields([
        (ITEM_FIELD, value.clone()),
        (INDEX_FIELD, Value::from(index)),
    ]);
    let scope = renderer.create_scope(Some(owner.scope()));
    let mut bindings = vec![(
        template.alias.clone(),
        LocalValue::Reactive {
            store: cell.clone(),
            field: ITEM_FIELD.into(),
        },
    )];
    if let Some(name) = &template.index {
        bindings.push((
            name.clone(),
            LocalValue::Reactive {
                store: cell.clone(),
                field: INDEX_FIELD.into(),
            },
        ));
    }
    let item_ctx = owner
        .with_scope(scope)
        .with_locals(owner.locals().extend(bindings));
    let range = renderer.render(&template.body, &item_ctx, parent, Some(before));
    RenderedItem {
        key,
        cell,
        scope,
        range,
    }
}
