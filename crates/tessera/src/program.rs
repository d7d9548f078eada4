//! Compiled program model.
//!
//! This is the JSON-shaped output of the compiler, deserialized as-is. Trees are
//! immutable once loaded; subtrees the renderer instantiates repeatedly (branch and
//! loop bodies, bound expressions) sit behind `Arc` so every instance shares one
//! template.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::value::Value;

// ═══════════════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "expr")]
pub enum Expression {
    #[serde(rename = "lit")]
    Literal { value: Value },
    #[serde(rename = "state")]
    State {
        name: Arc<str>,
        #[serde(default)]
        path: Option<String>,
    },
    #[serde(rename = "var")]
    Local {
        name: Arc<str>,
        #[serde(default)]
        path: Option<String>,
    },
    #[serde(rename = "bin")]
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    #[serde(rename = "not")]
    Not { operand: Box<Expression> },
    #[serde(rename = "cond")]
    Conditional {
        #[serde(rename = "if")]
        condition: Box<Expression>,
        then: Box<Expression>,
        #[serde(rename = "else")]
        otherwise: Box<Expression>,
    },
    #[serde(rename = "get")]
    Get { base: Box<Expression>, path: String },
    #[serde(rename = "index")]
    Index {
        base: Box<Expression>,
        key: Box<Expression>,
    },
    #[serde(rename = "concat")]
    Concat { items: Vec<Expression> },
    #[serde(rename = "array")]
    Array { elements: Vec<Expression> },
    #[serde(rename = "lambda")]
    Lambda {
        param: Arc<str>,
        #[serde(default)]
        index: Option<Arc<str>>,
        body: Box<Expression>,
    },
    #[serde(rename = "call")]
    Call {
        target: Box<Expression>,
        method: String,
        #[serde(default)]
        args: Vec<Expression>,
    },
    #[serde(rename = "style")]
    Style {
        name: String,
        #[serde(default)]
        variants: IndexMap<String, Expression>,
    },
    #[serde(rename = "route")]
    Route {
        name: String,
        #[serde(default)]
        source: RouteSource,
    },
    #[serde(rename = "data")]
    Data {
        name: String,
        #[serde(default)]
        path: Option<String>,
    },
    #[serde(rename = "import")]
    Import {
        name: String,
        #[serde(default)]
        path: Option<String>,
    },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal {
            value: value.into(),
        }
    }

    /// True when the expression is a literal, i.e. never needs a binding.
    pub fn is_static(&self) -> bool {
        matches!(self, Expression::Literal { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteSource {
    #[default]
    Param,
    Query,
    Path,
}

// ═══════════════════════════════════════════════════════════════════════════
// View nodes
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Node {
    Element {
        tag: String,
        #[serde(default)]
        props: IndexMap<String, Prop>,
        #[serde(default)]
        children: Vec<Node>,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
    },
    Text { value: Arc<Expression> },
    If {
        condition: Arc<Expression>,
        then: Arc<Node>,
        #[serde(default, rename = "else")]
        otherwise: Option<Arc<Node>>,
    },
    Each {
        items: Arc<Expression>,
        #[serde(rename = "as")]
        alias: Arc<str>,
        #[serde(default)]
        index: Option<Arc<str>>,
        #[serde(default)]
        key: Option<Arc<Expression>>,
        body: Arc<Node>,
    },
    LocalState {
        #[serde(default)]
        state: IndexMap<String, FieldDecl>,
        #[serde(default)]
        actions: Vec<ActionDefinition>,
        child: Arc<Node>,
    },
    Markdown { content: Arc<Expression> },
    Code {
        language: Arc<Expression>,
        content: Arc<Expression>,
    },
    Portal {
        target: String,
        #[serde(default)]
        children: Vec<Node>,
    },
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Element { .. } => "element",
            Node::Text { .. } => "text",
            Node::If { .. } => "if",
            Node::Each { .. } => "each",
            Node::LocalState { .. } => "localState",
            Node::Markdown { .. } => "markdown",
            Node::Code { .. } => "code",
            Node::Portal { .. } => "portal",
        }
    }

    /// Number of nodes in this subtree, the root included.
    pub fn count(&self) -> usize {
        1 + match self {
            Node::Element { children, .. } | Node::Portal { children, .. } => {
                children.iter().map(Node::count).sum()
            }
            Node::If {
                then, otherwise, ..
            } => then.count() + otherwise.as_ref().map_or(0, |n| n.count()),
            Node::Each { body, .. } => body.count(),
            Node::LocalState { child, .. } => child.count(),
            Node::Text { .. } | Node::Markdown { .. } | Node::Code { .. } => 0,
        }
    }
}

/// An element prop: either a bound value or an event handler.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Prop {
    Handler(EventHandler),
    Value(Arc<Expression>),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventHandler {
    pub event: String,
    pub action: String,
    #[serde(default)]
    pub payload: Option<Arc<Expression>>,
}

// ═══════════════════════════════════════════════════════════════════════════
// State declarations
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
    #[serde(alias = "array")]
    List,
    Object,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FieldDecl {
    #[serde(rename = "type")]
    pub ty: FieldType,
    pub initial: InitialValue,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InitialValue {
    Cookie(CookieInitial),
    Value(Value),
}

/// Deferred initial value read from a cookie by the host before store construction.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CookieInitial {
    pub expr: CookieTag,
    pub key: String,
    #[serde(default)]
    pub default: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieTag {
    Cookie,
}

// ═══════════════════════════════════════════════════════════════════════════
// Actions
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<ActionStep>,
}

/// One executable action step.
///
/// Only the state-mutating kinds are interpreted by this crate. Everything else
/// (network, navigation, storage, ...) is kept verbatim in [`ActionStep::External`]
/// for the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionStep {
    Set {
        target: Arc<str>,
        value: Expression,
    },
    Update {
        target: Arc<str>,
        operation: String,
        value: Option<Expression>,
        index: Option<Expression>,
        delete_count: Option<Expression>,
    },
    SetPath {
        target: Arc<str>,
        path: Expression,
        value: Expression,
    },
    External {
        kind: String,
        body: serde_json::Value,
    },
}

impl ActionStep {
    pub fn kind(&self) -> &str {
        match self {
            ActionStep::Set { .. } => "set",
            ActionStep::Update { .. } => "update",
            ActionStep::SetPath { .. } => "setPath",
            ActionStep::External { kind, .. } => kind,
        }
    }

    /// Steps allowed inside component-local actions.
    pub fn is_state_step(&self) -> bool {
        !matches!(self, ActionStep::External { .. })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetStep {
    target: Arc<str>,
    value: Expression,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStep {
    target: Arc<str>,
    operation: String,
    #[serde(default)]
    value: Option<Expression>,
    #[serde(default)]
    index: Option<Expression>,
    #[serde(default)]
    delete_count: Option<Expression>,
}

#[derive(Deserialize)]
struct SetPathStep {
    target: Arc<str>,
    path: Expression,
    value: Expression,
}

impl<'de> Deserialize<'de> for ActionStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut body = serde_json::Value::deserialize(deserializer)?;
        let kind = body
            .get("do")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| D::Error::missing_field("do"))?
            .to_string();
        let step = match kind.as_str() {
            "set" => {
                let SetStep { target, value } =
                    serde_json::from_value(body).map_err(D::Error::custom)?;
                ActionStep::Set { target, value }
            }
            "update" => {
                let UpdateStep {
                    target,
                    operation,
                    value,
                    index,
                    delete_count,
                } = serde_json::from_value(body).map_err(D::Error::custom)?;
                ActionStep::Update {
                    target,
                    operation,
                    value,
                    index,
                    delete_count,
                }
            }
            "setPath" => {
                let SetPathStep {
                    target,
                    path,
                    value,
                } = serde_json::from_value(body).map_err(D::Error::custom)?;
                ActionStep::SetPath {
                    target,
                    path,
                    value,
                }
            }
            _ => {
                if let Some(fields) = body.as_object_mut() {
                    fields.remove("do");
                }
                ActionStep::External { kind, body }
            }
        };
        Ok(step)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Style presets
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub variants: IndexMap<String, IndexMap<String, String>>,
    #[serde(default)]
    pub default_variants: IndexMap<String, String>,
    #[serde(default)]
    pub compound_variants: Vec<CompoundVariant>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CompoundVariant {
    pub class: String,
    #[serde(flatten)]
    pub conditions: IndexMap<String, String>,
}

pub type StyleTable = IndexMap<String, StylePreset>;

// ═══════════════════════════════════════════════════════════════════════════
// Program
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CompiledProgram {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub state: IndexMap<String, FieldDecl>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    pub view: Arc<Node>,
    #[serde(default)]
    pub styles: StyleTable,
    #[serde(default)]
    pub data: IndexMap<String, Value>,
    #[serde(default)]
    pub imports: IndexMap<String, Value>,
}

impl CompiledProgram {
    pub fn from_json(source: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, Error> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn action(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|action| action.name == name)
    }
}

impl FromStr for CompiledProgram {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::from_json(source)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(symbol)
    }
}
