//! User-supplied CEL admission rules.
//!
//! A [`RuleSet`] is compiled once and evaluated against many objects. Each
//! rule sees the serialized object as `self` and, on updates, the stored
//! object as `oldSelf`. Rules that reference `oldSelf` only run on updates.

use std::collections::HashMap;
use std::sync::Arc;

use cel::objects::{Key, Map};
use cel::{Context, ParseErrors, Program, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::field::{ErrorList, ErrorType, FieldError, Path};

/// A single admission rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// The CEL expression; must evaluate to a bool.
    pub rule: String,
    /// Detail reported when the rule evaluates to `false`.
    #[serde(default)]
    pub message: Option<String>,
    /// CEL expression producing the detail; takes precedence over `message`
    /// when it evaluates to a string.
    #[serde(default)]
    pub message_expression: Option<String>,
    /// Dotted path of the field to blame, e.g. `.spec.replicas` or `spec.rules[0].host`.
    #[serde(default)]
    pub field_path: Option<String>,
    /// `FieldValueInvalid` (default), `FieldValueRequired`, `FieldValueForbidden`
    /// or `FieldValueDuplicate`.
    #[serde(default)]
    pub reason: Option<String>,
}

impl Rule {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field_path(mut self, field_path: impl Into<String>) -> Self {
        self.field_path = Some(field_path.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("failed to compile CEL rule \"{rule}\": {source}")]
    Parse { rule: String, source: ParseErrors },
    #[error("invalid rule definition: {0}")]
    InvalidRule(#[from] serde_json::Error),
    #[error("invalid field path \"{0}\"")]
    FieldPath(String),
}

#[derive(Debug)]
struct CompiledRule {
    program: Program,
    message_program: Option<Program>,
    rule: Rule,
    steps: Vec<Step>,
    is_transition_rule: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    Field(String),
    Index(usize),
}

/// Parse `.spec.rules[0].host` (leading dot optional) into steps.
fn parse_field_path(field_path: &str) -> Result<Vec<Step>, RuleError> {
    let bad = || RuleError::FieldPath(field_path.to_string());
    let trimmed = field_path.strip_prefix('.').unwrap_or(field_path);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let mut steps = Vec::new();
    for segment in trimmed.split('.') {
        let (name, mut rest) = match segment.find('[') {
            Some(at) => segment.split_at(at),
            None => (segment, ""),
        };
        if name.is_empty() {
            return Err(bad());
        }
        steps.push(Step::Field(name.to_string()));
        while let Some(inner) = rest.strip_prefix('[') {
            let (index, tail) = inner.split_once(']').ok_or_else(bad)?;
            steps.push(Step::Index(index.parse().map_err(|_| bad())?));
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(bad());
        }
    }
    Ok(steps)
}

/// The error location, and the JSON value found there (`null` if absent).
fn locate(steps: &[Step], object: &serde_json::Value) -> (Path, serde_json::Value) {
    let mut path = Path::root();
    let mut value = Some(object);
    for step in steps {
        match step {
            Step::Field(name) => {
                path = path.child(name.as_str());
                value = value.and_then(|v| v.get(name));
            }
            Step::Index(i) => {
                path = path.index(*i);
                value = value.and_then(|v| v.get(*i));
            }
        }
    }
    (path, value.cloned().unwrap_or(serde_json::Value::Null))
}

fn error_type(reason: Option<&str>) -> ErrorType {
    match reason {
        Some("FieldValueRequired") => ErrorType::Required,
        Some("FieldValueForbidden") => ErrorType::Forbidden,
        Some("FieldValueDuplicate") => ErrorType::Duplicate,
        _ => ErrorType::Invalid,
    }
}

fn to_cel(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(Arc::new(s.clone())),
        serde_json::Value::Array(items) => Value::List(Arc::new(items.iter().map(to_cel).collect())),
        serde_json::Value::Object(obj) => {
            let map: HashMap<Key, Value> = obj
                .iter()
                .map(|(k, v)| (Key::String(Arc::new(k.clone())), to_cel(v)))
                .collect();
            Value::Map(Map { map: Arc::new(map) })
        }
    }
}

impl CompiledRule {
    fn message(&self, ctx: &Context<'_>) -> String {
        if let Some(program) = &self.message_program
            && let Ok(Value::String(s)) = program.execute(ctx)
        {
            return (*s).clone();
        }
        self.rule
            .message
            .clone()
            .unwrap_or_else(|| format!("failed rule: {}", self.rule.rule))
    }
}

/// A compiled, reusable set of admission rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile every rule, failing on the first rule that does not parse.
    pub fn compile(rules: &[Rule]) -> Result<Self, RuleError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let program = Program::compile(&rule.rule).map_err(|source| RuleError::Parse {
                    rule: rule.rule.clone(),
                    source,
                })?;
                let message_program = rule
                    .message_expression
                    .as_deref()
                    .map(|expr| {
                        Program::compile(expr).map_err(|source| RuleError::Parse {
                            rule: expr.to_string(),
                            source,
                        })
                    })
                    .transpose()?;
                let steps = parse_field_path(rule.field_path.as_deref().unwrap_or_default())?;
                let is_transition_rule = program.references().has_variable("oldSelf");
                Ok(CompiledRule {
                    program,
                    message_program,
                    rule: rule.clone(),
                    steps,
                    is_transition_rule,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self { rules })
    }

    /// Compile a JSON array of rules.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, RuleError> {
        let rules: Vec<Rule> = serde_json::from_value(value.clone())?;
        Self::compile(&rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against `object`, appending one error per failing rule.
    pub fn evaluate(
        &self,
        object: &serde_json::Value,
        old_object: Option<&serde_json::Value>,
        errs: &mut ErrorList,
    ) {
        let this = to_cel(object);
        let old = old_object.map(to_cel);
        for compiled in &self.rules {
            if compiled.is_transition_rule && old.is_none() {
                trace!(rule = %compiled.rule.rule, "skipping transition rule on create");
                continue;
            }
            let mut ctx = Context::default();
            ctx.add_variable_from_value("self", this.clone());
            if let Some(old) = &old {
                ctx.add_variable_from_value("oldSelf", old.clone());
            }
            trace!(rule = %compiled.rule.rule, "evaluating admission rule");
            let (path, bad_value) = locate(&compiled.steps, object);
            match compiled.program.execute(&ctx) {
                Ok(Value::Bool(true)) => {}
                Ok(Value::Bool(false)) => {
                    let detail = compiled.message(&ctx);
                    errs.push(FieldError {
                        field: path.render(),
                        kind: error_type(compiled.rule.reason.as_deref()),
                        bad_value,
                        detail,
                    });
                }
                Ok(other) => {
                    debug!(rule = %compiled.rule.rule, result = ?other, "rule did not evaluate to bool");
                    errs.add_internal(
                        &path,
                        format!("rule \"{}\" did not evaluate to bool", compiled.rule.rule),
                    );
                }
                Err(e) => {
                    debug!(rule = %compiled.rule.rule, error = %e, "rule evaluation failed");
                    errs.add_internal(&path, format!("rule evaluation error: {e}"));
                }
            }
        }
    }
}
