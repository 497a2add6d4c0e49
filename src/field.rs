//! Field paths and the error accumulator shared by every validator.
//!
//! A [`Path`] locates a value inside a resource (`spec.template.spec.containers[0].image`).
//! Paths are persistent: [`Path::child`], [`Path::index`] and [`Path::key`] return a
//! new path that shares its prefix with the receiver, so sibling validations can
//! never corrupt each other's location.
//!
//! Validators never return early on a bad value. They push a [`FieldError`] onto an
//! [`ErrorList`] and keep going, so one call reports every independent defect.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::validation::Invalid;

#[derive(Debug)]
enum Step {
    Child(String),
    Index(usize),
    Key(String),
}

#[derive(Debug)]
struct Node {
    parent: Path,
    step: Step,
}

/// An immutable, append-only locator into a nested object.
#[derive(Clone, Debug, Default)]
pub struct Path(Option<Arc<Node>>);

impl Path {
    /// The empty path, which renders as `""`.
    pub fn root() -> Self {
        Self(None)
    }

    /// A path of a single field, e.g. `Path::new("metadata")`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::root().child(name)
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        self.push(Step::Child(name.into()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.push(Step::Index(index))
    }

    /// Descend into a map entry, rendered as `field[key]`.
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.push(Step::Key(key.into()))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// Render the canonical dotted/bracketed form.
    pub fn render(&self) -> String {
        let mut steps = Vec::new();
        let mut cursor = self;
        while let Some(node) = &cursor.0 {
            steps.push(&node.step);
            cursor = &node.parent;
        }

        let mut out = String::new();
        for step in steps.into_iter().rev() {
            match step {
                Step::Child(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                Step::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
                Step::Key(k) => {
                    out.push('[');
                    out.push_str(k);
                    out.push(']');
                }
            }
        }
        out
    }

    fn push(&self, step: Step) -> Self {
        Self(Some(Arc::new(Node {
            parent: self.clone(),
            step,
        })))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.render() == other.render()
    }
}

impl Eq for Path {}

/// The failure taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub enum ErrorType {
    /// A required value is missing.
    Required,
    /// A value is present but malformed or out of range.
    Invalid,
    /// A value is not in a fixed allow-list.
    NotSupported,
    /// A value or mutation is not permitted.
    Forbidden,
    TooLong,
    Duplicate,
    /// A lower-level failure surfaced verbatim.
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Required => "Required value",
            ErrorType::Invalid => "Invalid value",
            ErrorType::NotSupported => "Unsupported value",
            ErrorType::Forbidden => "Forbidden",
            ErrorType::TooLong => "Too long",
            ErrorType::Duplicate => "Duplicate value",
            ErrorType::Internal => "Internal error",
        }
    }

    /// Whether the rendered error carries the offending value.
    fn shows_value(&self) -> bool {
        matches!(
            self,
            ErrorType::Invalid | ErrorType::NotSupported | ErrorType::Duplicate
        )
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Rendered field path (e.g. `spec.rules[0].host`).
    pub field: String,
    pub kind: ErrorType,
    /// The offending value, serialized as JSON.
    pub bad_value: serde_json::Value,
    /// Human-readable detail, possibly empty.
    pub detail: String,
}

impl FieldError {
    fn new(
        path: &Path,
        kind: ErrorType,
        bad_value: serde_json::Value,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            field: path.render(),
            kind,
            bad_value,
            detail: detail.into(),
        }
    }

    pub fn required(path: &Path, detail: impl Into<String>) -> Self {
        Self::new(path, ErrorType::Required, serde_json::Value::Null, detail)
    }

    pub fn invalid<V: Serialize + ?Sized>(
        path: &Path,
        value: &V,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(path, ErrorType::Invalid, to_json(value), detail)
    }

    pub fn not_supported<V: Serialize + ?Sized>(path: &Path, value: &V, allowed: &[&str]) -> Self {
        let quoted: Vec<String> = allowed.iter().map(|v| format!("\"{v}\"")).collect();
        let detail = if quoted.is_empty() {
            String::new()
        } else {
            format!("supported values: {}", quoted.join(", "))
        };
        Self::new(path, ErrorType::NotSupported, to_json(value), detail)
    }

    pub fn forbidden(path: &Path, detail: impl Into<String>) -> Self {
        Self::new(path, ErrorType::Forbidden, serde_json::Value::Null, detail)
    }

    pub fn too_long<V: Serialize + ?Sized>(path: &Path, value: &V, max_length: usize) -> Self {
        Self::new(
            path,
            ErrorType::TooLong,
            to_json(value),
            format!("must have at most {max_length} characters"),
        )
    }

    pub fn duplicate<V: Serialize + ?Sized>(path: &Path, value: &V) -> Self {
        Self::new(path, ErrorType::Duplicate, to_json(value), "")
    }

    pub fn internal(path: &Path, detail: impl fmt::Display) -> Self {
        Self::new(
            path,
            ErrorType::Internal,
            serde_json::Value::Null,
            detail.to_string(),
        )
    }

    /// The error without its field prefix, e.g. `Invalid value: "x": must be ...`.
    pub fn body(&self) -> String {
        let mut s = self.kind.as_str().to_string();
        if self.kind.shows_value() {
            s.push_str(": ");
            s.push_str(&self.bad_value.to_string());
        }
        if !self.detail.is_empty() {
            s.push_str(": ");
            s.push_str(&self.detail);
        }
        s
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.body())
        } else {
            write!(f, "{}: {}", self.field, self.body())
        }
    }
}

impl std::error::Error for FieldError {}

fn to_json<V: Serialize + ?Sized>(value: &V) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| serde_json::Value::String(e.to_string()))
}

/// Ordered accumulator of [`FieldError`]s, in order of first detection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorList {
    errors: Vec<FieldError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn add_required(&mut self, path: &Path, detail: impl Into<String>) {
        self.push(FieldError::required(path, detail));
    }

    pub fn add_invalid<V: Serialize + ?Sized>(
        &mut self,
        path: &Path,
        value: &V,
        detail: impl Into<String>,
    ) {
        self.push(FieldError::invalid(path, value, detail));
    }

    pub fn add_not_supported<V: Serialize + ?Sized>(
        &mut self,
        path: &Path,
        value: &V,
        allowed: &[&str],
    ) {
        self.push(FieldError::not_supported(path, value, allowed));
    }

    pub fn add_forbidden(&mut self, path: &Path, detail: impl Into<String>) {
        self.push(FieldError::forbidden(path, detail));
    }

    pub fn add_too_long<V: Serialize + ?Sized>(&mut self, path: &Path, value: &V, max: usize) {
        self.push(FieldError::too_long(path, value, max));
    }

    pub fn add_duplicate<V: Serialize + ?Sized>(&mut self, path: &Path, value: &V) {
        self.push(FieldError::duplicate(path, value));
    }

    pub fn add_internal(&mut self, path: &Path, detail: impl fmt::Display) {
        self.push(FieldError::internal(path, detail));
    }

    /// Append every error of `other`, preserving its order.
    pub fn extend(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }

    /// The errors collected so far.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn first(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.errors
    }

    /// Turn the verdict into a `Result`, naming the rejected object.
    pub fn into_result(self, kind: &str, name: &str) -> Result<(), Invalid> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Invalid {
                kind: kind.to_string(),
                name: name.to_string(),
                errors: self,
            })
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        f.write_str("]")
    }
}

impl IntoIterator for ErrorList {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl From<Vec<FieldError>> for ErrorList {
    fn from(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_mixed_steps() {
        let path = Path::new("spec")
            .child("template")
            .child("spec")
            .child("containers")
            .index(0)
            .child("image");
        assert_eq!(path.render(), "spec.template.spec.containers[0].image");
    }

    #[test]
    fn render_map_key() {
        assert_eq!(Path::new("data").key("a..b").render(), "data[a..b]");
    }

    #[test]
    fn root_renders_empty() {
        assert_eq!(Path::root().render(), "");
        assert!(Path::root().is_root());
        assert_eq!(Path::root().index(2).render(), "[2]");
    }

    #[test]
    fn siblings_do_not_share_steps() {
        let spec = Path::new("spec");
        let a = spec.child("a");
        let b = spec.child("b");
        assert_eq!(a.render(), "spec.a");
        assert_eq!(b.render(), "spec.b");
        assert_eq!(spec.render(), "spec");
    }

    #[test]
    fn display_required() {
        let err = FieldError::required(&Path::new("spec").child("selector"), "");
        assert_eq!(err.to_string(), "spec.selector: Required value");
    }

    #[test]
    fn display_invalid_with_json_value() {
        let labels = json!({"y": "z"});
        let err = FieldError::invalid(
            &Path::new("spec").child("template").child("metadata").child("labels"),
            &labels,
            "`selector` does not match template `labels`",
        );
        assert_eq!(
            err.to_string(),
            "spec.template.metadata.labels: Invalid value: {\"y\":\"z\"}: `selector` does not match template `labels`"
        );
    }

    #[test]
    fn display_not_supported_lists_values() {
        let err = FieldError::not_supported(&Path::new("policy"), "Never", &["Always"]);
        assert_eq!(
            err.to_string(),
            "policy: Unsupported value: \"Never\": supported values: \"Always\""
        );
    }

    #[test]
    fn display_forbidden_omits_value() {
        let err = FieldError::forbidden(&Path::new("metadata").child("name"), "field is immutable");
        assert_eq!(err.to_string(), "metadata.name: Forbidden: field is immutable");
    }

    #[test]
    fn display_at_root_has_no_prefix() {
        let err = FieldError::internal(&Path::root(), "boom");
        assert_eq!(err.to_string(), "Internal error: boom");
    }

    #[test]
    fn list_preserves_detection_order() {
        let mut errs = ErrorList::new();
        errs.add_required(&Path::new("b"), "");
        errs.add_invalid(&Path::new("a"), &1, "bad");
        let fields: Vec<&str> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["b", "a"]);
        assert_eq!(errs.first().map(|e| e.kind), Some(ErrorType::Required));

        let owned = errs.into_vec();
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[1].to_string(), "a: Invalid value: 1: bad");
    }

    #[test]
    fn into_result_names_object() {
        let mut errs = ErrorList::new();
        errs.add_required(&Path::new("metadata").child("name"), "");
        let err = errs.into_result("Deployment", "web").unwrap_err();
        assert!(err.to_string().starts_with("Deployment \"web\" is invalid"));
        assert!(err.to_string().contains("metadata.name: Required value"));
        assert!(ErrorList::new().into_result("Deployment", "web").is_ok());
    }
}
