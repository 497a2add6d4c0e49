//! Admission-time validation for Kubernetes `extensions` resources.
//!
//! Every check reports a [`FieldError`] carrying the exact path of the
//! offending field, so a single pass returns every problem with an object.
//! The per-kind modules expose free functions for create, update and status
//! updates; [`validate`] and friends route a tagged [`Resource`] to them.
//!
//! # Usage
//!
//! ```rust
//! use kube_admission::{Resource, validate};
//!
//! let resource: Resource = serde_json::from_value(serde_json::json!({
//!     "kind": "ConfigMap",
//!     "metadata": {"name": "settings", "namespace": "default"},
//!     "data": {"a..b": "value"}
//! }))
//! .unwrap();
//!
//! let errs = validate(&resource);
//! assert_eq!(errs.errors()[0].field, "data[a..b]");
//! ```
//!
//! With the `cel` feature (on by default), a [`Validator`] also evaluates
//! CEL rules registered per kind after the built-in checks.

pub mod autoscaling;
pub mod common;
pub mod configmap;
pub mod daemonset;
pub mod deployment;
pub mod dispatch;
pub mod field;
pub mod format;
pub mod ingress;
pub mod intstr;
pub mod job;
pub mod labels;
pub mod meta;
pub mod pod;
#[cfg(feature = "cel")]
pub mod rules;
pub mod validation;

pub use dispatch::{Resource, validate, validate_status_update, validate_update};
pub use field::{ErrorList, ErrorType, FieldError, Path};
#[cfg(feature = "cel")]
pub use rules::{Rule, RuleError, RuleSet};
pub use validation::{Invalid, Validator};
