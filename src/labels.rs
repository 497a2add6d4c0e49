//! Label sets, label selectors and the selector matcher.
//!
//! Two empty-selector semantics coexist:
//!
//! - [`LabelSelector::matches`] treats a selector with no requirements as
//!   "select everything". This is what read paths use to filter lists.
//! - [`selects`] takes an optional selector and treats an absent one as
//!   "select nothing". Workload validators use it to check template labels.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{ErrorList, Path};
use crate::meta::{Object, validate_label_name, validate_labels};

/// Flat key/value tags on an object.
pub type LabelSet = BTreeMap<String, String>;

/// Requirement operators understood by [`LabelSelectorRequirement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl SelectorOperator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "In" => Some(SelectorOperator::In),
            "NotIn" => Some(SelectorOperator::NotIn),
            "Exists" => Some(SelectorOperator::Exists),
            "DoesNotExist" => Some(SelectorOperator::DoesNotExist),
            _ => None,
        }
    }
}

/// One set-based requirement, e.g. `tier In (web, api)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSelectorRequirement {
    pub key: String,
    /// Kept as text so unknown operators can be reported.
    pub operator: String,
    pub values: Vec<String>,
}

impl LabelSelectorRequirement {
    fn matches(&self, labels: &LabelSet) -> bool {
        let value = labels.get(&self.key);
        match SelectorOperator::parse(&self.operator) {
            Some(SelectorOperator::In) => value.is_some_and(|v| self.values.contains(v)),
            Some(SelectorOperator::NotIn) => !value.is_some_and(|v| self.values.contains(v)),
            Some(SelectorOperator::Exists) => value.is_some(),
            Some(SelectorOperator::DoesNotExist) => value.is_none(),
            None => false,
        }
    }
}

/// A conjunction of label equalities and set-based requirements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSelector {
    pub match_labels: LabelSet,
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

impl LabelSelector {
    pub fn from_labels<K: Into<String>, V: Into<String>>(
        labels: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            match_expressions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// True when every requirement holds. An empty selector matches everything.
    pub fn matches(&self, labels: &LabelSet) -> bool {
        matches_set(&self.match_labels, labels)
            && self.match_expressions.iter().all(|r| r.matches(labels))
    }

    /// The objects whose metadata labels satisfy this selector.
    pub fn filter<'a, T: Object>(&self, items: &'a [T]) -> Vec<&'a T> {
        items
            .iter()
            .filter(|item| self.matches(&item.metadata().labels))
            .collect()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        for req in &self.match_expressions {
            parts.push(match SelectorOperator::parse(&req.operator) {
                Some(SelectorOperator::In) => format!("{} in ({})", req.key, req.values.join(",")),
                Some(SelectorOperator::NotIn) => {
                    format!("{} notin ({})", req.key, req.values.join(","))
                }
                Some(SelectorOperator::Exists) => req.key.clone(),
                Some(SelectorOperator::DoesNotExist) => format!("!{}", req.key),
                None => format!("{} {} ({})", req.key, req.operator, req.values.join(",")),
            });
        }
        f.write_str(&parts.join(","))
    }
}

/// Equality-only matching for map-valued selectors. An empty selector matches everything.
pub fn matches_set(selector: &LabelSet, labels: &LabelSet) -> bool {
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

/// Workload semantics: an absent selector selects nothing.
pub fn selects(selector: Option<&LabelSelector>, labels: &LabelSet) -> bool {
    selector.is_some_and(|s| s.matches(labels))
}

// ── Validation ──────────────────────────────────────────────────────

/// Structural validity of a selector: label syntax and operator/values agreement.
pub fn validate_label_selector(selector: &LabelSelector, path: &Path, errs: &mut ErrorList) {
    validate_labels(&selector.match_labels, &path.child("matchLabels"), errs);
    for (i, req) in selector.match_expressions.iter().enumerate() {
        validate_label_selector_requirement(req, &path.child("matchExpressions").index(i), errs);
    }
}

fn validate_label_selector_requirement(
    req: &LabelSelectorRequirement,
    path: &Path,
    errs: &mut ErrorList,
) {
    match SelectorOperator::parse(&req.operator) {
        Some(SelectorOperator::In | SelectorOperator::NotIn) => {
            if req.values.is_empty() {
                errs.add_required(
                    &path.child("values"),
                    "must be specified when `operator` is 'In' or 'NotIn'",
                );
            }
        }
        Some(SelectorOperator::Exists | SelectorOperator::DoesNotExist) => {
            if !req.values.is_empty() {
                errs.add_forbidden(
                    &path.child("values"),
                    "may not be specified when `operator` is 'Exists' or 'DoesNotExist'",
                );
            }
        }
        None => errs.add_not_supported(
            &path.child("operator"),
            &req.operator,
            &["In", "NotIn", "Exists", "DoesNotExist"],
        ),
    }
    validate_label_name(&req.key, &path.child("key"), errs);
}
