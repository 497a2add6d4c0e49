//! Object metadata and the checks every resource kind shares.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{validate_immutable_field, validate_nonnegative_field};
use crate::field::{ErrorList, Path};
use crate::format::{
    DNS952_LABEL_ERROR_MSG, DNS1123_LABEL_ERROR_MSG, DNS1123_SUBDOMAIN_ERROR_MSG,
    LABEL_VALUE_ERROR_MSG, QUALIFIED_NAME_ERROR_MSG, is_dns952_label, is_dns1123_label,
    is_dns1123_subdomain, is_qualified_name, is_valid_label_value,
};
use crate::labels::LabelSet;

/// Combined size limit for all annotation keys and values.
pub const TOTAL_ANNOTATION_SIZE_LIMIT: usize = 256 * (1 << 10);

pub const NAMESPACE_DEFAULT: &str = "default";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    pub generate_name: String,
    pub namespace: String,
    pub uid: String,
    pub resource_version: String,
    pub generation: i64,
    pub labels: LabelSet,
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(namespace: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }
}

/// A resource with metadata and a kind tag.
pub trait Object {
    const KIND: &'static str;

    fn metadata(&self) -> &ObjectMeta;
}

/// Checks a name (or, with `prefix`, a generateName prefix).
/// Returns the reason it is invalid.
pub type NameValidator = fn(name: &str, prefix: bool) -> Option<String>;

/// Generated names append a random suffix, so a trailing `-` in a prefix is fine.
fn mask_trailing_dash(name: &str) -> String {
    match name.strip_suffix('-') {
        Some(stem) if !stem.is_empty() => format!("{stem}a"),
        _ => name.to_string(),
    }
}

pub fn name_is_dns_subdomain(name: &str, prefix: bool) -> Option<String> {
    let name = if prefix { mask_trailing_dash(name) } else { name.to_string() };
    (!is_dns1123_subdomain(&name)).then(|| DNS1123_SUBDOMAIN_ERROR_MSG.to_string())
}

pub fn name_is_dns_label(name: &str, prefix: bool) -> Option<String> {
    let name = if prefix { mask_trailing_dash(name) } else { name.to_string() };
    (!is_dns1123_label(&name)).then(|| DNS1123_LABEL_ERROR_MSG.to_string())
}

pub fn name_is_dns952_label(name: &str, prefix: bool) -> Option<String> {
    let name = if prefix { mask_trailing_dash(name) } else { name.to_string() };
    (!is_dns952_label(&name)).then(|| DNS952_LABEL_ERROR_MSG.to_string())
}

/// Label keys: a qualified name.
pub fn validate_label_name(name: &str, path: &Path, errs: &mut ErrorList) {
    if !is_qualified_name(name) {
        errs.add_invalid(path, name, QUALIFIED_NAME_ERROR_MSG);
    }
}

/// Which value rules apply to a string map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapFormat {
    /// Values must be label values.
    Labels,
    /// Keys are compared lower-cased; values are free-form but bounded in total size.
    Annotations,
}

/// Validate every key and value of a label or annotation map.
///
/// Errors are reported at `path` itself, carrying the offending key or value.
pub fn validate_string_map(
    map: &BTreeMap<String, String>,
    format: MapFormat,
    path: &Path,
    errs: &mut ErrorList,
) {
    let mut total_size = 0usize;
    for (k, v) in map {
        match format {
            MapFormat::Labels => {
                validate_label_name(k, path, errs);
                if !is_valid_label_value(v) {
                    errs.add_invalid(path, v, LABEL_VALUE_ERROR_MSG);
                }
            }
            MapFormat::Annotations => {
                if !is_qualified_name(&k.to_lowercase()) {
                    errs.add_invalid(path, k, QUALIFIED_NAME_ERROR_MSG);
                }
                total_size += k.len() + v.len();
            }
        }
    }
    if total_size > TOTAL_ANNOTATION_SIZE_LIMIT {
        errs.add_too_long(path, "", TOTAL_ANNOTATION_SIZE_LIMIT);
    }
}

pub fn validate_labels(labels: &LabelSet, path: &Path, errs: &mut ErrorList) {
    validate_string_map(labels, MapFormat::Labels, path, errs);
}

pub fn validate_annotations(
    annotations: &BTreeMap<String, String>,
    path: &Path,
    errs: &mut ErrorList,
) {
    validate_string_map(annotations, MapFormat::Annotations, path, errs);
}

/// Create-time metadata checks.
///
/// `requires_namespace` selects namespaced (namespace Required) versus
/// cluster-scoped (namespace Forbidden) kinds.
pub fn validate_object_meta(
    meta: &ObjectMeta,
    requires_namespace: bool,
    name_fn: NameValidator,
    path: &Path,
    errs: &mut ErrorList,
) {
    if !meta.generate_name.is_empty()
        && let Some(msg) = name_fn(&meta.generate_name, true)
    {
        errs.add_invalid(&path.child("generateName"), &meta.generate_name, msg);
    }
    if meta.name.is_empty() {
        errs.add_required(&path.child("name"), "name or generateName is required");
    } else if let Some(msg) = name_fn(&meta.name, false) {
        errs.add_invalid(&path.child("name"), &meta.name, msg);
    }
    validate_nonnegative_field(meta.generation, &path.child("generation"), errs);
    if requires_namespace {
        if meta.namespace.is_empty() {
            errs.add_required(&path.child("namespace"), "");
        } else if !is_dns1123_label(&meta.namespace) {
            errs.add_invalid(&path.child("namespace"), &meta.namespace, DNS1123_LABEL_ERROR_MSG);
        }
    } else if !meta.namespace.is_empty() {
        errs.add_forbidden(&path.child("namespace"), "not allowed on this type");
    }
    validate_labels(&meta.labels, &path.child("labels"), errs);
    validate_annotations(&meta.annotations, &path.child("annotations"), errs);
}

/// Update-time metadata checks: identity is immutable and a resource version is required.
pub fn validate_object_meta_update(
    new: &ObjectMeta,
    old: &ObjectMeta,
    path: &Path,
    errs: &mut ErrorList,
) {
    if new.resource_version.is_empty() {
        errs.add_invalid(
            &path.child("resourceVersion"),
            &new.resource_version,
            "must be specified for an update",
        );
    }
    validate_immutable_field(&new.name, &old.name, &path.child("name"), errs);
    validate_immutable_field(&new.namespace, &old.namespace, &path.child("namespace"), errs);
    // An update that leaves the uid unset keeps the stored one.
    if !new.uid.is_empty() {
        validate_immutable_field(&new.uid, &old.uid, &path.child("uid"), errs);
    }
    validate_labels(&new.labels, &path.child("labels"), errs);
    validate_annotations(&new.annotations, &path.child("annotations"), errs);
}
