//! The admission entry point: built-in validation plus per-kind CEL rules.

#[cfg(feature = "cel")]
use std::collections::BTreeMap;
#[cfg(feature = "cel")]
use std::sync::Arc;

use crate::dispatch::{self, Resource};
use crate::field::ErrorList;
#[cfg(feature = "cel")]
use crate::field::Path;
#[cfg(feature = "cel")]
use crate::rules::RuleSet;

/// A rejected object, naming the kind and object along with every field error.
#[derive(Debug, thiserror::Error)]
#[error("{kind} \"{name}\" is invalid: {errors}")]
pub struct Invalid {
    pub kind: String,
    pub name: String,
    pub errors: ErrorList,
}

/// Validates resources against the built-in rules and any CEL rules
/// registered for their kind.
///
/// ```rust
/// use kube_admission::{Resource, Validator};
///
/// let resource: Resource = serde_json::from_value(serde_json::json!({
///     "kind": "ConfigMap",
///     "metadata": {"name": "settings", "namespace": "default"},
///     "data": {"app.properties": "debug=true"}
/// }))
/// .unwrap();
/// assert!(Validator::new().admit(&resource).is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Validator {
    #[cfg(feature = "cel")]
    rules: BTreeMap<String, Arc<RuleSet>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rules` for every resource of `kind`, replacing earlier ones.
    #[cfg(feature = "cel")]
    pub fn with_rules(mut self, kind: impl Into<String>, rules: RuleSet) -> Self {
        self.rules.insert(kind.into(), Arc::new(rules));
        self
    }

    #[cfg(feature = "cel")]
    fn apply_rules(&self, new: &Resource, old: Option<&Resource>, errs: &mut ErrorList) {
        let Some(rules) = self.rules.get(new.kind()) else {
            return;
        };
        let object = match serde_json::to_value(new) {
            Ok(v) => v,
            Err(e) => {
                errs.add_internal(&Path::root(), e);
                return;
            }
        };
        let old_object = match old.map(serde_json::to_value).transpose() {
            Ok(v) => v,
            Err(e) => {
                errs.add_internal(&Path::root(), e);
                return;
            }
        };
        rules.evaluate(&object, old_object.as_ref(), errs);
    }

    #[cfg(not(feature = "cel"))]
    fn apply_rules(&self, _new: &Resource, _old: Option<&Resource>, _errs: &mut ErrorList) {}

    pub fn validate(&self, resource: &Resource) -> ErrorList {
        let mut errs = dispatch::validate(resource);
        self.apply_rules(resource, None, &mut errs);
        errs
    }

    /// Rules run only when the built-in checks accept the kind transition.
    pub fn validate_update(&self, new: &Resource, old: &Resource) -> ErrorList {
        let mut errs = dispatch::validate_update(new, old);
        if new.kind() == old.kind() {
            self.apply_rules(new, Some(old), &mut errs);
        }
        errs
    }

    /// Status writes only run the built-in checks.
    pub fn validate_status_update(&self, new: &Resource, old: &Resource) -> ErrorList {
        dispatch::validate_status_update(new, old)
    }

    pub fn admit(&self, resource: &Resource) -> Result<(), Invalid> {
        self.validate(resource)
            .into_result(resource.kind(), &resource.metadata().name)
    }

    pub fn admit_update(&self, new: &Resource, old: &Resource) -> Result<(), Invalid> {
        self.validate_update(new, old)
            .into_result(new.kind(), &new.metadata().name)
    }

    pub fn admit_status_update(&self, new: &Resource, old: &Resource) -> Result<(), Invalid> {
        self.validate_status_update(new, old)
            .into_result(new.kind(), &new.metadata().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_map(name: &str, key: &str) -> Resource {
        serde_json::from_value(json!({
            "kind": "ConfigMap",
            "metadata": {"name": name, "namespace": "default", "resourceVersion": "1"},
            "data": {key: "value"}
        }))
        .unwrap()
    }

    #[test]
    fn admit_accepts_valid() {
        assert!(Validator::new().admit(&config_map("settings", "key")).is_ok());
    }

    #[test]
    fn admit_names_rejected_object() {
        let err = Validator::new()
            .admit(&config_map("settings", "a..b"))
            .unwrap_err();
        assert_eq!(err.kind, "ConfigMap");
        assert_eq!(err.name, "settings");
        assert_eq!(err.errors.len(), 1);
        assert!(
            err.to_string()
                .starts_with("ConfigMap \"settings\" is invalid: [data[a..b]: Invalid value: \"a..b\"")
        );
    }

    #[test]
    fn status_update_on_config_map_is_forbidden() {
        let cm = config_map("settings", "key");
        let err = Validator::new().admit_status_update(&cm, &cm).unwrap_err();
        assert_eq!(err.errors.errors()[0].field, "status");
    }

    #[cfg(feature = "cel")]
    mod rules {
        use super::*;
        use crate::field::ErrorType;
        use crate::rules::Rule;

        fn validator() -> Validator {
            let rules = RuleSet::compile(&[
                Rule::new("self.metadata.name.startsWith('app-')")
                    .with_message("name must start with app-")
                    .with_field_path(".metadata.name"),
                Rule::new("self.data == oldSelf.data").with_message("data is frozen"),
            ])
            .unwrap();
            Validator::new().with_rules("ConfigMap", rules)
        }

        #[test]
        fn rules_run_after_builtin_checks() {
            let errs = validator().validate(&config_map("settings", "a..b"));
            assert_eq!(errs.len(), 2);
            assert_eq!(errs.errors()[0].field, "data[a..b]");
            assert_eq!(
                errs.errors()[1].to_string(),
                "metadata.name: Invalid value: \"settings\": name must start with app-"
            );
        }

        #[test]
        fn transition_rules_run_on_update() {
            let v = validator();
            let old = config_map("app-settings", "key");
            assert!(v.validate(&old).is_empty());
            assert!(v.validate_update(&old, &old).is_empty());

            let new = config_map("app-settings", "other");
            let errs = v.validate_update(&new, &old);
            assert_eq!(errs.len(), 1);
            assert_eq!(errs.errors()[0].field, "");
            assert_eq!(errs.errors()[0].detail, "data is frozen");
        }

        #[test]
        fn rules_are_scoped_by_kind() {
            let v = Validator::new().with_rules("Ingress", RuleSet::compile(&[Rule::new("false")]).unwrap());
            assert!(v.validate(&config_map("settings", "key")).is_empty());
        }

        #[test]
        fn status_updates_skip_rules() {
            let v = Validator::new().with_rules("ConfigMap", RuleSet::compile(&[Rule::new("false")]).unwrap());
            let cm = config_map("settings", "key");
            let errs = v.validate_status_update(&cm, &cm);
            assert_eq!(errs.len(), 1);
            assert_eq!(errs.errors()[0].kind, ErrorType::Forbidden);
        }
    }
}
