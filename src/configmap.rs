//! Config maps: free-form configuration data keyed by file-name-like keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::{ErrorList, Path};
use crate::format::config_map_key_errors;
use crate::meta::{
    Object, ObjectMeta, name_is_dns_subdomain, validate_object_meta, validate_object_meta_update,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigMap {
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

impl Object for ConfigMap {
    const KIND: &'static str = "ConfigMap";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

pub fn validate_config_map(config_map: &ConfigMap) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta(
        &config_map.metadata,
        true,
        name_is_dns_subdomain,
        &Path::new("metadata"),
        &mut errs,
    );
    let data = Path::new("data");
    for key in config_map.data.keys() {
        for msg in config_map_key_errors(key) {
            errs.add_invalid(&data.key(key), key, msg);
        }
    }
    errs
}

pub fn validate_config_map_update(new: &ConfigMap, old: &ConfigMap) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    errs.extend(validate_config_map(new));
    errs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_map(name: &str, namespace: &str, data: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta::named(namespace, name),
            data: data
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn create() {
        let max_key = "a".repeat(253);
        let over_max_key = "a".repeat(254);
        let cases: Vec<(&str, ConfigMap, bool)> = vec![
            ("valid", config_map("validname", "validns", &[("key", "value")]), true),
            ("max key length", config_map("validname", "validns", &[(&max_key, "value")]), true),
            ("leading dot key", config_map("validname", "validns", &[(".ab", "value")]), true),
            ("empty name", config_map("", "validns", &[]), false),
            ("invalid name", config_map("NoUppercaseOrSpecialCharsLike=Equals", "validns", &[]), false),
            ("invalid key", config_map("validname", "validns", &[("a..b", "value")]), false),
            ("empty namespace", config_map("validname", "", &[]), false),
            ("invalid namespace", config_map("validname", "NoUppercaseOrSpecialCharsLike=Equals", &[]), false),
            ("dot key", config_map("validname", "validns", &[(".", "value")]), false),
            ("double dot key", config_map("validname", "validns", &[("..", "value")]), false),
            ("over max key length", config_map("validname", "validns", &[(&over_max_key, "value")]), false),
        ];
        for (name, cm, valid) in &cases {
            let errs = validate_config_map(cm);
            assert_eq!(errs.is_empty(), *valid, "{name}: {errs}");
        }
    }

    #[test]
    fn key_errors_are_addressed_by_key() {
        let errs = validate_config_map(&config_map("validname", "validns", &[("a..b", "value")]));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.errors()[0].field, "data[a..b]");
        assert_eq!(errs.errors()[0].bad_value, serde_json::json!("a..b"));
    }

    #[test]
    fn update() {
        let mut valid = config_map("validname", "validns", &[("key", "value")]);
        valid.metadata.resource_version = "1".into();
        let no_version = config_map("validname", "validns", &[("key", "value")]);
        assert!(validate_config_map_update(&valid, &valid).is_empty());
        assert!(!validate_config_map_update(&no_version, &valid).is_empty());
    }
}
