//! The pod template embedded in workload resources.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::field::{ErrorList, Path};
use crate::format::{DNS1123_LABEL_ERROR_MSG, is_dns1123_label};
use crate::labels::LabelSet;
use crate::meta::{ObjectMeta, validate_annotations, validate_labels};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::Always => "Always",
            RestartPolicy::OnFailure => "OnFailure",
            RestartPolicy::Never => "Never",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnsPolicy {
    ClusterFirst,
    Default,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    Always,
    Never,
    IfNotPresent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub image_pull_policy: Option<PullPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GcePersistentDiskVolumeSource {
    pub pd_name: String,
    pub fs_type: String,
    pub partition: i32,
    pub read_only: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostPathVolumeSource {
    pub path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmptyDirVolumeSource {
    pub medium: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Volume {
    pub name: String,
    pub gce_persistent_disk: Option<GcePersistentDiskVolumeSource>,
    pub host_path: Option<HostPathVolumeSource>,
    pub empty_dir: Option<EmptyDirVolumeSource>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    pub volumes: Vec<Volume>,
    pub containers: Vec<Container>,
    pub restart_policy: Option<RestartPolicy>,
    pub dns_policy: Option<DnsPolicy>,
    pub node_selector: LabelSet,
    pub node_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodTemplateSpec {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

/// Template metadata (labels, annotations) plus the pod spec.
pub fn validate_pod_template_spec(template: &PodTemplateSpec, path: &Path, errs: &mut ErrorList) {
    let meta = path.child("metadata");
    validate_labels(&template.metadata.labels, &meta.child("labels"), errs);
    validate_annotations(&template.metadata.annotations, &meta.child("annotations"), errs);
    validate_pod_spec(&template.spec, &path.child("spec"), errs);
}

pub fn validate_pod_spec(spec: &PodSpec, path: &Path, errs: &mut ErrorList) {
    validate_volumes(&spec.volumes, &path.child("volumes"), errs);
    validate_containers(&spec.containers, &path.child("containers"), errs);
    if spec.restart_policy.is_none() {
        errs.add_required(&path.child("restartPolicy"), "");
    }
    if spec.dns_policy.is_none() {
        errs.add_required(&path.child("dnsPolicy"), "");
    }
    validate_labels(&spec.node_selector, &path.child("nodeSelector"), errs);
}

fn validate_containers(containers: &[Container], path: &Path, errs: &mut ErrorList) {
    if containers.is_empty() {
        errs.add_required(path, "");
        return;
    }
    let mut names = BTreeSet::new();
    for (i, ctr) in containers.iter().enumerate() {
        let idx = path.index(i);
        if ctr.name.is_empty() {
            errs.add_required(&idx.child("name"), "");
        } else if !is_dns1123_label(&ctr.name) {
            errs.add_invalid(&idx.child("name"), &ctr.name, DNS1123_LABEL_ERROR_MSG);
        } else if !names.insert(ctr.name.as_str()) {
            errs.add_duplicate(&idx.child("name"), &ctr.name);
        }
        if ctr.image.is_empty() {
            errs.add_required(&idx.child("image"), "");
        }
        if ctr.image_pull_policy.is_none() {
            errs.add_required(&idx.child("imagePullPolicy"), "");
        }
    }
}

fn validate_volumes(volumes: &[Volume], path: &Path, errs: &mut ErrorList) {
    let mut names = BTreeSet::new();
    for (i, vol) in volumes.iter().enumerate() {
        let idx = path.index(i);
        if vol.name.is_empty() {
            errs.add_required(&idx.child("name"), "");
        } else if !is_dns1123_label(&vol.name) {
            errs.add_invalid(&idx.child("name"), &vol.name, DNS1123_LABEL_ERROR_MSG);
        } else if !names.insert(vol.name.as_str()) {
            errs.add_duplicate(&idx.child("name"), &vol.name);
        }
        validate_volume_source(vol, &idx, errs);
    }
}

fn validate_volume_source(vol: &Volume, path: &Path, errs: &mut ErrorList) {
    let mut sources = 0;
    if let Some(pd) = &vol.gce_persistent_disk {
        sources += 1;
        let pd_path = path.child("gcePersistentDisk");
        if pd.pd_name.is_empty() {
            errs.add_required(&pd_path.child("pdName"), "");
        }
        if !(0..=255).contains(&pd.partition) {
            errs.add_invalid(
                &pd_path.child("partition"),
                &pd.partition,
                "must be in the range 0-255",
            );
        }
    }
    if let Some(host_path) = &vol.host_path {
        sources += 1;
        if host_path.path.is_empty() {
            errs.add_required(&path.child("hostPath").child("path"), "");
        }
    }
    if vol.empty_dir.is_some() {
        sources += 1;
    }
    match sources {
        0 => errs.add_required(path, "must specify a volume type"),
        1 => {}
        _ => errs.add_forbidden(path, "may not specify more than 1 volume type"),
    }
}

/// Pods scheduled onto several nodes can only share a GCE PD read-only.
pub fn validate_read_only_persistent_disks(volumes: &[Volume], path: &Path, errs: &mut ErrorList) {
    for (i, vol) in volumes.iter().enumerate() {
        if let Some(pd) = &vol.gce_persistent_disk
            && !pd.read_only
        {
            errs.add_invalid(
                &path.index(i).child("gcePersistentDisk").child("readOnly"),
                &false,
                "must be true for replicated pods > 1; GCE PD can only be mounted on multiple machines if it is read-only",
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::field::ErrorType;
    use serde_json::json;

    /// A template that passes every check, labelled `{a: b}`.
    pub(crate) fn valid_template(restart_policy: &str) -> PodTemplateSpec {
        serde_json::from_value(json!({
            "metadata": {"labels": {"a": "b"}},
            "spec": {
                "restartPolicy": restart_policy,
                "dnsPolicy": "ClusterFirst",
                "containers": [{"name": "abc", "image": "image", "imagePullPolicy": "IfNotPresent"}]
            }
        }))
        .unwrap()
    }

    fn check(template: &PodTemplateSpec) -> ErrorList {
        let mut errs = ErrorList::new();
        validate_pod_template_spec(template, &Path::new("spec").child("template"), &mut errs);
        errs
    }

    #[test]
    fn valid_template_passes() {
        assert!(check(&valid_template("Always")).is_empty());
    }

    #[test]
    fn containers_required() {
        let mut t = valid_template("Always");
        t.spec.containers.clear();
        let errs = check(&t);
        assert_eq!(errs.errors()[0].field, "spec.template.spec.containers");
        assert_eq!(errs.errors()[0].kind, ErrorType::Required);
    }

    #[test]
    fn container_field_errors() {
        let mut t = valid_template("Always");
        t.spec.containers.push(Container {
            name: "abc".into(),
            ..Default::default()
        });
        let errs = check(&t);
        let fields: Vec<&str> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "spec.template.spec.containers[1].name",
                "spec.template.spec.containers[1].image",
                "spec.template.spec.containers[1].imagePullPolicy",
            ]
        );
        assert_eq!(errs.errors()[0].kind, ErrorType::Duplicate);
    }

    #[test]
    fn policies_required() {
        let mut t = valid_template("Always");
        t.spec.restart_policy = None;
        t.spec.dns_policy = None;
        let fields: Vec<String> = check(&t).into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["spec.template.spec.restartPolicy", "spec.template.spec.dnsPolicy"]
        );
    }

    #[test]
    fn invalid_template_labels() {
        let mut t = valid_template("Always");
        t.metadata
            .labels
            .insert("NoUppercaseOrSpecialCharsLike=Equals".into(), "b".into());
        let errs = check(&t);
        assert_eq!(errs.errors()[0].field, "spec.template.metadata.labels");
    }

    #[test]
    fn volume_sources() {
        let mut t = valid_template("Always");
        t.spec.volumes = serde_json::from_value(json!([
            {"name": "gcepd", "gcePersistentDisk": {"pdName": "my-PD", "fsType": "ext4", "partition": 1}},
            {"name": "none"},
            {"name": "both", "hostPath": {"path": "/tmp"}, "emptyDir": {}},
            {"name": "gcepd", "gcePersistentDisk": {"partition": 300}}
        ]))
        .unwrap();
        let errs = check(&t);
        let summary: Vec<(&str, ErrorType)> = errs.iter().map(|e| (e.field.as_str(), e.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("spec.template.spec.volumes[1]", ErrorType::Required),
                ("spec.template.spec.volumes[2]", ErrorType::Forbidden),
                ("spec.template.spec.volumes[3].name", ErrorType::Duplicate),
                ("spec.template.spec.volumes[3].gcePersistentDisk.pdName", ErrorType::Required),
                ("spec.template.spec.volumes[3].gcePersistentDisk.partition", ErrorType::Invalid),
            ]
        );
    }

    #[test]
    fn read_write_disk_rejected_for_replicated_pods() {
        let volumes: Vec<Volume> = serde_json::from_value(json!([
            {"name": "ro", "gcePersistentDisk": {"pdName": "a", "readOnly": true}},
            {"name": "rw", "gcePersistentDisk": {"pdName": "b"}}
        ]))
        .unwrap();
        let mut errs = ErrorList::new();
        validate_read_only_persistent_disks(&volumes, &Path::new("volumes"), &mut errs);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.errors()[0].field, "volumes[1].gcePersistentDisk.readOnly");
    }
}
