//! Horizontal pod autoscalers, the cluster autoscaler singleton and the scale subresource.

use serde::{Deserialize, Serialize};

use crate::common::{validate_nonnegative_field, validate_ordered_pair, validate_positive_field};
use crate::field::{ErrorList, Path};
use crate::format::path_segment_name_errors;
use crate::labels::LabelSet;
use crate::meta::{
    NAMESPACE_DEFAULT, Object, ObjectMeta, name_is_dns_subdomain, validate_annotations,
    validate_labels, validate_object_meta, validate_object_meta_update,
};

/// The only subresource an autoscaler may target.
pub const SCALE_SUBRESOURCE: &str = "scale";

/// The fixed name of the cluster autoscaler object.
pub const CLUSTER_AUTOSCALER_NAME: &str = "ClusterAutoscaler";

// ── Horizontal pod autoscaler ───────────────────────────────────────

/// Points at the subresource of another object, e.g. `ReplicationController/myrc/scale`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubresourceReference {
    pub kind: String,
    pub name: String,
    pub api_version: String,
    pub subresource: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CpuTargetUtilization {
    pub target_percentage: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HorizontalPodAutoscalerSpec {
    pub scale_ref: SubresourceReference,
    pub min_replicas: Option<i32>,
    pub max_replicas: i32,
    pub cpu_utilization: Option<CpuTargetUtilization>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HorizontalPodAutoscalerStatus {
    pub observed_generation: Option<i64>,
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub current_cpu_utilization_percentage: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HorizontalPodAutoscaler {
    pub metadata: ObjectMeta,
    pub spec: HorizontalPodAutoscalerSpec,
    pub status: HorizontalPodAutoscalerStatus,
}

impl Object for HorizontalPodAutoscaler {
    const KIND: &'static str = "HorizontalPodAutoscaler";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

fn validate_subresource_reference(reference: &SubresourceReference, path: &Path, errs: &mut ErrorList) {
    let before = errs.len();
    for (value, field) in [
        (&reference.kind, "kind"),
        (&reference.name, "name"),
        (&reference.subresource, "subresource"),
    ] {
        let field_path = path.child(field);
        if value.is_empty() {
            errs.add_required(&field_path, "");
            continue;
        }
        for msg in path_segment_name_errors(value, false) {
            errs.add_invalid(&field_path, value, msg);
        }
    }
    if errs.len() == before && reference.subresource != SCALE_SUBRESOURCE {
        errs.add_not_supported(
            &path.child("subresource"),
            &reference.subresource,
            &[SCALE_SUBRESOURCE],
        );
    }
}

fn validate_horizontal_pod_autoscaler_spec(
    spec: &HorizontalPodAutoscalerSpec,
    path: &Path,
    errs: &mut ErrorList,
) {
    if let Some(min) = spec.min_replicas {
        validate_positive_field(min, &path.child("minReplicas"), errs);
    }
    let max_path = path.child("maxReplicas");
    validate_positive_field(spec.max_replicas, &max_path, errs);
    if let Some(min) = spec.min_replicas {
        validate_ordered_pair(min, spec.max_replicas, "minReplicas", &max_path, errs);
    }
    if let Some(cpu) = &spec.cpu_utilization {
        validate_positive_field(
            cpu.target_percentage,
            &path.child("cpuUtilization").child("targetPercentage"),
            errs,
        );
    }
    validate_subresource_reference(&spec.scale_ref, &path.child("scaleRef"), errs);
}

pub fn validate_horizontal_pod_autoscaler(hpa: &HorizontalPodAutoscaler) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta(&hpa.metadata, true, name_is_dns_subdomain, &Path::new("metadata"), &mut errs);
    validate_horizontal_pod_autoscaler_spec(&hpa.spec, &Path::new("spec"), &mut errs);
    errs
}

pub fn validate_horizontal_pod_autoscaler_update(
    new: &HorizontalPodAutoscaler,
    old: &HorizontalPodAutoscaler,
) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    validate_horizontal_pod_autoscaler_spec(&new.spec, &Path::new("spec"), &mut errs);
    errs
}

pub fn validate_horizontal_pod_autoscaler_status_update(
    new: &HorizontalPodAutoscaler,
    old: &HorizontalPodAutoscaler,
) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    let status = Path::new("status");
    validate_nonnegative_field(new.status.current_replicas, &status.child("currentReplicas"), &mut errs);
    validate_nonnegative_field(new.status.desired_replicas, &status.child("desiredReplicas"), &mut errs);
    errs
}

// ── Cluster autoscaler ──────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeResource {
    CpuRequest,
    MemRequest,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeUtilization {
    pub resource: Option<NodeResource>,
    /// Fraction of the resource in use, in `(0, 1]`.
    pub value: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterAutoscalerSpec {
    pub min_nodes: i32,
    pub max_nodes: i32,
    pub target_utilization: Vec<NodeUtilization>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterAutoscaler {
    pub metadata: ObjectMeta,
    pub spec: ClusterAutoscalerSpec,
}

impl Object for ClusterAutoscaler {
    const KIND: &'static str = "ClusterAutoscaler";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

fn validate_cluster_autoscaler_spec(spec: &ClusterAutoscalerSpec, path: &Path, errs: &mut ErrorList) {
    validate_nonnegative_field(spec.min_nodes, &path.child("minNodes"), errs);
    validate_ordered_pair(spec.min_nodes, spec.max_nodes, "minNodes", &path.child("maxNodes"), errs);
    let targets = path.child("targetUtilization");
    if spec.target_utilization.is_empty() {
        errs.add_required(&targets, "");
    }
    for (i, target) in spec.target_utilization.iter().enumerate() {
        let idx = targets.index(i);
        if target.resource.is_none() {
            errs.add_required(&idx.child("resource"), "");
        }
        if target.value <= 0.0 {
            errs.add_invalid(&idx.child("value"), &target.value, "must be greater than 0");
        } else if target.value > 1.0 {
            errs.add_invalid(&idx.child("value"), &target.value, "must be less than or equal to 1");
        }
    }
}

/// The cluster autoscaler is a singleton: its name and namespace are fixed.
pub fn validate_cluster_autoscaler(autoscaler: &ClusterAutoscaler) -> ErrorList {
    let mut errs = ErrorList::new();
    let meta = Path::new("metadata");
    if autoscaler.metadata.name != CLUSTER_AUTOSCALER_NAME {
        errs.add_invalid(
            &meta.child("name"),
            &autoscaler.metadata.name,
            format!("must be '{CLUSTER_AUTOSCALER_NAME}'"),
        );
    }
    if autoscaler.metadata.namespace != NAMESPACE_DEFAULT {
        errs.add_invalid(
            &meta.child("namespace"),
            &autoscaler.metadata.namespace,
            format!("must be '{NAMESPACE_DEFAULT}'"),
        );
    }
    validate_labels(&autoscaler.metadata.labels, &meta.child("labels"), &mut errs);
    validate_annotations(&autoscaler.metadata.annotations, &meta.child("annotations"), &mut errs);
    validate_cluster_autoscaler_spec(&autoscaler.spec, &Path::new("spec"), &mut errs);
    errs
}

pub fn validate_cluster_autoscaler_update(new: &ClusterAutoscaler, old: &ClusterAutoscaler) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    errs.extend(validate_cluster_autoscaler(new));
    errs
}

// ── Scale ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleSpec {
    pub replicas: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleStatus {
    pub replicas: i32,
    pub selector: LabelSet,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scale {
    pub metadata: ObjectMeta,
    pub spec: ScaleSpec,
    pub status: ScaleStatus,
}

impl Object for Scale {
    const KIND: &'static str = "Scale";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

/// Zero replicas is valid: it means scaled to nothing.
pub fn validate_scale(scale: &Scale) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta(&scale.metadata, true, name_is_dns_subdomain, &Path::new("metadata"), &mut errs);
    validate_nonnegative_field(
        scale.spec.replicas,
        &Path::new("spec").child("replicas"),
        &mut errs,
    );
    errs
}
