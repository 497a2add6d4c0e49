//! Daemon sets: one pod per selected node.

use serde::{Deserialize, Serialize};

use crate::common::{
    is_not_more_than_100_percent, validate_nonnegative_field, validate_positive_int_or_percent,
};
use crate::field::{ErrorList, Path};
use crate::intstr::IntOrString;
use crate::labels::{LabelSelector, selects, validate_label_selector};
use crate::meta::{
    Object, ObjectMeta, name_is_dns_subdomain, validate_object_meta, validate_object_meta_update,
};
use crate::pod::{
    PodTemplateSpec, RestartPolicy, validate_pod_template_spec,
    validate_read_only_persistent_disks,
};

pub(crate) const SELECTOR_MISMATCH_MSG: &str = "`selector` does not match template `labels`";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaemonSetUpdateStrategyType {
    RollingUpdate,
}

impl DaemonSetUpdateStrategyType {
    pub const ALL: &'static [&'static str] = &["RollingUpdate"];
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollingUpdateDaemonSet {
    pub max_unavailable: IntOrString,
    pub min_ready_seconds: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSetUpdateStrategy {
    #[serde(rename = "type")]
    pub type_: Option<DaemonSetUpdateStrategyType>,
    pub rolling_update: Option<RollingUpdateDaemonSet>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSetSpec {
    pub selector: Option<LabelSelector>,
    pub template: Option<PodTemplateSpec>,
    pub update_strategy: DaemonSetUpdateStrategy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSetStatus {
    pub current_number_scheduled: i32,
    pub number_misscheduled: i32,
    pub desired_number_scheduled: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSet {
    pub metadata: ObjectMeta,
    pub spec: DaemonSetSpec,
    pub status: DaemonSetStatus,
}

impl Object for DaemonSet {
    const KIND: &'static str = "DaemonSet";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

fn validate_rolling_update_daemon_set(
    rolling_update: &RollingUpdateDaemonSet,
    path: &Path,
    errs: &mut ErrorList,
) {
    let max_unavailable = path.child("maxUnavailable");
    validate_positive_int_or_percent(&rolling_update.max_unavailable, &max_unavailable, errs);
    if rolling_update.max_unavailable.int_or_percent_value() == 0 {
        errs.add_invalid(&max_unavailable, &rolling_update.max_unavailable, "cannot be 0");
    }
    is_not_more_than_100_percent(&rolling_update.max_unavailable, &max_unavailable, errs);
    validate_nonnegative_field(
        rolling_update.min_ready_seconds,
        &path.child("minReadySeconds"),
        errs,
    );
}

fn validate_daemon_set_update_strategy(
    strategy: &DaemonSetUpdateStrategy,
    path: &Path,
    errs: &mut ErrorList,
) {
    match strategy.type_ {
        Some(DaemonSetUpdateStrategyType::RollingUpdate) => {
            if strategy.rolling_update.is_none() {
                errs.add_required(&path.child("rollingUpdate"), "");
            }
        }
        None => errs.add_not_supported(&path.child("type"), "", DaemonSetUpdateStrategyType::ALL),
    }
    if let Some(rolling_update) = &strategy.rolling_update {
        validate_rolling_update_daemon_set(rolling_update, &path.child("rollingUpdate"), errs);
    }
}

pub fn validate_daemon_set_spec(spec: &DaemonSetSpec, path: &Path, errs: &mut ErrorList) {
    let selector_path = path.child("selector");
    match &spec.selector {
        Some(selector) => validate_label_selector(selector, &selector_path, errs),
        None => errs.add_required(&selector_path, ""),
    }

    let template_path = path.child("template");
    let Some(template) = &spec.template else {
        errs.add_required(&template_path, "");
        return;
    };
    if !selects(spec.selector.as_ref(), &template.metadata.labels) {
        errs.add_invalid(
            &template_path.child("metadata").child("labels"),
            &template.metadata.labels,
            SELECTOR_MISMATCH_MSG,
        );
    }
    validate_pod_template_spec(template, &template_path, errs);
    // Daemons run on many nodes at once.
    validate_read_only_persistent_disks(
        &template.spec.volumes,
        &template_path.child("spec").child("volumes"),
        errs,
    );
    if template.spec.restart_policy != Some(RestartPolicy::Always) {
        errs.add_not_supported(
            &template_path.child("spec").child("restartPolicy"),
            &template.spec.restart_policy,
            &[RestartPolicy::Always.as_str()],
        );
    }

    validate_daemon_set_update_strategy(&spec.update_strategy, &path.child("updateStrategy"), errs);
}

pub fn validate_daemon_set(ds: &DaemonSet) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta(&ds.metadata, true, name_is_dns_subdomain, &Path::new("metadata"), &mut errs);
    validate_daemon_set_spec(&ds.spec, &Path::new("spec"), &mut errs);
    errs
}

/// On update only the node placement of the pod spec may change.
/// Template labels are excluded so the selector can move with them.
pub fn validate_daemon_set_template_update(
    new: &PodTemplateSpec,
    old: &PodTemplateSpec,
    path: &Path,
    errs: &mut ErrorList,
) {
    let mut spec = new.spec.clone();
    spec.node_selector = old.spec.node_selector.clone();
    spec.node_name = old.spec.node_name.clone();
    if spec != old.spec {
        errs.add_forbidden(
            &path.child("spec"),
            "daemonSetUpdate may not update fields other than spec.nodeSelector",
        );
    }
}

pub fn validate_daemon_set_update(new: &DaemonSet, old: &DaemonSet) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    let spec = Path::new("spec");
    validate_daemon_set_spec(&new.spec, &spec, &mut errs);
    if let (Some(new_template), Some(old_template)) = (&new.spec.template, &old.spec.template) {
        validate_daemon_set_template_update(new_template, old_template, &spec.child("template"), &mut errs);
    }
    errs
}

/// Status writes touch only the scheduling counters; `spec` is not re-validated.
pub fn validate_daemon_set_status_update(new: &DaemonSet, old: &DaemonSet) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    let status = Path::new("status");
    validate_nonnegative_field(
        new.status.current_number_scheduled,
        &status.child("currentNumberScheduled"),
        &mut errs,
    );
    validate_nonnegative_field(
        new.status.number_misscheduled,
        &status.child("numberMisscheduled"),
        &mut errs,
    );
    validate_nonnegative_field(
        new.status.desired_number_scheduled,
        &status.child("desiredNumberScheduled"),
        &mut errs,
    );
    errs
}
