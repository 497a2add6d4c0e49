//! Deployments: replicated pods rolled out by strategy.

use serde::{Deserialize, Serialize};

use crate::common::{
    is_not_more_than_100_percent, validate_nonnegative_field, validate_positive_int_or_percent,
};
use crate::daemonset::SELECTOR_MISMATCH_MSG;
use crate::field::{ErrorList, Path};
use crate::intstr::IntOrString;
use crate::labels::LabelSet;
use crate::meta::{
    Object, ObjectMeta, name_is_dns_subdomain, validate_label_name, validate_labels,
    validate_object_meta, validate_object_meta_update,
};
use crate::pod::{
    PodTemplateSpec, RestartPolicy, validate_pod_template_spec,
    validate_read_only_persistent_disks,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentStrategyType {
    Recreate,
    RollingUpdate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollingUpdateDeployment {
    pub max_unavailable: IntOrString,
    pub max_surge: IntOrString,
    pub min_ready_seconds: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentStrategy {
    #[serde(rename = "type")]
    pub type_: Option<DeploymentStrategyType>,
    pub rolling_update: Option<RollingUpdateDeployment>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentSpec {
    pub replicas: i32,
    pub selector: LabelSet,
    pub template: PodTemplateSpec,
    pub strategy: DeploymentStrategy,
    /// Label added to pods to tell rollout generations apart.
    pub unique_label_key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentStatus {
    pub replicas: i32,
    pub updated_replicas: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
    pub status: DeploymentStatus,
}

impl Object for Deployment {
    const KIND: &'static str = "Deployment";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

fn validate_rolling_update_deployment(
    rolling_update: &RollingUpdateDeployment,
    path: &Path,
    errs: &mut ErrorList,
) {
    let max_unavailable = path.child("maxUnavailable");
    validate_positive_int_or_percent(&rolling_update.max_unavailable, &max_unavailable, errs);
    validate_positive_int_or_percent(&rolling_update.max_surge, &path.child("maxSurge"), errs);
    if rolling_update.max_unavailable.int_or_percent_value() == 0
        && rolling_update.max_surge.int_or_percent_value() == 0
    {
        errs.add_invalid(
            &max_unavailable,
            &rolling_update.max_unavailable,
            "may not be 0 when `maxSurge` is 0",
        );
    }
    is_not_more_than_100_percent(&rolling_update.max_unavailable, &max_unavailable, errs);
    validate_nonnegative_field(
        rolling_update.min_ready_seconds,
        &path.child("minReadySeconds"),
        errs,
    );
}

fn validate_deployment_strategy(strategy: &DeploymentStrategy, path: &Path, errs: &mut ErrorList) {
    let Some(rolling_update) = &strategy.rolling_update else {
        return;
    };
    let rolling_path = path.child("rollingUpdate");
    match strategy.type_ {
        Some(DeploymentStrategyType::Recreate) => errs.add_forbidden(
            &rolling_path,
            "may not be specified when strategy `type` is 'Recreate'",
        ),
        Some(DeploymentStrategyType::RollingUpdate) => {
            validate_rolling_update_deployment(rolling_update, &rolling_path, errs)
        }
        None => {}
    }
}

/// Template checks for a replicated workload driven by a map selector.
fn validate_replicated_template(
    template: &PodTemplateSpec,
    selector: &LabelSet,
    replicas: i32,
    path: &Path,
    errs: &mut ErrorList,
) {
    if !selector.is_empty() && template.metadata.labels != *selector {
        errs.add_invalid(
            &path.child("metadata").child("labels"),
            &template.metadata.labels,
            SELECTOR_MISMATCH_MSG,
        );
    }
    validate_pod_template_spec(template, path, errs);
    if replicas > 1 {
        validate_read_only_persistent_disks(
            &template.spec.volumes,
            &path.child("spec").child("volumes"),
            errs,
        );
    }
    if template.spec.restart_policy != Some(RestartPolicy::Always) {
        errs.add_not_supported(
            &path.child("spec").child("restartPolicy"),
            &template.spec.restart_policy,
            &[RestartPolicy::Always.as_str()],
        );
    }
}

pub fn validate_deployment_spec(spec: &DeploymentSpec, path: &Path, errs: &mut ErrorList) {
    let selector = path.child("selector");
    if spec.selector.is_empty() {
        errs.add_required(&selector, "");
    } else {
        validate_labels(&spec.selector, &selector, errs);
    }
    validate_nonnegative_field(spec.replicas, &path.child("replicas"), errs);
    validate_replicated_template(
        &spec.template,
        &spec.selector,
        spec.replicas,
        &path.child("template"),
        errs,
    );
    validate_deployment_strategy(&spec.strategy, &path.child("strategy"), errs);
    if !spec.unique_label_key.is_empty() {
        validate_label_name(&spec.unique_label_key, &path.child("uniqueLabel"), errs);
    }
}

pub fn validate_deployment(deployment: &Deployment) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta(
        &deployment.metadata,
        true,
        name_is_dns_subdomain,
        &Path::new("metadata"),
        &mut errs,
    );
    validate_deployment_spec(&deployment.spec, &Path::new("spec"), &mut errs);
    errs
}

pub fn validate_deployment_update(new: &Deployment, old: &Deployment) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    validate_deployment_spec(&new.spec, &Path::new("spec"), &mut errs);
    errs
}

pub fn validate_deployment_status_update(new: &Deployment, old: &Deployment) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    let status = Path::new("status");
    validate_nonnegative_field(new.status.replicas, &status.child("replicas"), &mut errs);
    validate_nonnegative_field(
        new.status.updated_replicas,
        &status.child("updatedReplicas"),
        &mut errs,
    );
    errs
}
