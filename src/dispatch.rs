//! Kind-tag dispatch to the per-kind validators.
//!
//! [`Resource`] is the union of every kind this crate admits. It deserializes
//! from the usual wire shape, with `kind` next to `metadata` and `spec`, and
//! routes each call to the matching free function.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::autoscaling::{
    ClusterAutoscaler, HorizontalPodAutoscaler, Scale, validate_cluster_autoscaler,
    validate_cluster_autoscaler_update, validate_horizontal_pod_autoscaler,
    validate_horizontal_pod_autoscaler_status_update, validate_horizontal_pod_autoscaler_update,
    validate_scale,
};
use crate::configmap::{ConfigMap, validate_config_map, validate_config_map_update};
use crate::daemonset::{
    DaemonSet, validate_daemon_set, validate_daemon_set_status_update, validate_daemon_set_update,
};
use crate::deployment::{
    Deployment, validate_deployment, validate_deployment_status_update, validate_deployment_update,
};
use crate::field::{ErrorList, Path};
use crate::ingress::{Ingress, validate_ingress, validate_ingress_status_update, validate_ingress_update};
use crate::job::{Job, validate_job, validate_job_status_update, validate_job_update};
use crate::meta::{Object, ObjectMeta, validate_object_meta_update};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    HorizontalPodAutoscaler(HorizontalPodAutoscaler),
    DaemonSet(DaemonSet),
    Deployment(Deployment),
    Job(Job),
    Ingress(Ingress),
    Scale(Scale),
    ConfigMap(ConfigMap),
    ClusterAutoscaler(ClusterAutoscaler),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::HorizontalPodAutoscaler(_) => HorizontalPodAutoscaler::KIND,
            Resource::DaemonSet(_) => DaemonSet::KIND,
            Resource::Deployment(_) => Deployment::KIND,
            Resource::Job(_) => Job::KIND,
            Resource::Ingress(_) => Ingress::KIND,
            Resource::Scale(_) => Scale::KIND,
            Resource::ConfigMap(_) => ConfigMap::KIND,
            Resource::ClusterAutoscaler(_) => ClusterAutoscaler::KIND,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Resource::HorizontalPodAutoscaler(r) => r.metadata(),
            Resource::DaemonSet(r) => r.metadata(),
            Resource::Deployment(r) => r.metadata(),
            Resource::Job(r) => r.metadata(),
            Resource::Ingress(r) => r.metadata(),
            Resource::Scale(r) => r.metadata(),
            Resource::ConfigMap(r) => r.metadata(),
            Resource::ClusterAutoscaler(r) => r.metadata(),
        }
    }
}

macro_rules! impl_from_kind {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<$kind> for Resource {
                fn from(value: $kind) -> Self {
                    Resource::$kind(value)
                }
            }
        )*
    };
}

impl_from_kind!(
    HorizontalPodAutoscaler,
    DaemonSet,
    Deployment,
    Job,
    Ingress,
    Scale,
    ConfigMap,
    ClusterAutoscaler,
);

fn log_verdict(op: &str, resource: &Resource, errs: &ErrorList) {
    let meta = resource.metadata();
    debug!(
        op,
        kind = resource.kind(),
        namespace = %meta.namespace,
        name = %meta.name,
        errors = errs.len(),
        "validated resource"
    );
}

/// Create-time validation.
pub fn validate(resource: &Resource) -> ErrorList {
    let errs = match resource {
        Resource::HorizontalPodAutoscaler(r) => validate_horizontal_pod_autoscaler(r),
        Resource::DaemonSet(r) => validate_daemon_set(r),
        Resource::Deployment(r) => validate_deployment(r),
        Resource::Job(r) => validate_job(r),
        Resource::Ingress(r) => validate_ingress(r),
        Resource::Scale(r) => validate_scale(r),
        Resource::ConfigMap(r) => validate_config_map(r),
        Resource::ClusterAutoscaler(r) => validate_cluster_autoscaler(r),
    };
    log_verdict("create", resource, &errs);
    errs
}

fn kind_changed(new: &Resource, old: &Resource) -> ErrorList {
    let mut errs = ErrorList::new();
    errs.add_invalid(
        &Path::new("kind"),
        new.kind(),
        format!("may not change kind from `{}`", old.kind()),
    );
    errs
}

/// Update validation of `new` against the stored `old`.
pub fn validate_update(new: &Resource, old: &Resource) -> ErrorList {
    let errs = match (new, old) {
        (Resource::HorizontalPodAutoscaler(n), Resource::HorizontalPodAutoscaler(o)) => {
            validate_horizontal_pod_autoscaler_update(n, o)
        }
        (Resource::DaemonSet(n), Resource::DaemonSet(o)) => validate_daemon_set_update(n, o),
        (Resource::Deployment(n), Resource::Deployment(o)) => validate_deployment_update(n, o),
        (Resource::Job(n), Resource::Job(o)) => validate_job_update(n, o),
        (Resource::Ingress(n), Resource::Ingress(o)) => validate_ingress_update(n, o),
        (Resource::Scale(n), Resource::Scale(o)) => {
            let mut errs = ErrorList::new();
            validate_object_meta_update(&n.metadata, &o.metadata, &Path::new("metadata"), &mut errs);
            errs.extend(validate_scale(n));
            errs
        }
        (Resource::ConfigMap(n), Resource::ConfigMap(o)) => validate_config_map_update(n, o),
        (Resource::ClusterAutoscaler(n), Resource::ClusterAutoscaler(o)) => {
            validate_cluster_autoscaler_update(n, o)
        }
        _ => kind_changed(new, old),
    };
    log_verdict("update", new, &errs);
    errs
}

/// Validation of a write to the status subresource.
///
/// Kinds without a status subresource reject the write at `status`.
pub fn validate_status_update(new: &Resource, old: &Resource) -> ErrorList {
    let errs = match (new, old) {
        (Resource::HorizontalPodAutoscaler(n), Resource::HorizontalPodAutoscaler(o)) => {
            validate_horizontal_pod_autoscaler_status_update(n, o)
        }
        (Resource::DaemonSet(n), Resource::DaemonSet(o)) => validate_daemon_set_status_update(n, o),
        (Resource::Deployment(n), Resource::Deployment(o)) => {
            validate_deployment_status_update(n, o)
        }
        (Resource::Job(n), Resource::Job(o)) => validate_job_status_update(n, o),
        (Resource::Ingress(n), Resource::Ingress(o)) => validate_ingress_status_update(n, o),
        (Resource::Scale(_), Resource::Scale(_))
        | (Resource::ConfigMap(_), Resource::ConfigMap(_))
        | (Resource::ClusterAutoscaler(_), Resource::ClusterAutoscaler(_)) => {
            let mut errs = ErrorList::new();
            errs.add_forbidden(
                &Path::new("status"),
                format!("{} has no status subresource", new.kind()),
            );
            errs
        }
        _ => kind_changed(new, old),
    };
    log_verdict("status update", new, &errs);
    errs
}
