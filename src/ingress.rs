//! Ingress: host and path routing to backend services.

use serde::{Deserialize, Serialize};

use crate::common::{
    validate_dns_host, validate_ip, validate_port_name_or_number, validate_url_path_pattern,
};
use crate::field::{ErrorList, Path};
use crate::intstr::IntOrString;
use crate::meta::{
    Object, ObjectMeta, name_is_dns952_label, name_is_dns_subdomain, validate_object_meta,
    validate_object_meta_update,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressBackend {
    pub service_name: String,
    pub service_port: IntOrString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpIngressPath {
    /// Extended POSIX regex matched against the request path; empty matches all paths.
    pub path: String,
    pub backend: IngressBackend,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpIngressRuleValue {
    pub paths: Vec<HttpIngressPath>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressRule {
    pub host: String,
    pub http: Option<HttpIngressRuleValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressSpec {
    /// Catches requests no rule matches.
    pub backend: Option<IngressBackend>,
    pub rules: Vec<IngressRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerIngress {
    pub ip: String,
    pub hostname: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerStatus {
    pub ingress: Vec<LoadBalancerIngress>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressStatus {
    pub load_balancer: LoadBalancerStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ingress {
    pub metadata: ObjectMeta,
    pub spec: IngressSpec,
    pub status: IngressStatus,
}

impl Object for Ingress {
    const KIND: &'static str = "Ingress";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

fn validate_ingress_backend(backend: &IngressBackend, path: &Path, errs: &mut ErrorList) {
    let service_name = path.child("serviceName");
    if backend.service_name.is_empty() {
        errs.add_required(&service_name, "");
        return;
    }
    if let Some(msg) = name_is_dns952_label(&backend.service_name, false) {
        errs.add_invalid(&service_name, &backend.service_name, msg);
    }
    validate_port_name_or_number(&backend.service_port, &path.child("servicePort"), errs);
}

fn validate_http_ingress_rule_value(http: &HttpIngressRuleValue, path: &Path, errs: &mut ErrorList) {
    let paths = path.child("paths");
    if http.paths.is_empty() {
        errs.add_required(&paths, "");
    }
    for (i, route) in http.paths.iter().enumerate() {
        let idx = paths.index(i);
        if !route.path.is_empty() {
            validate_url_path_pattern(&route.path, &idx.child("path"), errs);
        }
        validate_ingress_backend(&route.backend, &idx.child("backend"), errs);
    }
}

fn validate_ingress_rules(rules: &[IngressRule], path: &Path, errs: &mut ErrorList) {
    for (i, rule) in rules.iter().enumerate() {
        let idx = path.index(i);
        if !rule.host.is_empty() {
            validate_dns_host(&rule.host, &idx.child("host"), errs);
        }
        match &rule.http {
            Some(http) => validate_http_ingress_rule_value(http, &idx.child("http"), errs),
            None => errs.add_required(&idx.child("http"), "at least one path is required"),
        }
    }
}

pub fn validate_ingress_spec(spec: &IngressSpec, path: &Path, errs: &mut ErrorList) {
    match &spec.backend {
        Some(backend) => validate_ingress_backend(backend, &path.child("backend"), errs),
        None if spec.rules.is_empty() => errs.add_invalid(
            &path.child("rules"),
            &spec.rules,
            "either `backend` or `rules` must be specified",
        ),
        None => {}
    }
    validate_ingress_rules(&spec.rules, &path.child("rules"), errs);
}

pub fn validate_ingress(ingress: &Ingress) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta(&ingress.metadata, true, name_is_dns_subdomain, &Path::new("metadata"), &mut errs);
    validate_ingress_spec(&ingress.spec, &Path::new("spec"), &mut errs);
    errs
}

pub fn validate_ingress_update(new: &Ingress, old: &Ingress) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    validate_ingress_spec(&new.spec, &Path::new("spec"), &mut errs);
    errs
}

pub fn validate_load_balancer_status(status: &LoadBalancerStatus, path: &Path, errs: &mut ErrorList) {
    for (i, entry) in status.ingress.iter().enumerate() {
        let idx = path.child("ingress").index(i);
        if !entry.ip.is_empty() {
            validate_ip(&entry.ip, &idx.child("ip"), errs);
        }
        if !entry.hostname.is_empty() {
            validate_dns_host(&entry.hostname, &idx.child("hostname"), errs);
        }
    }
}

pub fn validate_ingress_status_update(new: &Ingress, old: &Ingress) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    validate_load_balancer_status(
        &new.status.load_balancer,
        &Path::new("status").child("loadBalancer"),
        &mut errs,
    );
    errs
}
