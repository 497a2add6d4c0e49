//! End-to-end admission of JSON documents through the kind-tagged dispatcher.

use kube_admission::labels::LabelSelector;
use kube_admission::meta::Object;
use kube_admission::{ErrorType, Resource, Validator, validate, validate_status_update, validate_update};
use serde_json::{Value, json};

fn resource(value: Value) -> Resource {
    serde_json::from_value(value).unwrap()
}

fn pod_template(restart_policy: &str) -> Value {
    json!({
        "metadata": {"labels": {"app": "web"}},
        "spec": {
            "restartPolicy": restart_policy,
            "dnsPolicy": "ClusterFirst",
            "containers": [{"name": "web", "image": "nginx", "imagePullPolicy": "IfNotPresent"}]
        }
    })
}

fn deployment() -> Value {
    json!({
        "kind": "Deployment",
        "metadata": {"name": "web", "namespace": "default", "resourceVersion": "10"},
        "spec": {
            "replicas": 3,
            "selector": {"app": "web"},
            "template": pod_template("Always"),
            "strategy": {
                "type": "RollingUpdate",
                "rollingUpdate": {"maxUnavailable": "25%", "maxSurge": 1}
            }
        }
    })
}

fn daemon_set() -> Value {
    json!({
        "kind": "DaemonSet",
        "metadata": {"name": "agent", "namespace": "default", "resourceVersion": "4"},
        "spec": {
            "selector": {"matchLabels": {"app": "web"}},
            "template": pod_template("Always"),
            "updateStrategy": {"type": "RollingUpdate", "rollingUpdate": {"maxUnavailable": 1}}
        }
    })
}

fn job() -> Value {
    json!({
        "kind": "Job",
        "metadata": {"name": "batch", "namespace": "default", "resourceVersion": "2"},
        "spec": {
            "parallelism": 2,
            "completions": 4,
            "selector": {"matchLabels": {"app": "web"}},
            "template": pod_template("OnFailure")
        }
    })
}

fn fields(errs: &kube_admission::ErrorList) -> Vec<&str> {
    errs.iter().map(|e| e.field.as_str()).collect()
}

#[test]
fn valid_documents_are_admitted() {
    let validator = Validator::new();
    for doc in [deployment(), daemon_set(), job()] {
        let r = resource(doc);
        assert!(validator.admit(&r).is_ok(), "{}: {}", r.kind(), validate(&r));
    }
}

#[test]
fn every_error_in_one_pass() {
    let mut doc = deployment();
    doc["spec"]["replicas"] = json!(-1);
    doc["spec"]["template"]["metadata"]["labels"] = json!({"app": "api"});
    doc["spec"]["template"]["spec"]["containers"][0]["image"] = json!("");
    doc["spec"]["strategy"]["rollingUpdate"] = json!({"maxUnavailable": 0, "maxSurge": 0});

    let errs = validate(&resource(doc));
    assert_eq!(
        fields(&errs),
        vec![
            "spec.replicas",
            "spec.template.metadata.labels",
            "spec.template.spec.containers[0].image",
            "spec.strategy.rollingUpdate.maxUnavailable",
        ]
    );
    assert_eq!(
        errs.errors()[3].to_string(),
        "spec.strategy.rollingUpdate.maxUnavailable: Invalid value: 0: may not be 0 when `maxSurge` is 0"
    );
}

#[test]
fn deployment_restart_policy_must_be_always() {
    let mut doc = deployment();
    doc["spec"]["template"] = pod_template("Never");
    let errs = validate(&resource(doc));
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs.errors()[0].to_string(),
        "spec.template.spec.restartPolicy: Unsupported value: \"Never\": supported values: \"Always\""
    );
}

#[test]
fn daemon_set_selector_must_match_template() {
    let mut doc = daemon_set();
    doc["spec"]["selector"] = json!({"matchLabels": {"app": "other"}});
    let errs = validate(&resource(doc));
    assert_eq!(fields(&errs), vec!["spec.template.metadata.labels"]);

    let mut doc = daemon_set();
    doc["spec"]
        .as_object_mut()
        .unwrap()
        .remove("selector");
    let errs = validate(&resource(doc));
    assert_eq!(errs.errors()[0].field, "spec.selector");
    assert_eq!(errs.errors()[0].kind, ErrorType::Required);
}

#[test]
fn daemon_set_update_limited_to_node_placement() {
    let old = resource(daemon_set());

    let mut doc = daemon_set();
    doc["spec"]["template"]["spec"]["nodeSelector"] = json!({"disk": "ssd"});
    assert!(validate_update(&resource(doc), &old).is_empty());

    let mut doc = daemon_set();
    doc["spec"]["template"]["spec"]["containers"][0]["image"] = json!("nginx:2");
    let errs = validate_update(&resource(doc), &old);
    assert_eq!(fields(&errs), vec!["spec.template.spec"]);
    assert_eq!(errs.errors()[0].kind, ErrorType::Forbidden);
}

#[test]
fn job_fields_fixed_after_creation() {
    let old = resource(job());
    let mut doc = job();
    doc["spec"]["completions"] = json!(5);
    doc["spec"]["parallelism"] = json!(3);
    let errs = validate_update(&resource(doc), &old);
    assert_eq!(fields(&errs), vec!["spec.completions"]);
    assert_eq!(errs.errors()[0].kind, ErrorType::Forbidden);
}

#[test]
fn identity_is_immutable_on_update() {
    let old = resource(deployment());
    let mut doc = deployment();
    doc["metadata"]["namespace"] = json!("prod");
    let errs = validate_update(&resource(doc), &old);
    assert_eq!(errs.errors()[0].field, "metadata.namespace");
}

#[test]
fn status_updates_check_counters_only() {
    let old = resource(job());
    let mut doc = job();
    doc["spec"]["parallelism"] = json!(-1);
    doc["status"] = json!({"active": 1, "succeeded": -2, "failed": 0});
    let errs = validate_status_update(&resource(doc), &old);
    assert_eq!(fields(&errs), vec!["status.succeeded"]);
}

#[test]
fn autoscaler_and_ingress() {
    let hpa = resource(json!({
        "kind": "HorizontalPodAutoscaler",
        "metadata": {"name": "web", "namespace": "default"},
        "spec": {
            "scaleRef": {"kind": "ReplicationController", "name": "web", "subresource": "scale"},
            "minReplicas": 5,
            "maxReplicas": 2
        }
    }));
    let errs = validate(&hpa);
    assert_eq!(fields(&errs), vec!["spec.maxReplicas"]);

    let ingress = resource(json!({
        "kind": "Ingress",
        "metadata": {"name": "web", "namespace": "default"},
        "spec": {
            "rules": [{
                "host": "web.example.com",
                "http": {"paths": [{"path": "/api", "backend": {"serviceName": "api", "servicePort": "http"}}]}
            }]
        }
    }));
    assert!(validate(&ingress).is_empty());
}

#[test]
fn cluster_autoscaler_sentinels() {
    let doc = json!({
        "kind": "ClusterAutoscaler",
        "metadata": {"name": "ClusterAutoscaler", "namespace": "default"},
        "spec": {
            "minNodes": 1,
            "maxNodes": 5,
            "targetUtilization": [{"resource": "CpuRequest", "value": 0.7}]
        }
    });
    assert!(validate(&resource(doc.clone())).is_empty());

    let mut renamed = doc;
    renamed["metadata"]["name"] = json!("autoscaler");
    let errs = validate(&resource(renamed));
    assert_eq!(
        errs.errors()[0].to_string(),
        "metadata.name: Invalid value: \"autoscaler\": must be 'ClusterAutoscaler'"
    );
}

#[test]
fn invalid_error_names_object() {
    let mut doc = deployment();
    doc["spec"]["selector"] = json!({});
    let err = Validator::new().admit(&resource(doc)).unwrap_err();
    assert_eq!(err.kind, "Deployment");
    assert_eq!(err.name, "web");
    assert!(err.to_string().starts_with("Deployment \"web\" is invalid: [spec.selector: Required value"));
}

#[test]
fn selector_filters_read_paths() {
    let objects: Vec<kube_admission::deployment::Deployment> = ["web", "api", "db"]
        .iter()
        .map(|app| {
            let mut doc = deployment();
            doc["metadata"]["name"] = json!(app);
            doc["metadata"]["labels"] = json!({"app": app, "tier": "backend"});
            serde_json::from_value(doc).unwrap()
        })
        .collect();

    let everything = LabelSelector::default();
    assert_eq!(everything.filter(&objects).len(), 3);

    let web = LabelSelector::from_labels([("app", "web")]);
    let names: Vec<&str> = web
        .filter(&objects)
        .iter()
        .map(|d| d.metadata().name.as_str())
        .collect();
    assert_eq!(names, vec!["web"]);

    let backend: LabelSelector = serde_json::from_value(json!({
        "matchExpressions": [{"key": "app", "operator": "NotIn", "values": ["db"]}],
        "matchLabels": {"tier": "backend"}
    }))
    .unwrap();
    assert_eq!(backend.filter(&objects).len(), 2);
}
