//! Batch jobs: pods that run to completion.

use serde::{Deserialize, Serialize};

use crate::common::{validate_immutable_field, validate_nonnegative_field};
use crate::daemonset::SELECTOR_MISMATCH_MSG;
use crate::field::{ErrorList, Path};
use crate::labels::{LabelSelector, selects, validate_label_selector};
use crate::meta::{
    Object, ObjectMeta, name_is_dns_subdomain, validate_object_meta, validate_object_meta_update,
};
use crate::pod::{PodTemplateSpec, RestartPolicy, validate_pod_template_spec};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSpec {
    pub parallelism: Option<i32>,
    pub completions: Option<i32>,
    pub active_deadline_seconds: Option<i64>,
    pub selector: Option<LabelSelector>,
    pub template: PodTemplateSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobStatus {
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Job {
    pub metadata: ObjectMeta,
    pub spec: JobSpec,
    pub status: JobStatus,
}

impl Object for Job {
    const KIND: &'static str = "Job";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

pub fn validate_job_spec(spec: &JobSpec, path: &Path, errs: &mut ErrorList) {
    if let Some(parallelism) = spec.parallelism {
        validate_nonnegative_field(parallelism, &path.child("parallelism"), errs);
    }
    if let Some(completions) = spec.completions {
        validate_nonnegative_field(completions, &path.child("completions"), errs);
    }
    if let Some(deadline) = spec.active_deadline_seconds {
        validate_nonnegative_field(deadline, &path.child("activeDeadlineSeconds"), errs);
    }

    let selector_path = path.child("selector");
    match &spec.selector {
        Some(selector) => validate_label_selector(selector, &selector_path, errs),
        None => errs.add_required(&selector_path, ""),
    }

    let template = path.child("template");
    if !selects(spec.selector.as_ref(), &spec.template.metadata.labels) {
        errs.add_invalid(
            &template.child("metadata").child("labels"),
            &spec.template.metadata.labels,
            SELECTOR_MISMATCH_MSG,
        );
    }
    validate_pod_template_spec(&spec.template, &template, errs);
    // A job's pods terminate; restarting them forever defeats the job.
    if !matches!(
        spec.template.spec.restart_policy,
        Some(RestartPolicy::OnFailure | RestartPolicy::Never)
    ) {
        errs.add_not_supported(
            &template.child("spec").child("restartPolicy"),
            &spec.template.spec.restart_policy,
            &[RestartPolicy::OnFailure.as_str(), RestartPolicy::Never.as_str()],
        );
    }
}

pub fn validate_job(job: &Job) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta(&job.metadata, true, name_is_dns_subdomain, &Path::new("metadata"), &mut errs);
    validate_job_spec(&job.spec, &Path::new("spec"), &mut errs);
    errs
}

/// Completions, selector and template are fixed once the job exists.
pub fn validate_job_update(new: &Job, old: &Job) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    let spec = Path::new("spec");
    validate_job_spec(&new.spec, &spec, &mut errs);
    validate_immutable_field(&new.spec.completions, &old.spec.completions, &spec.child("completions"), &mut errs);
    validate_immutable_field(&new.spec.selector, &old.spec.selector, &spec.child("selector"), &mut errs);
    validate_immutable_field(&new.spec.template, &old.spec.template, &spec.child("template"), &mut errs);
    errs
}

pub fn validate_job_status_update(new: &Job, old: &Job) -> ErrorList {
    let mut errs = ErrorList::new();
    validate_object_meta_update(&new.metadata, &old.metadata, &Path::new("metadata"), &mut errs);
    let status = Path::new("status");
    validate_nonnegative_field(new.status.active, &status.child("active"), &mut errs);
    validate_nonnegative_field(new.status.succeeded, &status.child("succeeded"), &mut errs);
    validate_nonnegative_field(new.status.failed, &status.child("failed"), &mut errs);
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ErrorType;
    use crate::pod::tests::valid_template;

    fn valid_job() -> Job {
        Job {
            metadata: ObjectMeta::named("default", "myjob"),
            spec: JobSpec {
                selector: Some(LabelSelector::from_labels([("a", "b")])),
                template: valid_template("OnFailure"),
                ..Default::default()
            },
            status: JobStatus::default(),
        }
    }

    #[test]
    fn valid() {
        assert!(validate_job(&valid_job()).is_empty());
        let mut never = valid_job();
        never.spec.template = valid_template("Never");
        never.spec.parallelism = Some(2);
        never.spec.completions = Some(0);
        assert!(validate_job(&never).is_empty());
    }

    #[test]
    fn first_error_per_case() {
        let mut cases: Vec<(&str, &str, Job)> = Vec::new();

        let mut j = valid_job();
        j.spec.parallelism = Some(-1);
        cases.push(("spec.parallelism", "must be greater than or equal to 0", j));

        let mut j = valid_job();
        j.spec.completions = Some(-1);
        cases.push(("spec.completions", "must be greater than or equal to 0", j));

        let mut j = valid_job();
        j.spec.active_deadline_seconds = Some(-1);
        cases.push(("spec.activeDeadlineSeconds", "must be greater than or equal to 0", j));

        let mut j = valid_job();
        j.spec.selector = None;
        cases.push(("spec.selector", "Required value", j));

        let mut j = valid_job();
        j.spec.template.metadata.labels = [("y".to_string(), "z".to_string())].into();
        cases.push((
            "spec.template.metadata.labels",
            "Invalid value: {\"y\":\"z\"}: `selector` does not match template `labels`",
            j,
        ));

        let mut j = valid_job();
        j.spec.template = valid_template("Always");
        cases.push(("spec.template.spec.restartPolicy", "Unsupported value", j));

        for (field, detail, job) in &cases {
            let errs = validate_job(job);
            let first = errs.first().unwrap_or_else(|| panic!("expected failure for {field}"));
            assert_eq!(first.field, *field);
            assert!(first.to_string().contains(detail), "{field}: got {first}");
        }
    }

    #[test]
    fn unsupported_restart_policy_lists_allowed() {
        let mut j = valid_job();
        j.spec.template = valid_template("Always");
        let errs = validate_job(&j);
        assert_eq!(
            errs.errors()[0].to_string(),
            "spec.template.spec.restartPolicy: Unsupported value: \"Always\": supported values: \"OnFailure\", \"Never\""
        );
    }

    fn versioned(mut job: Job) -> Job {
        job.metadata.resource_version = "1".into();
        job
    }

    #[test]
    fn update_immutable_fields() {
        let old = versioned(valid_job());

        let mut new = old.clone();
        new.spec.parallelism = Some(3);
        assert!(validate_job_update(&new, &old).is_empty());

        let mut new = old.clone();
        new.spec.completions = Some(2);
        let errs = validate_job_update(&new, &old);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.errors()[0].to_string(), "spec.completions: Forbidden: field is immutable");

        let mut new = old.clone();
        new.spec.template.spec.containers[0].image = "other".into();
        let errs = validate_job_update(&new, &old);
        assert_eq!(errs.errors()[0].field, "spec.template");
        assert_eq!(errs.errors()[0].kind, ErrorType::Forbidden);

        let mut new = old.clone();
        new.spec.selector = Some(LabelSelector::from_labels([("a", "b"), ("c", "d")]));
        new.spec.template.metadata.labels.insert("c".into(), "d".into());
        let fields: Vec<String> = validate_job_update(&new, &old).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["spec.selector", "spec.template"]);
    }

    #[test]
    fn status_update() {
        let old = versioned(valid_job());
        let mut new = old.clone();
        new.status.active = 1;
        new.status.succeeded = 2;
        assert!(validate_job_status_update(&new, &old).is_empty());
        new.status.failed = -1;
        let errs = validate_job_status_update(&new, &old);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.errors()[0].field, "status.failed");
    }
}
