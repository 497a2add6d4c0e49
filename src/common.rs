//! Primitive checks reused across resource kinds.

use regex::Regex;

use crate::field::{ErrorList, Path};
use crate::format::{
    DNS1123_LABEL_ERROR_MSG, DNS1123_SUBDOMAIN_ERROR_MSG, PORT_NAME_ERROR_MSG,
    PORT_RANGE_ERROR_MSG, is_dns1123_label, is_dns1123_subdomain, is_ip, is_valid_percent,
    is_valid_port_name, is_valid_port_num,
};
use crate::intstr::IntOrString;

pub const FIELD_IMMUTABLE_ERROR_MSG: &str = "field is immutable";

pub fn validate_nonnegative_field(value: impl Into<i64>, path: &Path, errs: &mut ErrorList) {
    let value = value.into();
    if value < 0 {
        errs.add_invalid(path, &value, "must be greater than or equal to 0");
    }
}

pub fn validate_positive_field(value: impl Into<i64>, path: &Path, errs: &mut ErrorList) {
    let value = value.into();
    if value < 1 {
        errs.add_invalid(path, &value, "must be greater than 0");
    }
}

/// `high` must not be below `low`; the error lands on `high_path` and names the low field.
pub fn validate_ordered_pair(
    low: impl Into<i64>,
    high: impl Into<i64>,
    low_field: &str,
    high_path: &Path,
    errs: &mut ErrorList,
) {
    let high = high.into();
    if high < low.into() {
        errs.add_invalid(
            high_path,
            &high,
            format!("must be greater than or equal to `{low_field}`"),
        );
    }
}

/// A non-negative integer, or a string of the form `"N%"`.
pub fn validate_positive_int_or_percent(value: &IntOrString, path: &Path, errs: &mut ErrorList) {
    match value {
        IntOrString::String(s) => {
            if !is_valid_percent(s) {
                errs.add_invalid(path, value, "must be an integer or percentage (e.g '5%')");
            }
        }
        IntOrString::Int(i) => validate_nonnegative_field(*i, path, errs),
    }
}

pub fn is_not_more_than_100_percent(value: &IntOrString, path: &Path, errs: &mut ErrorList) {
    if let Some(percent) = value.percent()
        && percent > 100
    {
        errs.add_invalid(path, value, "must not be greater than 100%");
    }
}

/// Forbid any change between `old` and `new`.
pub fn validate_immutable_field<T: PartialEq + ?Sized>(
    new: &T,
    old: &T,
    path: &Path,
    errs: &mut ErrorList,
) {
    if new != old {
        errs.add_forbidden(path, FIELD_IMMUTABLE_ERROR_MSG);
    }
}

pub fn validate_ip(ip: &str, path: &Path, errs: &mut ErrorList) {
    if !is_ip(ip) {
        errs.add_invalid(path, ip, "must be a valid IP address");
    }
}

/// A hostname: a DNS subdomain that is not an IP literal.
pub fn validate_dns_host(host: &str, path: &Path, errs: &mut ErrorList) {
    if !is_dns1123_subdomain(host) {
        errs.add_invalid(path, host, DNS1123_SUBDOMAIN_ERROR_MSG);
    }
    if is_ip(host) {
        errs.add_invalid(path, host, "must be a DNS name, not an IP address");
    }
}

/// An absolute URL path that also compiles as a regular expression.
pub fn validate_url_path_pattern(value: &str, path: &Path, errs: &mut ErrorList) {
    if !value.starts_with('/') {
        errs.add_invalid(path, value, "must be an absolute path");
    }
    if let Err(e) = Regex::new(value) {
        errs.add_invalid(path, value, format!("must be a valid regex: {e}"));
    }
}

/// A port referenced by name (IANA service name) or by number.
pub fn validate_port_name_or_number(port: &IntOrString, path: &Path, errs: &mut ErrorList) {
    match port {
        IntOrString::String(name) => {
            if !is_dns1123_label(name) {
                errs.add_invalid(path, name, DNS1123_LABEL_ERROR_MSG);
            }
            if !is_valid_port_name(name) {
                errs.add_invalid(path, name, PORT_NAME_ERROR_MSG);
            }
        }
        IntOrString::Int(num) => {
            if !is_valid_port_num(*num) {
                errs.add_invalid(path, port, PORT_RANGE_ERROR_MSG);
            }
        }
    }
}
