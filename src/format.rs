//! Format predicates for names, keys, ports and percentages.
//!
//! All patterns are compiled once into process-wide constants and only ever read.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

pub const DNS1123_LABEL_MAX_LENGTH: usize = 63;
pub const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
pub const DNS952_LABEL_MAX_LENGTH: usize = 24;
pub const QUALIFIED_NAME_MAX_LENGTH: usize = 63;
pub const LABEL_VALUE_MAX_LENGTH: usize = 63;
pub const PORT_NAME_MAX_LENGTH: usize = 15;
pub const CONFIG_MAP_KEY_MAX_LENGTH: usize = DNS1123_SUBDOMAIN_MAX_LENGTH;

const DNS1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const DNS952_LABEL_FMT: &str = "[a-z]([-a-z0-9]*[a-z0-9])?";
const QUALIFIED_NAME_FMT: &str = "([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]";
const PORT_NAME_FMT: &str = "[a-z0-9]([a-z0-9-]*[a-z0-9])*";
const CONFIG_MAP_KEY_FMT: &str = "[-._a-zA-Z0-9]+";

pub const DNS1123_LABEL_ERROR_MSG: &str = "must be a DNS label (at most 63 characters, matching regex [a-z0-9]([-a-z0-9]*[a-z0-9])?): e.g. \"my-name\"";
pub const DNS1123_SUBDOMAIN_ERROR_MSG: &str = "must be a DNS subdomain (at most 253 characters, matching regex [a-z0-9]([-a-z0-9]*[a-z0-9])?(\\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*): e.g. \"example.com\"";
pub const DNS952_LABEL_ERROR_MSG: &str = "must be a DNS 952 label (at most 24 characters, matching regex [a-z]([-a-z0-9]*[a-z0-9])?): e.g. \"my-name\"";
pub const QUALIFIED_NAME_ERROR_MSG: &str = "must be a qualified name (at most 63 characters, matching regex ([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]) with an optional DNS subdomain prefix and '/': e.g. \"example.com/MyName\"";
pub const LABEL_VALUE_ERROR_MSG: &str = "must have at most 63 characters, matching regex (([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9])?: e.g. \"MyValue\" or \"\"";
pub const PORT_NAME_ERROR_MSG: &str = "must be an IANA_SVC_NAME (at most 15 characters, matching regex [a-z0-9]([a-z0-9-]*[a-z0-9])*, it must contain at least one letter [a-z], and hyphens cannot be adjacent to other hyphens): e.g. \"http\"";
pub const PORT_RANGE_ERROR_MSG: &str = "must be a valid port number (1-65535)";

fn anchored(fmt: &str) -> Regex {
    Regex::new(&format!("^{fmt}$")).expect("static pattern compiles")
}

static DNS1123_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| anchored(DNS1123_LABEL_FMT));
static DNS1123_SUBDOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| anchored(&format!("{DNS1123_LABEL_FMT}(\\.{DNS1123_LABEL_FMT})*")));
static DNS952_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| anchored(DNS952_LABEL_FMT));
static QUALIFIED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| anchored(QUALIFIED_NAME_FMT));
static LABEL_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| anchored(&format!("({QUALIFIED_NAME_FMT})?")));
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| anchored("[0-9]+%"));
static PORT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| anchored(PORT_NAME_FMT));
static PORT_NAME_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("[a-z]").expect("static pattern compiles"));
static CONFIG_MAP_KEY_RE: LazyLock<Regex> = LazyLock::new(|| anchored(CONFIG_MAP_KEY_FMT));

pub fn is_dns1123_label(value: &str) -> bool {
    value.len() <= DNS1123_LABEL_MAX_LENGTH && DNS1123_LABEL_RE.is_match(value)
}

pub fn is_dns1123_subdomain(value: &str) -> bool {
    value.len() <= DNS1123_SUBDOMAIN_MAX_LENGTH && DNS1123_SUBDOMAIN_RE.is_match(value)
}

pub fn is_dns952_label(value: &str) -> bool {
    value.len() <= DNS952_LABEL_MAX_LENGTH && DNS952_LABEL_RE.is_match(value)
}

/// `[prefix/]name`, where the prefix is a DNS subdomain.
pub fn is_qualified_name(value: &str) -> bool {
    let (prefix, name) = match value.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    };
    if let Some(prefix) = prefix
        && (prefix.is_empty() || !is_dns1123_subdomain(prefix))
    {
        return false;
    }
    !name.is_empty() && name.len() <= QUALIFIED_NAME_MAX_LENGTH && QUALIFIED_NAME_RE.is_match(name)
}

pub fn is_valid_label_value(value: &str) -> bool {
    value.len() <= LABEL_VALUE_MAX_LENGTH && LABEL_VALUE_RE.is_match(value)
}

/// `"<digits>%"`.
pub fn is_valid_percent(value: &str) -> bool {
    PERCENT_RE.is_match(value)
}

pub fn is_valid_port_num(port: i32) -> bool {
    (1..=65535).contains(&port)
}

/// IANA service name: named container ports and service ports.
pub fn is_valid_port_name(value: &str) -> bool {
    value.len() <= PORT_NAME_MAX_LENGTH
        && PORT_NAME_RE.is_match(value)
        && PORT_NAME_LETTER_RE.is_match(value)
        && !value.contains("--")
}

pub fn is_ip(value: &str) -> bool {
    IpAddr::from_str(value).is_ok()
}

/// Reasons `name` cannot be used as a single URL path segment.
///
/// With `prefix` the value is a generated-name prefix and only the
/// character restrictions apply.
pub fn path_segment_name_errors(name: &str, prefix: bool) -> Vec<String> {
    let mut errs = Vec::new();
    if !prefix && (name == "." || name == "..") {
        errs.push(format!("may not be '{name}'"));
    }
    for illegal in ["/", "%"] {
        if name.contains(illegal) {
            errs.push(format!("may not contain '{illegal}'"));
        }
    }
    errs
}

/// Reasons `key` cannot be a config map data key.
///
/// Keys allow upper case and underscores, unlike label keys, but may not be
/// `.`, `..` or contain `..`.
pub fn config_map_key_errors(key: &str) -> Vec<String> {
    let mut errs = Vec::new();
    if key.len() > CONFIG_MAP_KEY_MAX_LENGTH {
        errs.push(format!(
            "must be no more than {CONFIG_MAP_KEY_MAX_LENGTH} characters"
        ));
    }
    if !CONFIG_MAP_KEY_RE.is_match(key) {
        errs.push(format!(
            "must consist of alphanumeric characters, '-', '_' or '.' (regex {CONFIG_MAP_KEY_FMT})"
        ));
    }
    if key == "." {
        errs.push("must not be '.'".to_string());
    } else if key == ".." {
        errs.push("must not be '..'".to_string());
    } else if key.contains("..") {
        errs.push("must not contain '..'".to_string());
    }
    errs
}
