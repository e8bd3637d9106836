//! Lexical recognizers for the `format` keyword.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Longest accepted email address or hostname, in bytes.
const MAX_NAME_LENGTH: usize = 255;

static DATE_TIME_REGEX: OnceLock<Regex> = OnceLock::new();
static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static HOSTNAME_REGEX: OnceLock<Regex> = OnceLock::new();
static URI_REGEX: OnceLock<Regex> = OnceLock::new();
static IP_FUTURE_REGEX: OnceLock<Regex> = OnceLock::new();

const HOSTNAME_LABEL: &str = r"[A-Za-z0-9][A-Za-z0-9\-]{0,62}";

fn date_time_regex() -> &'static Regex {
    DATE_TIME_REGEX.get_or_init(|| {
        Regex::new(
            r"^([0-9]{4})-([0-9]{2})-([0-9]{2})T([0-9]{2}):[0-5][0-9]:[0-5][0-9](?:\.[0-9]+)?(?:Z|[+\-]([0-9]{2}):[0-5][0-9])$",
        )
        .expect("Failed to compile date-time regex")
    })
}

fn email_regex() -> &'static Regex {
    EMAIL_REGEX.get_or_init(|| {
        let local = r"[A-Za-z0-9!#$%&'*+\-/=?^_`{|}~]+";
        Regex::new(&format!(
            r"^{local}(?:\.{local})*@{label}(?:\.{label})*$",
            local = local,
            label = HOSTNAME_LABEL
        ))
        .expect("Failed to compile email regex")
    })
}

fn hostname_regex() -> &'static Regex {
    HOSTNAME_REGEX.get_or_init(|| {
        Regex::new(&format!(
            r"^{label}(?:\.{label})*$",
            label = HOSTNAME_LABEL
        ))
        .expect("Failed to compile hostname regex")
    })
}

/// RFC 3986 `URI`. An IP literal host is captured and checked separately.
fn uri_regex() -> &'static Regex {
    URI_REGEX.get_or_init(|| {
        let unreserved = r"A-Za-z0-9\-._~";
        let sub_delims = r"!$&'()*+,;=";
        let pct = r"%[0-9A-Fa-f]{2}";
        let userinfo = format!(r"(?:[{unreserved}{sub_delims}:]|{pct})*");
        let reg_name = format!(r"(?:[{unreserved}{sub_delims}]|{pct})*");
        let host = format!(r"(?:\[(?P<literal>[^\]/]*)\]|{reg_name})");
        let authority = format!(r"(?:{userinfo}@)?{host}(?::[0-9]*)?");
        let segment = format!(r"(?:[{unreserved}{sub_delims}:@]|{pct})*");
        let segment_nz = format!(r"(?:[{unreserved}{sub_delims}:@]|{pct})+");
        let hier_part = format!(
            r"(?://{authority}(?:/{segment})*|/(?:{segment_nz}(?:/{segment})*)?|{segment_nz}(?:/{segment})*|)"
        );
        let query = format!(r"(?:[{unreserved}{sub_delims}:@/?]|{pct})*");
        Regex::new(&format!(
            r"^[A-Za-z][A-Za-z0-9+\-.]*:{hier_part}(?:\?{query})?(?:#{query})?$"
        ))
        .expect("Failed to compile URI regex")
    })
}

fn ip_future_regex() -> &'static Regex {
    IP_FUTURE_REGEX.get_or_init(|| {
        Regex::new(r"^v[0-9A-Fa-f]+\.[A-Za-z0-9\-._~!$&'()*+,;=:]+$")
            .expect("Failed to compile IPvFuture regex")
    })
}

/// A recognized `format` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    DateTime,
    Email,
    Hostname,
    Ipv4,
    Ipv6,
    Uri,
}

impl Format {
    /// Map a `format` keyword value to a recognizer; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "date-time" => Some(Format::DateTime),
            "email" => Some(Format::Email),
            "hostname" => Some(Format::Hostname),
            "ipv4" => Some(Format::Ipv4),
            "ipv6" => Some(Format::Ipv6),
            "uri" => Some(Format::Uri),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::DateTime => "date-time",
            Format::Email => "email",
            Format::Hostname => "hostname",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Uri => "uri",
        }
    }

    pub fn is_valid(&self, text: &str) -> bool {
        match self {
            Format::DateTime => is_date_time(text),
            Format::Email => text.len() <= MAX_NAME_LENGTH && email_regex().is_match(text),
            Format::Hostname => text.len() <= MAX_NAME_LENGTH && hostname_regex().is_match(text),
            Format::Ipv4 => text.parse::<Ipv4Addr>().is_ok(),
            Format::Ipv6 => text.parse::<Ipv6Addr>().is_ok(),
            Format::Uri => is_uri(text),
        }
    }
}

/// Length in Unicode code points, the unit of `maxLength`/`minLength`.
pub fn unicode_len(text: &str) -> usize {
    text.chars().count()
}

fn is_date_time(text: &str) -> bool {
    let Some(captures) = date_time_regex().captures(text) else {
        return false;
    };
    let field = |index: usize| -> Option<u32> { captures.get(index)?.as_str().parse().ok() };

    let (Some(year), Some(month), Some(day), Some(hour)) = (field(1), field(2), field(3), field(4))
    else {
        return false;
    };
    if NaiveDate::from_ymd_opt(year as i32, month, day).is_none() || hour >= 24 {
        return false;
    }
    // the offset hour is absent for "Z"
    field(5).is_none_or(|offset_hour| offset_hour < 24)
}

fn is_uri(text: &str) -> bool {
    let Some(captures) = uri_regex().captures(text) else {
        return false;
    };
    match captures.name("literal") {
        Some(literal) => {
            let literal = literal.as_str();
            literal.parse::<Ipv6Addr>().is_ok() || ip_future_regex().is_match(literal)
        }
        None => true,
    }
}
