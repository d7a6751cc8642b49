//! Address classification used by the schema layer

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IPV4_REGEX: Regex = Regex::new(
        r"^(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])(\.(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])){3}$"
    )
    .unwrap();
    static ref DOMAIN_REGEX: Regex =
        Regex::new(r"^([a-zA-Z0-9][a-zA-Z0-9-]{0,62}\.)+[a-zA-Z]{2,}$").unwrap();
}

/// Check whether `value` is a dotted-decimal IPv4 literal
///
/// Each octet must be in `0..=255` and written without leading zeros,
/// so `010.0.0.1` is rejected.
pub fn is_valid_ipv4(value: &str) -> bool {
    IPV4_REGEX.is_match(value)
}

/// Check whether `value` is a domain name
///
/// One or more labels made of ASCII letters, digits and hyphens (not
/// starting with a hyphen), each followed by a dot, then an alphabetic
/// top-level label of at least two characters.
pub fn is_valid_domain(value: &str) -> bool {
    DOMAIN_REGEX.is_match(value)
}

/// Accepts either an IPv4 literal or a domain name
pub fn is_valid_address(value: &str) -> bool {
    is_valid_ipv4(value) || is_valid_domain(value)
}
