//! Syntactic checks for scan targets and free-text fields.
//!
//! Nothing here resolves names: a target is accepted or rejected purely on
//! its shape.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use lazy_static::lazy_static;
use regex::Regex;

const MAX_TARGET_LEN: usize = 253;
const MAX_FREE_TEXT_LEN: usize = 1000;

pub const VALID_FORMATS: [&str; 4] = [
    "IPv4 addresses (192.168.1.1)",
    "IPv6 addresses (full form, ::1 or ::)",
    "hostnames (example.com)",
    "CIDR blocks (192.168.1.0/24)",
];

lazy_static! {
    static ref IPV4: Regex = Regex::new(
        r"^(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)$"
    )
    .unwrap();
    static ref IPV6: Regex =
        Regex::new(r"^(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$|^::1$|^::$").unwrap();
    static ref HOSTNAME: Regex = Regex::new(
        r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$"
    )
    .unwrap();
    static ref CIDR: Regex = Regex::new(
        r"^(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)/(?:3[0-2]|[1-2]\d|\d)$"
    )
    .unwrap();
    // dotted prefixes of the private ranges, whatever follows them
    static ref PRIVATE_PREFIX: Regex =
        Regex::new(r"^(?:10|127|169\.254|192\.168|172\.(?:1[6-9]|2\d|3[01]))\.").unwrap();
}

/// Accepts IPv4, a conservative IPv6 subset, hostnames and IPv4 CIDR blocks.
pub fn is_valid_target(input: &str) -> bool {
    let target = input.trim();
    if target.is_empty() || target.chars().count() > MAX_TARGET_LEN {
        return false;
    }

    IPV4.is_match(target) || IPV6.is_match(target) || is_hostname(target) || CIDR.is_match(target)
}

// A dotted run of digits is an address attempt, not a name
fn is_hostname(target: &str) -> bool {
    if !HOSTNAME.is_match(target) {
        return false;
    }
    target
        .rsplit('.')
        .next()
        .is_some_and(|tld| !tld.chars().all(|c| c.is_ascii_digit()))
}

/// Strips `< > " ' &` and caps the length. Not for targets.
pub fn sanitize_input(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .take(MAX_FREE_TEXT_LEN)
        .collect()
}

/// True when the target names a private, loopback or link-local host.
///
/// For CIDR blocks the network address decides. Numeric host forms the
/// system resolver still turns into an address (`127.1`, `0x7f000001`,
/// `10.0.0.0x1`) are judged by the address they resolve to.
pub fn is_private_network(target: &str) -> bool {
    let target = target.trim();
    if target.eq_ignore_ascii_case("localhost") {
        return true;
    }

    let host = target.split('/').next().unwrap_or(target);
    if PRIVATE_PREFIX.is_match(host) {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(addr)) => is_private_v4(addr),
        Ok(IpAddr::V6(addr)) => is_private_v6(addr),
        Err(_) => parse_loose_ipv4(host).is_some_and(is_private_v4),
    }
}

// inet_aton rules: one to four parts, each decimal, octal (leading 0) or
// hex (0x). The last part fills every byte the others leave.
fn parse_loose_ipv4(host: &str) -> Option<Ipv4Addr> {
    let parts = host
        .split('.')
        .map(parse_inet_part)
        .collect::<Option<Vec<u32>>>()?;
    let (last, leading) = parts.split_last()?;
    if parts.len() > 4 || leading.iter().any(|&part| part > 0xff) {
        return None;
    }

    let last_bits = 8 * (4 - leading.len() as u32);
    if last_bits < 32 && *last >= 1 << last_bits {
        return None;
    }

    let addr = leading
        .iter()
        .enumerate()
        .fold(*last, |addr, (i, &part)| addr | part << (24 - 8 * i as u32));
    Some(Ipv4Addr::from(addr))
}

fn parse_inet_part(part: &str) -> Option<u32> {
    if part.is_empty() || !part.is_ascii() {
        return None;
    }
    if let Some(hex) = part.strip_prefix("0x").or_else(|| part.strip_prefix("0X")) {
        if hex.is_empty() {
            return Some(0);
        }
        return u32::from_str_radix(hex, 16).ok();
    }
    if part.len() > 1 && part.starts_with('0') {
        return u32::from_str_radix(&part[1..], 8).ok();
    }
    part.parse().ok()
}

fn is_private_v4(addr: Ipv4Addr) -> bool {
    addr.is_private() || addr.is_loopback() || addr.is_link_local()
}

fn is_private_v6(addr: Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.to_ipv4_mapped().is_some_and(is_private_v4)
        || (first & 0xfe00) == 0xfc00 // unique local fc00::/7
        || (first & 0xffc0) == 0xfe80 // link local fe80::/10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_each_target_form() {
        assert!(is_valid_target("192.168.1.1"));
        assert!(is_valid_target("scanme.nmap.org"));
        assert!(is_valid_target("192.168.1.0/24"));
        assert!(is_valid_target("10.0.0.0/8"));
        assert!(is_valid_target("0.0.0.0/0"));
        assert!(is_valid_target("2001:0db8:85a3:0000:0000:8a2e:0370:7334"));
        assert!(is_valid_target("::1"));
        assert!(is_valid_target("::"));
        assert!(is_valid_target("localhost"));
        assert!(is_valid_target("my-host.example.co.uk"));
        assert!(is_valid_target("  example.com  "));
    }

    #[test]
    fn rejects_malformed_targets() {
        assert!(!is_valid_target("not a host!"));
        assert!(!is_valid_target("999.1.1.1"));
        assert!(!is_valid_target("1.2.3"));
        assert!(!is_valid_target("192.168.1.0/33"));
        assert!(!is_valid_target("-bad.example.com"));
        assert!(!is_valid_target("bad-.example.com"));
        assert!(!is_valid_target("example..com"));
        assert!(!is_valid_target("2001:db8::1"));
        assert!(!is_valid_target("example.com; rm -rf /"));
        assert!(!is_valid_target("-sV"));
    }

    #[test]
    fn length_bounds() {
        assert!(!is_valid_target(""));
        assert!(!is_valid_target("   "));

        // 254 characters made of valid labels
        let label = "a".repeat(63);
        let long = format!("{label}.{label}.{label}.{}", "b".repeat(62));
        assert_eq!(long.len(), 254);
        assert!(!is_valid_target(&long));

        let max = format!("{label}.{label}.{label}.{}", "b".repeat(61));
        assert_eq!(max.len(), 253);
        assert!(is_valid_target(&max));
    }

    #[test]
    fn label_longer_than_63_is_rejected() {
        let target = format!("{}.com", "a".repeat(64));
        assert!(!is_valid_target(&target));
    }

    #[test]
    fn sanitize_strips_markup_characters() {
        assert_eq!(sanitize_input(" <b>\"Tom\" & 'Jerry'</b> "), "bTom  Jerry/b");

        let long = "x".repeat(1500);
        assert_eq!(sanitize_input(&long).len(), 1000);
    }

    #[test]
    fn private_ranges() {
        for target in [
            "10.1.2.3",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.0/24",
            "127.0.0.1",
            "169.254.10.10",
            "::1",
            "fc00:0000:0000:0000:0000:0000:0000:0001",
            "fe80:0000:0000:0000:0202:b3ff:fe1e:8329",
            "LOCALHOST",
            "0000:0000:0000:0000:0000:ffff:7f00:0001",
        ] {
            assert!(is_private_network(target), "{target} should be private");
        }

        for target in ["8.8.8.8", "172.32.0.1", "scanme.nmap.org", "45.33.32.156/32"] {
            assert!(!is_private_network(target), "{target} should be public");
        }
    }

    #[test]
    fn numeric_host_forms_resolve_to_private_ranges() {
        // accepted as hostnames, but the resolver reads them as addresses
        for target in ["127.0.0.0x1", "0x7f000001", "10.0.0.0x1", "0xa9fe0101", "0xc0.0xa8.1.0x1"] {
            assert!(is_valid_target(target), "{target} should be a valid target");
            assert!(is_private_network(target), "{target} should be private");
        }

        assert!(is_private_network("0300.0250.1.1"));
        assert!(is_private_network("10.internal.example"));
        assert!(!is_private_network("0x08080808"));
        assert!(!is_private_network("0x7f.example.com"));
    }

    #[test]
    fn loose_ipv4_parsing() {
        assert_eq!(parse_loose_ipv4("127.1"), Some(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(parse_loose_ipv4("0x7f.1"), Some(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(parse_loose_ipv4("0x7f000001"), Some(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(parse_loose_ipv4("1.2.65535"), Some(Ipv4Addr::new(1, 2, 255, 255)));
        assert_eq!(parse_loose_ipv4("010.0.0.1"), Some(Ipv4Addr::new(8, 0, 0, 1)));
        assert_eq!(parse_loose_ipv4("1.2.65536"), None);
        assert_eq!(parse_loose_ipv4("256.1.1.1"), None);
        assert_eq!(parse_loose_ipv4("1.2.3.4.5"), None);
        assert_eq!(parse_loose_ipv4("09.1.1.1"), None);
        assert_eq!(parse_loose_ipv4("example.com"), None);
    }
}
