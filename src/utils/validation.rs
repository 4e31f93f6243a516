//! Input validation utilities
//!
//! Checks applied to values clients send before they are used.

use crate::protocol::MAX_TOKEN_LEN;

/// A host token must be a bare hostname or IPv4 literal: ASCII letters,
/// digits, '.', '-' and '_' only.
pub fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= MAX_TOKEN_LEN
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Printable form of a client token for log lines.
pub fn sanitize_for_log(input: &str) -> String {
    input.chars().flat_map(char::escape_default).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hostnames_and_ipv4_literals() {
        assert!(is_valid_host("127.0.0.1"));
        assert!(is_valid_host("flip2.engr.example.edu"));
        assert!(is_valid_host("my_host-01"));
    }

    #[test]
    fn rejects_separators_and_control_characters() {
        assert!(!is_valid_host(""));
        assert!(!is_valid_host("host name"));
        assert!(!is_valid_host("host\n"));
        assert!(!is_valid_host("10.0.0.1:80"));
        assert!(!is_valid_host(&"h".repeat(MAX_TOKEN_LEN + 1)));
    }

    #[test]
    fn escapes_control_characters_for_logs() {
        assert_eq!(sanitize_for_log("a\nb"), "a\\nb");
    }
}
