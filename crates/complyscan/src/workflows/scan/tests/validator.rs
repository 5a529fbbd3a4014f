use crate::workflows::scan::validator::{normalize_domain, DomainValidationError};

#[test]
fn strips_scheme_path_and_case() {
    assert_eq!(
        normalize_domain("HTTPS://Example.COM/").expect("valid"),
        "example.com"
    );
    assert_eq!(
        normalize_domain("http://foo.bar/privacy?lang=en").expect("valid"),
        "foo.bar"
    );
    assert_eq!(
        normalize_domain("  acme-analytics.example  ").expect("valid"),
        "acme-analytics.example"
    );
}

#[test]
fn keeps_an_explicit_port() {
    assert_eq!(
        normalize_domain("staging.example.com:8443").expect("valid"),
        "staging.example.com:8443"
    );
}

#[test]
fn rejects_empty_input() {
    assert_eq!(normalize_domain("   "), Err(DomainValidationError::Empty));
    assert_eq!(
        normalize_domain("https://"),
        Err(DomainValidationError::Empty)
    );
}

#[test]
fn rejects_malformed_hostnames() {
    for raw in ["not a domain", "nodots", "-bad.example", "bad-.example", "exa_mple.com"] {
        assert!(
            matches!(
                normalize_domain(raw),
                Err(DomainValidationError::InvalidHostname(_))
            ),
            "{raw} should be rejected"
        );
    }
}
