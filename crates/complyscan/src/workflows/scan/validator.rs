use std::sync::OnceLock;

use regex::Regex;

/// Rejection raised before any network work starts. Surfaced synchronously to
/// the caller of `start_scan`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainValidationError {
    #[error("domain is empty")]
    Empty,
    #[error("'{0}' is not a valid hostname")]
    InvalidHostname(String),
}

/// Advisory probe failure. The collector independently handles unreachable
/// hosts, so a positive probe is never treated as binding.
#[derive(Debug, Clone, thiserror::Error)]
#[error("domain '{domain}' did not resolve: {reason}")]
pub struct UnreachableDomain {
    pub domain: String,
    pub reason: String,
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Dotted labels of [a-z0-9-], no leading/trailing hyphen, optional port.
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+(:\d{1,5})?$")
            .expect("hostname pattern is a valid regex")
    })
}

/// Normalize a user-supplied website identifier: lower-case, strip a leading
/// `http(s)://` scheme and any path, then check the result against a
/// conservative hostname shape.
pub fn normalize_domain(raw: &str) -> Result<String, DomainValidationError> {
    let mut candidate = raw.trim().to_ascii_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(rest) = candidate.strip_prefix(scheme) {
            candidate = rest.to_string();
            break;
        }
    }

    if let Some((host, _path)) = candidate.split_once('/') {
        candidate = host.to_string();
    }

    if candidate.is_empty() {
        return Err(DomainValidationError::Empty);
    }
    if !hostname_pattern().is_match(&candidate) {
        return Err(DomainValidationError::InvalidHostname(candidate));
    }

    Ok(candidate)
}

/// DNS reachability probe. Advisory only; may be disabled under load via
/// configuration.
pub async fn probe_reachability(domain: &str) -> Result<(), UnreachableDomain> {
    let target = if domain.contains(':') {
        domain.to_string()
    } else {
        format!("{domain}:443")
    };

    match tokio::net::lookup_host(target).await {
        Ok(mut addresses) => {
            if addresses.next().is_some() {
                Ok(())
            } else {
                Err(UnreachableDomain {
                    domain: domain.to_string(),
                    reason: "lookup returned no addresses".to_string(),
                })
            }
        }
        Err(err) => Err(UnreachableDomain {
            domain: domain.to_string(),
            reason: err.to_string(),
        }),
    }
}
