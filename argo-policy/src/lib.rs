#![deny(missing_docs)]
//! Tool proposal validation and normalization (§4.5 of the spec).
//!
//! Each tool has a validator; `ToolPolicy::classify` splits a batch of
//! `ToolProposal`s into `approved` and `rejected` (with the reason each
//! rejected proposal carries back to the model as a system message in the
//! next iteration — the orchestrator's job, not this crate's).

use std::collections::BTreeSet;
use std::net::IpAddr;

use argo_types::{Namespace, PolicyError, ToolProposal};

/// Query length bounds for `web_search.query` (§4.5).
pub const WEB_SEARCH_QUERY_LEN: std::ops::RangeInclusive<usize> = 2..=100;
/// `max_results` clamp bounds for `web_search` (§4.5).
pub const WEB_SEARCH_MAX_RESULTS: std::ops::RangeInclusive<u32> = 1..=10;
/// Query length bounds for `memory_query.query` (§4.5).
pub const MEMORY_QUERY_LEN: std::ops::RangeInclusive<usize> = 1..=500;
/// Content length bound for `memory_write.content` (§4.5).
pub const MEMORY_WRITE_MAX_LEN: usize = 20_000;
/// Query length bound for `retrieve_context.query` (§4.5).
pub const RETRIEVE_CONTEXT_MAX_LEN: usize = 500;

fn host_is_blacklisted(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => {
                v4.is_loopback()
                    || v4.is_private()
                    || v4.is_link_local()
                    || v4.is_unspecified()
                    || v4.is_broadcast()
            }
            IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
        };
    }
    false
}

/// Validate a `web_access` proposal's `url` parameter: scheme must be
/// `http`/`https`, and the host must not resolve to a local/private range.
pub fn validate_web_access(proposal: &ToolProposal) -> Result<(), PolicyError> {
    let raw = proposal
        .params
        .get("url")
        .ok_or_else(|| PolicyError::MissingParameter("url".to_string()))?;
    let url = url::Url::parse(raw)
        .map_err(|_| PolicyError::DisallowedScheme(format!("unparseable url: {raw}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PolicyError::DisallowedScheme(url.scheme().to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| PolicyError::DisallowedHost("no host".to_string()))?;
    if host_is_blacklisted(host) {
        return Err(PolicyError::DisallowedHost(host.to_string()));
    }
    Ok(())
}

/// Validate a `web_search` proposal: `query` length in `[2,100]`,
/// `max_results` (if present) parses and clamps into `[1,10]`.
pub fn validate_web_search(proposal: &ToolProposal) -> Result<(), PolicyError> {
    let query = proposal
        .params
        .get("query")
        .ok_or_else(|| PolicyError::MissingParameter("query".to_string()))?;
    if !WEB_SEARCH_QUERY_LEN.contains(&query.chars().count()) {
        return Err(PolicyError::OutOfRange(format!(
            "query length {} not in {:?}",
            query.chars().count(),
            WEB_SEARCH_QUERY_LEN
        )));
    }
    if let Some(raw) = proposal.params.get("max_results") {
        let parsed: u32 = raw
            .parse()
            .map_err(|_| PolicyError::OutOfRange(format!("max_results not a number: {raw}")))?;
        if !WEB_SEARCH_MAX_RESULTS.contains(&parsed) {
            return Err(PolicyError::OutOfRange(format!(
                "max_results {parsed} not in {:?}",
                WEB_SEARCH_MAX_RESULTS
            )));
        }
    }
    Ok(())
}

/// Clamp a parsed `max_results` into policy bounds, used by the executor
/// after validation to normalize the effective value sent to the tool.
#[must_use]
pub fn clamp_max_results(raw: Option<&str>) -> u32 {
    let parsed: u32 = raw.and_then(|s| s.parse().ok()).unwrap_or(5);
    parsed.clamp(*WEB_SEARCH_MAX_RESULTS.start(), *WEB_SEARCH_MAX_RESULTS.end())
}

/// Validate a `memory_query` proposal: `query` length in `[1,500]`, optional
/// `namespace` must be a known namespace.
pub fn validate_memory_query(proposal: &ToolProposal) -> Result<(), PolicyError> {
    let query = proposal
        .params
        .get("query")
        .ok_or_else(|| PolicyError::MissingParameter("query".to_string()))?;
    if !MEMORY_QUERY_LEN.contains(&query.chars().count()) {
        return Err(PolicyError::OutOfRange(format!(
            "query length {} not in {:?}",
            query.chars().count(),
            MEMORY_QUERY_LEN
        )));
    }
    validate_namespace_param(proposal, "namespace")
}

/// Validate a `memory_write` proposal: `content` length bounded, optional
/// `namespace`/`source_type`-ish hints must be known if present.
pub fn validate_memory_write(proposal: &ToolProposal) -> Result<(), PolicyError> {
    let content = proposal
        .params
        .get("content")
        .ok_or_else(|| PolicyError::MissingParameter("content".to_string()))?;
    if content.is_empty() || content.chars().count() > MEMORY_WRITE_MAX_LEN {
        return Err(PolicyError::OutOfRange(format!(
            "content length {} exceeds {MEMORY_WRITE_MAX_LEN}",
            content.chars().count()
        )));
    }
    if let Some(raw) = proposal.params.get("ephemeral") {
        if raw != "true" && raw != "false" {
            return Err(PolicyError::OutOfRange(format!(
                "ephemeral must be \"true\"/\"false\", got {raw}"
            )));
        }
    }
    Ok(())
}

/// Validate a `retrieve_context` proposal: `query` bounded, optional
/// `namespace` must be known.
pub fn validate_retrieve_context(proposal: &ToolProposal) -> Result<(), PolicyError> {
    let query = proposal
        .params
        .get("query")
        .ok_or_else(|| PolicyError::MissingParameter("query".to_string()))?;
    if query.is_empty() || query.chars().count() > RETRIEVE_CONTEXT_MAX_LEN {
        return Err(PolicyError::OutOfRange(format!(
            "query length {} exceeds {RETRIEVE_CONTEXT_MAX_LEN}",
            query.chars().count()
        )));
    }
    validate_namespace_param(proposal, "namespace")
}

fn validate_namespace_param(proposal: &ToolProposal, key: &str) -> Result<(), PolicyError> {
    match proposal.params.get(key) {
        Some(raw) if Namespace::parse(raw).is_none() => {
            Err(PolicyError::UnknownNamespace(raw.clone()))
        }
        _ => Ok(()),
    }
}

/// Validate one proposal, dispatching on `tool_name`. A tool not in the
/// known set (i.e. not one of §4.3's five built-ins or a registered
/// extension) is neither approved nor rejected here — `classify`'s caller
/// (the orchestrator) is responsible for filtering to the current
/// manifest before policy runs, per §4.1 S4.
pub fn validate(proposal: &ToolProposal) -> Result<(), PolicyError> {
    match proposal.tool_name.as_str() {
        "web_access" => validate_web_access(proposal),
        "web_search" => validate_web_search(proposal),
        "memory_query" => validate_memory_query(proposal),
        "memory_write" => validate_memory_write(proposal),
        "retrieve_context" => validate_retrieve_context(proposal),
        other => Err(PolicyError::ToolNotPermitted(other.to_string())),
    }
}

/// A proposal rejected by policy, paired with the reason to surface back to
/// the model (§4.5).
#[derive(Debug, Clone)]
pub struct Rejection {
    /// The rejected proposal.
    pub proposal: ToolProposal,
    /// Why it was rejected.
    pub reason: PolicyError,
}

/// Validates a batch of proposals against the tools permitted in the
/// current manifest, splitting into approved and rejected (§4.5).
pub struct ToolPolicy {
    permitted: BTreeSet<String>,
}

impl ToolPolicy {
    /// Construct a policy scoped to the tool names currently in the
    /// manifest (§4.1 S4: proposals for tools outside the manifest are
    /// rejected as not permitted in this phase).
    #[must_use]
    pub fn new(permitted_tools: &[&str]) -> Self {
        Self {
            permitted: permitted_tools.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Classify every proposal as approved or rejected.
    #[must_use]
    pub fn classify(&self, proposals: Vec<ToolProposal>) -> (Vec<ToolProposal>, Vec<Rejection>) {
        let mut approved = Vec::new();
        let mut rejected = Vec::new();
        for proposal in proposals {
            if !self.permitted.contains(&proposal.tool_name) {
                tracing::debug!(tool = %proposal.tool_name, "policy: tool not in current manifest");
                rejected.push(Rejection {
                    reason: PolicyError::ToolNotPermitted(proposal.tool_name.clone()),
                    proposal,
                });
                continue;
            }
            match validate(&proposal) {
                Ok(()) => approved.push(proposal),
                Err(reason) => {
                    tracing::debug!(tool = %proposal.tool_name, %reason, "policy: rejected");
                    rejected.push(Rejection { proposal, reason });
                }
            }
        }
        (approved, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn proposal(tool: &str, params: &[(&str, &str)]) -> ToolProposal {
        ToolProposal {
            tool_name: tool.to_string(),
            params: params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn file_scheme_rejected() {
        let p = proposal("web_access", &[("url", "file:///etc/passwd")]);
        assert!(matches!(
            validate_web_access(&p),
            Err(PolicyError::DisallowedScheme(_))
        ));
    }

    #[test]
    fn javascript_scheme_rejected() {
        let p = proposal("web_access", &[("url", "javascript:alert(1)")]);
        assert!(validate_web_access(&p).is_err());
    }

    #[test]
    fn localhost_and_private_ip_rejected() {
        for url in [
            "http://localhost/",
            "http://127.0.0.1/",
            "http://192.168.1.1/",
            "http://10.0.0.5/",
            "http://169.254.1.1/",
        ] {
            let p = proposal("web_access", &[("url", url)]);
            assert!(validate_web_access(&p).is_err(), "{url} should be rejected");
        }
    }

    #[test]
    fn https_public_host_approved() {
        let p = proposal("web_access", &[("url", "https://example.com/article")]);
        assert!(validate_web_access(&p).is_ok());
    }

    #[test]
    fn web_search_query_too_short_rejected() {
        let p = proposal("web_search", &[("query", "a")]);
        assert!(validate_web_search(&p).is_err());
    }

    #[test]
    fn web_search_max_results_out_of_range_rejected() {
        let p = proposal("web_search", &[("query", "rust lang"), ("max_results", "50")]);
        assert!(validate_web_search(&p).is_err());
    }

    #[test]
    fn memory_query_unknown_namespace_rejected() {
        let p = proposal("memory_query", &[("query", "hi"), ("namespace", "bogus")]);
        assert!(matches!(
            validate_memory_query(&p),
            Err(PolicyError::UnknownNamespace(_))
        ));
    }

    #[test]
    fn memory_query_known_namespace_ok() {
        let p = proposal("memory_query", &[("query", "hi"), ("namespace", "web_cache")]);
        assert!(validate_memory_query(&p).is_ok());
    }

    #[test]
    fn memory_write_empty_content_rejected() {
        let p = proposal("memory_write", &[("content", "")]);
        assert!(validate_memory_write(&p).is_err());
    }

    #[test]
    fn classify_splits_approved_and_rejected() {
        let policy = ToolPolicy::new(&["web_access", "web_search"]);
        let proposals = vec![
            proposal("web_access", &[("url", "https://example.com")]),
            proposal("web_access", &[("url", "file:///etc/passwd")]),
            proposal("memory_write", &[("content", "x")]),
        ];
        let (approved, rejected) = policy.classify(proposals);
        assert_eq!(approved.len(), 1);
        assert_eq!(rejected.len(), 2);
        assert!(rejected
            .iter()
            .any(|r| matches!(r.reason, PolicyError::ToolNotPermitted(_))));
    }

    #[test]
    fn clamp_max_results_clamps_high_and_low() {
        assert_eq!(clamp_max_results(Some("50")), 10);
        assert_eq!(clamp_max_results(Some("0")), 1);
        assert_eq!(clamp_max_results(None), 5);
    }
}
