//! URL normalization and content hashing shared by `argo-memory`'s dedup
//! pass and `argo-research`'s unique-URL tracking (§4.4, §4.8).

use sha2::{Digest, Sha256};

/// Tracking query parameters stripped during normalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "ref",
    "mc_cid",
    "mc_eid",
];

/// Normalize a URL for dedup comparison: lowercase the host, strip default
/// ports, drop the fragment, drop known tracking params, and collapse a
/// trailing slash. Falls back to a lowercased/trimmed copy of the input if
/// it doesn't parse as a URL at all.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return raw.trim().to_lowercase();
    };

    url.set_fragment(None);

    let default_port = match url.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if url.port() == default_port {
        let _ = url.set_port(None);
    }

    if let Some(host) = url.host_str() {
        let host = host.to_lowercase();
        let _ = url.set_host(Some(&host));
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        url.set_query(Some(&serializer.finish()));
    }

    let mut out = url.to_string().to_lowercase();
    if out.ends_with('/') && url.path() == "/" && url.query().is_none() {
        out.pop();
    }
    out
}

/// A stable content hash over the first `N=256` trimmed characters, used to
/// dedup chunks that carry no URL (§4.4).
#[must_use]
pub fn content_hash(text: &str) -> String {
    let trimmed = text.trim();
    let prefix: String = trimmed.chars().take(256).collect();
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_default_port_and_fragment() {
        let a = normalize_url("https://Example.com:443/path#section");
        assert_eq!(a, "https://example.com/path");
    }

    #[test]
    fn strips_tracking_params_keeps_real_ones() {
        let a = normalize_url("https://example.com/a?utm_source=x&id=42");
        assert_eq!(a, "https://example.com/a?id=42");
    }

    #[test]
    fn collapses_trailing_slash_on_root() {
        let a = normalize_url("https://example.com/");
        let b = normalize_url("https://example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn same_url_different_case_and_port_normalizes_equal() {
        let a = normalize_url("HTTPS://EXAMPLE.com:443/Path?utm_campaign=foo");
        let b = normalize_url("https://example.com/Path");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_ignores_trailing_whitespace() {
        let a = content_hash("hello world");
        let b = content_hash("  hello world  \n");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_only_looks_at_first_256_chars() {
        let long_a = "x".repeat(300) + "tail-a";
        let long_b = "x".repeat(300) + "tail-b";
        assert_eq!(content_hash(&long_a), content_hash(&long_b));
    }
}
