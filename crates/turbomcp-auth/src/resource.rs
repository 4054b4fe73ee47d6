//! RFC 8707 resource-indicator canonicalization.
//!
//! Binds access tokens to a specific resource server: the `resource`
//! parameter (and the `aud` claim it becomes) must identify this server's
//! canonical URI, not merely "some URI at this host".

use turbomcp_core::{Error, Result};
use url::Url;

/// Validate and canonicalize a resource URI per RFC 8707 §2: absolute,
/// `http`/`https` only (plain `http` restricted to loopback hosts), no
/// fragment, lowercase scheme/host, default port and query stripped.
pub fn canonicalize_resource_uri(uri: &str) -> Result<String> {
    let url = Url::parse(uri).map_err(|e| Error::invalid_params(format!("invalid resource URI: {e}")))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let is_loopback = matches!(
                url.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0") | Some("[::1]")
            );
            if !is_loopback {
                return Err(Error::invalid_params(
                    "resource URI must use https (http only allowed for loopback hosts)",
                ));
            }
        }
        other => {
            return Err(Error::invalid_params(format!(
                "resource URI must use http or https, got {other}"
            )))
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| Error::invalid_params("resource URI must have a host"))?
        .to_lowercase();

    if url.fragment().is_some() {
        return Err(Error::invalid_params("resource URI must not contain a fragment"));
    }

    let scheme = url.scheme().to_lowercase();
    let port = match url.port() {
        Some(p) if (scheme == "https" && p == 443) || (scheme == "http" && p == 80) => String::new(),
        Some(p) => format!(":{p}"),
        None => String::new(),
    };
    let path = url.path();
    let path = if path == "/" { path } else { path.trim_end_matches('/') };

    Ok(format!("{scheme}://{host}{port}{path}"))
}

/// Constant-time audience comparison: the `aud` claim must equal this
/// server's canonical resource identifier exactly.
pub fn audience_matches(token_aud: &str, resource: &str) -> bool {
    use subtle::ConstantTimeEq;
    token_aud.as_bytes().ct_eq(resource.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_scheme_and_host_case() {
        assert_eq!(
            canonicalize_resource_uri("HTTPS://API.EXAMPLE.COM/mcp").unwrap(),
            "https://api.example.com/mcp"
        );
    }

    #[test]
    fn strips_default_port_and_trailing_slash() {
        assert_eq!(
            canonicalize_resource_uri("https://example.com:443/mcp/").unwrap(),
            "https://example.com/mcp"
        );
    }

    #[test]
    fn keeps_non_default_port() {
        assert_eq!(
            canonicalize_resource_uri("https://example.com:8443/mcp").unwrap(),
            "https://example.com:8443/mcp"
        );
    }

    #[test]
    fn strips_query_and_rejects_fragment() {
        assert_eq!(
            canonicalize_resource_uri("https://example.com/mcp?x=1").unwrap(),
            "https://example.com/mcp"
        );
        assert!(canonicalize_resource_uri("https://example.com/mcp#frag").is_err());
    }

    #[test]
    fn rejects_non_loopback_http() {
        assert!(canonicalize_resource_uri("http://example.com/mcp").is_err());
        assert!(canonicalize_resource_uri("http://localhost/mcp").is_ok());
    }

    #[test]
    fn audience_comparison_is_exact() {
        assert!(audience_matches("https://example.com/mcp", "https://example.com/mcp"));
        assert!(!audience_matches("https://evil.com/mcp", "https://example.com/mcp"));
    }
}
