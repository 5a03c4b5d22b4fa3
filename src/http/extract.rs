//! Service identity extraction from request paths.

use axum::http::Uri;
use thiserror::Error;

use crate::registry::ServiceIdentity;

/// Extraction failure: the path does not carry a service identity.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    #[error("invalid path: expected /<name>/<version>/...")]
    InvalidPath,
}

/// Strategy turning a request URI into a service identity plus the
/// rewritten path-and-query the backend should see.
///
/// Injected into the dispatcher so callers can substitute custom routing
/// without altering it.
pub trait IdentityExtractor: Send + Sync {
    fn extract(&self, uri: &Uri) -> Result<(ServiceIdentity, String), ExtractError>;
}

/// Default strategy: the first two non-empty path segments are the name and
/// version; the remainder (plus query) is what the backend sees.
///
/// `/svc/v1/foo?x=1` → identity `svc/v1`, rewritten `/foo?x=1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathExtractor;

impl IdentityExtractor for PathExtractor {
    fn extract(&self, uri: &Uri) -> Result<(ServiceIdentity, String), ExtractError> {
        let mut segments = uri.path().split('/').filter(|s| !s.is_empty());

        let name = segments.next().ok_or(ExtractError::InvalidPath)?;
        let version = segments.next().ok_or(ExtractError::InvalidPath)?;

        let rest = segments.collect::<Vec<_>>().join("/");
        let mut rewritten = format!("/{rest}");
        if let Some(query) = uri.query() {
            rewritten.push('?');
            rewritten.push_str(query);
        }

        Ok((ServiceIdentity::new(name, version), rewritten))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(uri: &str) -> Result<(ServiceIdentity, String), ExtractError> {
        PathExtractor.extract(&uri.parse().unwrap())
    }

    #[test]
    fn extracts_name_version_and_rewrites() {
        let (identity, rewritten) = extract("/svc1/v2/foo/bar").unwrap();
        assert_eq!(identity, ServiceIdentity::new("svc1", "v2"));
        assert_eq!(rewritten, "/foo/bar");
    }

    #[test]
    fn bare_identity_rewrites_to_root() {
        let (identity, rewritten) = extract("/svc/v1").unwrap();
        assert_eq!(identity, ServiceIdentity::new("svc", "v1"));
        assert_eq!(rewritten, "/");
    }

    #[test]
    fn query_is_preserved() {
        let (_, rewritten) = extract("/svc/v1/search?q=abc&page=2").unwrap();
        assert_eq!(rewritten, "/search?q=abc&page=2");
    }

    #[test]
    fn single_segment_fails() {
        assert_eq!(extract("/svc1"), Err(ExtractError::InvalidPath));
    }

    #[test]
    fn root_fails() {
        assert_eq!(extract("/"), Err(ExtractError::InvalidPath));
    }

    #[test]
    fn empty_segments_are_ignored() {
        let (identity, rewritten) = extract("//svc//v1//foo").unwrap();
        assert_eq!(identity, ServiceIdentity::new("svc", "v1"));
        assert_eq!(rewritten, "/foo");
    }
}
