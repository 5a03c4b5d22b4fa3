//! Internal authority encoding for forwarded requests.
//!
//! The dispatcher cannot hand the pooled client a real host, because the
//! concrete endpoint is only chosen at dial time. Instead it sets the request
//! authority to a sentinel carrying the service identity; the connector
//! decodes it back and asks the balancer for a connection. A side effect of
//! encoding into the authority is that the client pools idle connections per
//! service identity.

use crate::registry::ServiceIdentity;

/// Suffix marking an authority as proxy-internal.
const SUFFIX: &str = ".internal";

/// Separator between name and version. `~` is an unreserved URI character,
/// so the sentinel is always a legal authority.
const SEPARATOR: char = '~';

/// Encode an identity as an authority string: `name~version.internal`.
pub fn encode(identity: &ServiceIdentity) -> String {
    format!(
        "{}{}{}{}",
        identity.name, SEPARATOR, identity.version, SUFFIX
    )
}

/// Decode a sentinel authority back into an identity.
///
/// Accepts an optional port (the client may append one). Returns `None` for
/// anything that is not a well-formed sentinel.
pub fn decode(authority: &str) -> Option<ServiceIdentity> {
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    };

    let stem = host.strip_suffix(SUFFIX)?;
    let (name, version) = stem.rsplit_once(SEPARATOR)?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some(ServiceIdentity::new(name, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let identity = ServiceIdentity::new("svc", "v1");
        assert_eq!(decode(&encode(&identity)), Some(identity));
    }

    #[test]
    fn decode_tolerates_port() {
        assert_eq!(
            decode("svc~v1.internal:80"),
            Some(ServiceIdentity::new("svc", "v1"))
        );
    }

    #[test]
    fn version_with_separator_in_name_splits_on_last() {
        // '~' in the name survives because the split is from the right.
        assert_eq!(
            decode("a~b~v2.internal"),
            Some(ServiceIdentity::new("a~b", "v2"))
        );
    }

    #[test]
    fn rejects_foreign_authorities() {
        assert_eq!(decode("example.com"), None);
        assert_eq!(decode("example.com:8080"), None);
        assert_eq!(decode("svc.internal"), None);
        assert_eq!(decode("~v1.internal"), None);
        assert_eq!(decode("svc~.internal"), None);
    }
}
