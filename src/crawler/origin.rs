use url::Url;

use crate::error::CrawlError;

/// The scheme, host and port a crawl is confined to, plus the URL it starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    base: Url,
}

impl Origin {
    /// Accepts absolute `http`/`https` URLs that carry a host.
    pub fn parse(base_url: &str) -> Result<Self, CrawlError> {
        let invalid = |reason: &str| CrawlError::InvalidOrigin {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        let mut base = Url::parse(base_url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        base.set_fragment(None);

        Ok(Self { base })
    }

    /// Canonical form of the base URL; the first frontier entry of every job.
    pub fn seed(&self) -> String {
        self.base.to_string()
    }

    pub fn scheme(&self) -> &str {
        self.base.scheme()
    }

    pub fn host(&self) -> Option<&str> {
        self.base.host_str()
    }

    pub fn port(&self) -> Option<u16> {
        self.base.port_or_known_default()
    }

    /// Resolves `raw` against the base and returns the canonical URL string,
    /// or `None` when the link is unusable or leaves the origin.
    pub fn canonicalize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if is_ignored_href(raw) {
            return None;
        }

        let mut url = self.base.join(raw).ok()?;
        if !self.contains(&url) {
            return None;
        }
        url.set_fragment(None);
        if !url.path().starts_with('/') {
            let path = format!("/{}", url.path());
            url.set_path(&path);
        }

        Some(url.to_string())
    }

    /// Same scheme, host and effective port as the base.
    pub fn contains(&self, url: &Url) -> bool {
        url.scheme() == self.base.scheme()
            && url.host_str() == self.base.host_str()
            && url.port_or_known_default() == self.base.port_or_known_default()
    }
}

/// Links that are never worth resolving
pub(crate) fn is_ignored_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Origin {
        Origin::parse("https://docs.example.com").unwrap()
    }

    #[test]
    fn test_seed_gets_root_path() {
        assert_eq!(origin().seed(), "https://docs.example.com/");
    }

    #[test]
    fn test_rejects_non_http_origin() {
        assert!(matches!(
            Origin::parse("ftp://docs.example.com"),
            Err(CrawlError::InvalidOrigin { .. })
        ));
        assert!(Origin::parse("not a url").is_err());
    }

    #[test]
    fn test_default_port_is_same_origin() {
        let origin = origin();
        assert_eq!(
            origin.canonicalize("https://docs.example.com:443/a"),
            Some("https://docs.example.com/a".to_string())
        );
        assert_eq!(origin.canonicalize("https://docs.example.com:8443/a"), None);
        assert_eq!(origin.canonicalize("http://docs.example.com/a"), None);
    }

    #[test]
    fn test_host_comparison_ignores_case() {
        assert_eq!(
            origin().canonicalize("https://DOCS.example.com/Guide"),
            Some("https://docs.example.com/Guide".to_string())
        );
    }

    #[test]
    fn test_protocol_relative_link_to_other_host() {
        assert_eq!(origin().canonicalize("//cdn.example.com/lib.js"), None);
    }
}
