//! Canonicalization of background references.
//!
//! Image search result pages often wrap the actual image in a query
//! parameter. Resolvers turn such a link into the URL that serves the image
//! bytes before it is stored as the document background.

use url::Url;

/// Query parameter used by image search links to carry the real image URL.
pub const DEFAULT_EMBEDDED_PARAM: &str = "imgurl";

/// Rewrites a background reference into a fetchable image URL.
pub trait UrlResolver: Send + Sync + std::fmt::Debug {
    /// Resolve `url` into its canonical form.
    fn resolve(&self, url: Url) -> Url;
}

/// Stores references exactly as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl UrlResolver for IdentityResolver {
    fn resolve(&self, url: Url) -> Url {
        url
    }
}

/// Extracts an image URL embedded in a query parameter.
///
/// A link qualifies when its host matches one of `hosts` (any host when the
/// list is empty) and the query carries `param` holding an absolute URL.
/// Anything else is returned unchanged.
#[derive(Debug, Clone)]
pub struct EmbeddedUrlResolver {
    param: String,
    hosts: Vec<String>,
}

impl Default for EmbeddedUrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDED_PARAM)
    }
}

impl EmbeddedUrlResolver {
    /// Resolve `param` on any host.
    #[must_use]
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            hosts: Vec::new(),
        }
    }

    /// Only rewrite links whose host equals `host` or is a subdomain of it.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into().to_ascii_lowercase());
        self
    }

    fn host_matches(&self, url: &Url) -> bool {
        if self.hosts.is_empty() {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    }
}

impl UrlResolver for EmbeddedUrlResolver {
    fn resolve(&self, url: Url) -> Url {
        if !self.host_matches(&url) {
            return url;
        }
        let embedded = url
            .query_pairs()
            .find(|(key, _)| *key == self.param)
            .and_then(|(_, value)| Url::parse(&value).ok());
        match embedded {
            Some(target) => {
                tracing::debug!("Resolved {url} to embedded {target}");
                target
            }
            None => url,
        }
    }
}
