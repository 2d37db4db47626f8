//! Ordered pool of Piped API instances
//!
//! The registry is built once at startup: the operator's own deployment (if
//! any) first, then the public instances below. Order is retry priority and
//! never changes afterwards.

use std::fmt;
use url::Url;

/// Public Piped API instances tried after the operator's own, in this order
pub const DEFAULT_PUBLIC_INSTANCES: &[&str] = &[
    "pipedapi.kavin.rocks",
    "pipedapi.leptons.xyz",
    "pipedapi.nosebs.ru",
    "pipedapi-libre.kavin.rocks",
    "piped-api.privacy.com.de",
    "pipedapi.adminforge.de",
    "api.piped.yt",
    "pipedapi.drgns.space",
    "pipedapi.owo.si",
    "pipedapi.ducks.party",
    "piped-api.codespace.cz",
    "pipedapi.reallyaweso.me",
    "api.piped.private.coffee",
    "pipedapi.darkness.services",
    "pipedapi.orangenet.cc",
];

/// Path of the metadata endpoint, relative to an instance base
pub const STREAMS_PATH: &str = "streams";

/// A host (`pipedapi.kavin.rocks`) or a full base URL (`http://localhost:8081/api`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance(String);

impl Instance {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into().trim().trim_end_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base URL of the instance; bare hosts are reached over HTTPS
    pub fn base_url(&self) -> String {
        if self.0.starts_with("http://") || self.0.starts_with("https://") {
            self.0.clone()
        } else {
            format!("https://{}", self.0)
        }
    }

    /// `<base>/streams/<videoId>`, the id being a single encoded path segment
    pub fn streams_url(&self, video_id: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.base_url())?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(STREAMS_PATH)
            .push(video_id);
        Ok(url)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable, ordered list of instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRegistry {
    instances: Vec<Instance>,
}

impl InstanceRegistry {
    /// The operator's instance (when set and not blank) followed by the public defaults
    pub fn new(primary: Option<String>) -> Self {
        let primary = primary.filter(|p| !p.trim().is_empty());
        Self::from_instances(
            primary
                .into_iter()
                .chain(DEFAULT_PUBLIC_INSTANCES.iter().map(|s| s.to_string())),
        )
    }

    /// Registry with the public defaults only
    pub fn public() -> Self {
        Self::new(None)
    }

    /// Registry over an explicit list
    ///
    /// Blank entries are ignored and repeated entries keep their first position.
    pub fn from_instances<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<Instance> = Vec::new();
        for instance in instances.into_iter().map(Instance::new) {
            if instance.as_str().is_empty() || unique.contains(&instance) {
                continue;
            }
            unique.push(instance);
        }
        Self { instances: unique }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn hosts(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.to_string()).collect()
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::public()
    }
}

impl<'a> IntoIterator for &'a InstanceRegistry {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_registry_keeps_default_order() {
        let registry = InstanceRegistry::public();
        assert_eq!(registry.len(), DEFAULT_PUBLIC_INSTANCES.len());
        assert_eq!(registry.hosts(), DEFAULT_PUBLIC_INSTANCES.to_vec());
    }

    #[test]
    fn test_primary_is_tried_first() {
        let registry = InstanceRegistry::new(Some("https://piped.home.lan/".to_string()));
        let hosts = registry.hosts();
        assert_eq!(hosts[0], "https://piped.home.lan");
        assert_eq!(hosts[1], DEFAULT_PUBLIC_INSTANCES[0]);
        assert_eq!(registry.len(), DEFAULT_PUBLIC_INSTANCES.len() + 1);
    }

    #[test]
    fn test_blank_primary_is_ignored() {
        assert_eq!(
            InstanceRegistry::new(Some("   ".to_string())),
            InstanceRegistry::public()
        );
    }

    #[test]
    fn test_duplicates_keep_first_position() {
        let registry = InstanceRegistry::new(Some("api.piped.yt".to_string()));
        let hosts = registry.hosts();
        assert_eq!(hosts[0], "api.piped.yt");
        assert_eq!(hosts.iter().filter(|h| *h == "api.piped.yt").count(), 1);
        assert_eq!(registry.len(), DEFAULT_PUBLIC_INSTANCES.len());
    }

    #[test]
    fn test_streams_url_for_bare_host() {
        let url = Instance::new("pipedapi.kavin.rocks")
            .streams_url("dQw4w9WgXcQ")
            .unwrap();
        assert_eq!(url.as_str(), "https://pipedapi.kavin.rocks/streams/dQw4w9WgXcQ");
    }

    #[test]
    fn test_streams_url_for_full_base_url() {
        let url = Instance::new("http://localhost:8081/api/")
            .streams_url("abc")
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8081/api/streams/abc");

        let url = Instance::new("http://127.0.0.1:9000").streams_url("abc").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/streams/abc");
    }

    #[test]
    fn test_video_id_is_a_single_segment() {
        let url = Instance::new("pipedapi.example")
            .streams_url("a/b?c")
            .unwrap();
        assert_eq!(url.as_str(), "https://pipedapi.example/streams/a%2Fb%3Fc");
    }
}
