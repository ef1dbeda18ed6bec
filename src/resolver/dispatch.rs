//! Strategy dispatch: which host profile handles a reference

use crate::config::{HostProfile, StrategyKind};
use crate::model::SourceReference;
use crate::url::{host_contains_any, matches_wildcard};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Name of the built-in profile used when nothing else matches
pub const FALLBACK_HOST: &str = "best-effort";

/// A host profile with its pattern compiled
#[derive(Debug, Clone)]
struct CompiledHost {
    profile: HostProfile,
    pattern: Option<Regex>,
}

impl CompiledHost {
    fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        let path = url.path();

        self.profile
            .domains
            .iter()
            .any(|domain| matches_wildcard(&domain.to_lowercase(), &host))
            || host_contains_any(&host, &self.profile.fragments)
            || self
                .profile
                .path_markers
                .iter()
                .any(|marker| !marker.is_empty() && path.contains(marker.as_str()))
            || self
                .pattern
                .as_ref()
                .map(|re| re.is_match(url.as_str()))
                .unwrap_or(false)
    }
}

/// Ordered host matchers; the first match wins
#[derive(Debug, Clone)]
pub struct Dispatcher {
    hosts: Vec<CompiledHost>,
    fallback: HostProfile,
}

impl Dispatcher {
    pub fn new(profiles: &[HostProfile]) -> Result<Self, ConfigError> {
        let hosts = profiles
            .iter()
            .map(|profile| {
                let pattern = profile
                    .pattern
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| {
                        ConfigError::InvalidPattern(format!("host '{}': {}", profile.name, e))
                    })?;
                Ok(CompiledHost {
                    profile: profile.clone(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let mut fallback = HostProfile::new(FALLBACK_HOST, StrategyKind::BestEffort);
        fallback.allows_streaming = true;

        Ok(Self { hosts, fallback })
    }

    /// Picks the profile for a reference
    ///
    /// A host hint naming a configured profile bypasses matching. References
    /// nothing matches go to the best-effort profile.
    pub fn dispatch(&self, reference: &SourceReference) -> &HostProfile {
        if let Some(hint) = reference.host_hint.as_deref() {
            match self.hosts.iter().find(|h| h.profile.name == hint) {
                Some(host) => return &host.profile,
                None => tracing::warn!(hint, "unknown host hint, matching by URL"),
            }
        }

        match self.find(&reference.url) {
            Some(profile) => profile,
            None => {
                tracing::debug!(url = %reference.url, "no host matched, using best-effort");
                &self.fallback
            }
        }
    }

    /// Returns the first configured profile matching the URL
    pub fn find(&self, url: &str) -> Option<&HostProfile> {
        let parsed = Url::parse(url).ok()?;
        self.hosts
            .iter()
            .find(|host| host.matches(&parsed))
            .map(|host| &host.profile)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
