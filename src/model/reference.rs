use serde::{Deserialize, Serialize};

/// A media page reference handed in by a caller
///
/// References are immutable. Delegation creates a new reference for the
/// embedded target rather than mutating the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    /// Page URL on the hosting site
    pub url: String,

    /// Referer to send when fetching the page
    pub referer: Option<String>,

    /// Name of a configured host to use, bypassing pattern dispatch
    pub host_hint: Option<String>,
}

impl SourceReference {
    /// Creates a reference with no referer and no host hint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referer: None,
            host_hint: None,
        }
    }

    /// Sets the referer
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Sets the host hint
    pub fn with_host_hint(mut self, host: impl Into<String>) -> Self {
        self.host_hint = Some(host.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let reference = SourceReference::new("https://host.example/f/abc")
            .with_referer("https://catalog.example/")
            .with_host_hint("gdlink");

        assert_eq!(reference.url, "https://host.example/f/abc");
        assert_eq!(reference.referer.as_deref(), Some("https://catalog.example/"));
        assert_eq!(reference.host_hint.as_deref(), Some("gdlink"));
    }
}
