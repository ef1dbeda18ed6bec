//! Redirect chain walker
//!
//! Follows a gateway's redirects one hop at a time, with redirect following
//! disabled in the fetcher, until a terminal URL shows up. Each hop is checked
//! for a target smuggled in a query parameter, which ends the walk without
//! touching the gateway again.

use crate::config::RedirectSpec;
use crate::fetch::{FetchRequest, Fetcher};
use crate::resolver::context::ResolutionContext;
use crate::url::{embedded_target, has_media_extension, host_contains_any, resolve_location};
use crate::{ResolveError, Result};
use std::collections::BTreeMap;
use url::Url;

/// Why a walk ended without a terminal URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// The hop budget ran out
    HopsExhausted { url: String, hops: u32 },
    /// A URL came around again
    Loop { url: String },
}

impl From<Unresolved> for ResolveError {
    fn from(reason: Unresolved) -> Self {
        match reason {
            Unresolved::HopsExhausted { url, hops } => Self::ExhaustedRedirects { url, hops },
            Unresolved::Loop { url } => Self::RedirectLoop { url },
        }
    }
}

/// Result of walking a redirect chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Resolved(String),
    Unresolved(Unresolved),
}

impl RedirectOutcome {
    /// Converts to a `Result`, turning an unresolved walk into its error
    pub fn into_result(self) -> Result<String> {
        match self {
            Self::Resolved(url) => Ok(url),
            Self::Unresolved(reason) => Err(reason.into()),
        }
    }
}

/// Request details applied to every hop
#[derive(Debug, Clone, Default)]
pub struct HopRequest<'a> {
    pub referer: Option<&'a str>,
    pub headers: Option<&'a BTreeMap<String, String>>,
}

/// Walks redirects from `start` until a terminal URL or the budget runs out
///
/// Network failures are returned as errors. Running out of hops or hitting a
/// loop is an [`RedirectOutcome::Unresolved`] outcome, which only ends this
/// branch.
pub async fn follow(
    fetcher: &dyn Fetcher,
    start: &str,
    rules: &RedirectSpec,
    hop: &HopRequest<'_>,
    ctx: &mut ResolutionContext,
) -> Result<RedirectOutcome> {
    let mut current = start.to_string();

    loop {
        if !ctx.visit(&current) {
            tracing::debug!(url = %current, "redirect loop");
            return Ok(RedirectOutcome::Unresolved(Unresolved::Loop { url: current }));
        }

        if !ctx.take_hop() {
            tracing::debug!(url = %current, hops = ctx.max_hops, "redirect budget exhausted");
            return Ok(RedirectOutcome::Unresolved(Unresolved::HopsExhausted {
                url: current,
                hops: ctx.max_hops,
            }));
        }

        let mut request = FetchRequest::new(current.as_str(), ctx.per_hop_timeout)
            .no_redirects()
            .headers_only()
            .with_referer(hop.referer.map(str::to_string));
        if let Some(headers) = hop.headers {
            for (name, value) in headers {
                request = request.with_header(name, value);
            }
        }

        let response = fetcher.get(&request).await?;

        let Some(location) = response.location() else {
            if response.status >= 400 {
                return Err(ResolveError::parse(
                    &current,
                    format!("HTTP status {} at end of redirect chain", response.status),
                ));
            }
            tracing::debug!(url = %current, hops = ctx.hops_taken(), "no Location, terminal");
            return Ok(RedirectOutcome::Resolved(current));
        };

        let next = resolve_location(&current, location)?;
        tracing::debug!(from = %current, to = %next, hop = ctx.hops_taken(), "redirect");

        if let Some(target) = embedded_target(&next, &rules.embedded_params) {
            tracing::debug!(url = %target, "target carried in redirect parameter");
            return Ok(RedirectOutcome::Resolved(target));
        }

        if is_terminal(&next, rules) {
            return Ok(RedirectOutcome::Resolved(next));
        }

        if next == current {
            return Ok(RedirectOutcome::Unresolved(Unresolved::Loop { url: next }));
        }

        current = next;
    }
}

/// A URL is terminal when it names a media file or has left the gateway
fn is_terminal(url: &str, rules: &RedirectSpec) -> bool {
    if has_media_extension(url) {
        return true;
    }

    if rules.gateway_fragments.is_empty() {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => {
            !host_contains_any(parsed.host_str().unwrap_or_default(), &rules.gateway_fragments)
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fetch::testing::StubFetcher;
    use std::time::Duration;

    fn ctx(max_hops: u32) -> ResolutionContext {
        ResolutionContext::new(&EngineConfig {
            max_hops,
            ..EngineConfig::default()
        })
    }

    async fn walk(fetcher: &StubFetcher, start: &str, rules: &RedirectSpec, max_hops: u32) -> RedirectOutcome {
        follow(fetcher, start, rules, &HopRequest::default(), &mut ctx(max_hops))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_follows_to_media_file() {
        let fetcher = StubFetcher::new()
            .redirect("https://gw.example/a", "https://gw.example/b")
            .redirect("https://gw.example/b", "https://cdn.example/movie.mkv");

        let outcome = walk(&fetcher, "https://gw.example/a", &RedirectSpec::default(), 8).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Resolved("https://cdn.example/movie.mkv".to_string())
        );
        assert_eq!(fetcher.hits("https://cdn.example/movie.mkv"), 0);
    }

    #[tokio::test]
    async fn test_three_cycle_is_unresolved() {
        let fetcher = StubFetcher::new()
            .redirect("https://a.example/", "https://b.example/")
            .redirect("https://b.example/", "https://c.example/")
            .redirect("https://c.example/", "https://a.example/");

        let outcome = walk(&fetcher, "https://a.example/", &RedirectSpec::default(), 50).await;
        assert!(matches!(outcome, RedirectOutcome::Unresolved(Unresolved::Loop { .. })));
        assert_eq!(fetcher.hits("https://a.example/"), 1);
    }

    #[tokio::test]
    async fn test_budget_bounds_long_chain() {
        let mut fetcher = StubFetcher::new();
        for i in 0..20 {
            fetcher = fetcher.redirect(
                &format!("https://gw.example/{}", i),
                &format!("https://gw.example/{}", i + 1),
            );
        }

        let outcome = walk(&fetcher, "https://gw.example/0", &RedirectSpec::default(), 3).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Unresolved(Unresolved::HopsExhausted {
                url: "https://gw.example/3".to_string(),
                hops: 3
            })
        );
        assert_eq!(fetcher.hits("https://gw.example/3"), 0);
    }

    #[tokio::test]
    async fn test_embedded_parameter_short_circuits() {
        let next_hop = "https://gw.example/go?link=https://host/file.mkv";
        let fetcher = StubFetcher::new()
            .redirect("https://gw.example/start", next_hop)
            .redirect(next_hop, "https://gw.example/elsewhere");

        let outcome = walk(&fetcher, "https://gw.example/start", &RedirectSpec::default(), 8).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Resolved("https://host/file.mkv".to_string())
        );
        assert_eq!(fetcher.hits(next_hop), 0);
    }

    #[tokio::test]
    async fn test_base64_parameter_short_circuits() {
        let fetcher = StubFetcher::new().redirect(
            "https://gw.example/start",
            "https://gw.example/go?url=aHR0cHM6Ly9ob3N0L2ZpbGUubWt2",
        );

        let outcome = walk(&fetcher, "https://gw.example/start", &RedirectSpec::default(), 8).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Resolved("https://host/file.mkv".to_string())
        );
    }

    #[tokio::test]
    async fn test_leaving_gateway_is_terminal() {
        let rules = RedirectSpec {
            gateway_fragments: vec!["gdlink".to_string()],
            ..RedirectSpec::default()
        };
        let fetcher = StubFetcher::new()
            .redirect("https://gdlink.example/f/1", "https://gdlink.example/f/2")
            .redirect("https://gdlink.example/f/2", "https://storage.example/dl/abc");

        let outcome = walk(&fetcher, "https://gdlink.example/f/1", &rules, 8).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Resolved("https://storage.example/dl/abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_relative_location_uses_current_hop() {
        let fetcher = StubFetcher::new()
            .redirect("https://a.gw.example/start", "https://b.gw.example/step")
            .redirect("https://b.gw.example/step", "/files/movie.mp4");

        let outcome = walk(&fetcher, "https://a.gw.example/start", &RedirectSpec::default(), 8).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Resolved("https://b.gw.example/files/movie.mp4".to_string())
        );
    }

    #[tokio::test]
    async fn test_self_redirect_is_loop() {
        let fetcher = StubFetcher::new().redirect("https://gw.example/a", "https://gw.example/a");

        let outcome = walk(&fetcher, "https://gw.example/a", &RedirectSpec::default(), 8).await;
        assert!(matches!(outcome, RedirectOutcome::Unresolved(Unresolved::Loop { .. })));
    }

    #[tokio::test]
    async fn test_no_location_is_terminal() {
        let fetcher = StubFetcher::new()
            .redirect("https://gw.example/a", "https://gw.example/landing")
            .page("https://gw.example/landing", "ok");

        let outcome = walk(&fetcher, "https://gw.example/a", &RedirectSpec::default(), 8).await;
        assert_eq!(
            outcome,
            RedirectOutcome::Resolved("https://gw.example/landing".to_string())
        );
    }

    #[tokio::test]
    async fn test_extensionless_file_is_not_downloaded() {
        let file = "https://cdn.example/dl/abc?token=1";
        let fetcher = StubFetcher::new()
            .redirect("https://gw.example/a", file)
            .large_file(file, Duration::from_secs(30));

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            walk(&fetcher, "https://gw.example/a", &RedirectSpec::default(), 8),
        )
        .await
        .expect("walker read the file body");

        assert_eq!(outcome, RedirectOutcome::Resolved(file.to_string()));
        assert_eq!(fetcher.hits(file), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_parse_error() {
        let fetcher = StubFetcher::new().redirect("https://gw.example/a", "https://gw.example/gone");

        let result = follow(
            &fetcher,
            "https://gw.example/a",
            &RedirectSpec::default(),
            &HopRequest::default(),
            &mut ctx(8),
        )
        .await;
        assert!(matches!(result, Err(ResolveError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_network_error_propagates() {
        let fetcher = StubFetcher::new().fail("https://gw.example/a");

        let result = follow(
            &fetcher,
            "https://gw.example/a",
            &RedirectSpec::default(),
            &HopRequest::default(),
            &mut ctx(8),
        )
        .await;
        assert!(result.unwrap_err().is_network());
    }

    #[test]
    fn test_unresolved_converts_to_error() {
        let err: ResolveError = Unresolved::HopsExhausted {
            url: "https://gw.example/".to_string(),
            hops: 8,
        }
        .into();
        assert!(err.is_unresolved());
    }
}
