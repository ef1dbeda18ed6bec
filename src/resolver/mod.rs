//! Resolution engine
//!
//! This module contains:
//! - Strategy dispatch over the configured host profiles
//! - The redirect chain walker
//! - Host strategies and their page helpers
//! - A bounded branch pool and the aggregator driving it
//! - [`Resolver`], the caller-facing entry point

mod aggregator;
mod context;
mod dispatch;
mod page;
mod redirect;
mod scheduler;
mod strategy;

pub use context::ResolutionContext;
pub use dispatch::{Dispatcher, FALLBACK_HOST};
pub use redirect::{follow, HopRequest, RedirectOutcome, Unresolved};
pub use scheduler::BranchScheduler;

use crate::alias::DomainAliasTable;
use crate::config::{validate, EngineConfig, ResolverConfig};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::model::{ScoredLink, SourceReference, SubtitleTrack};
use crate::score::rank;
use crate::Result;
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Whether streaming manifests may be returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMode {
    /// Plain file downloads only
    DownloadOnly,
    /// Downloads and HLS/DASH manifests
    AllowStreaming,
}

impl LinkMode {
    pub fn from_download_only(download_only: bool) -> Self {
        if download_only {
            Self::DownloadOnly
        } else {
            Self::AllowStreaming
        }
    }

    pub fn allows_streaming(self) -> bool {
        self == Self::AllowStreaming
    }
}

/// An item emitted while resolving
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Resolved {
    Link(ScoredLink),
    /// Found alongside a manifest by a cipher host
    Subtitle(SubtitleTrack),
}

/// Collected results, best link first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankedLinks {
    pub links: Vec<ScoredLink>,
    pub subtitles: Vec<SubtitleTrack>,
}

impl RankedLinks {
    pub fn best(&self) -> Option<&ScoredLink> {
        self.links.first()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.subtitles.is_empty()
    }
}

/// Shared, read-only state of a resolver
pub(crate) struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) aliases: Arc<DomainAliasTable>,
    pub(crate) dispatcher: Dispatcher,
}

impl Engine {
    pub(crate) fn new(config: ResolverConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let aliases = Arc::new(DomainAliasTable::new(&config.aliases, Arc::clone(&fetcher)));
        Self::with_aliases(config, fetcher, aliases)
    }

    fn with_aliases(
        config: ResolverConfig,
        fetcher: Arc<dyn Fetcher>,
        aliases: Arc<DomainAliasTable>,
    ) -> Result<Self> {
        validate(&config)?;
        let dispatcher = Dispatcher::new(&config.hosts)?;

        Ok(Self {
            config: config.resolver,
            fetcher,
            aliases,
            dispatcher,
        })
    }
}

/// Turns media page references into ranked links
///
/// Cloning is cheap; clones share the alias table. Each call runs on its own
/// branches and shares nothing else, so concurrent calls do not interfere.
///
/// # Example
///
/// ```no_run
/// use link_resolver::{LinkMode, Resolver, ResolverConfig, SourceReference};
///
/// # async fn run() -> link_resolver::Result<()> {
/// let resolver = Resolver::from_config(ResolverConfig::default())?;
/// let ranked = resolver
///     .collect_ranked(SourceReference::new("https://host.example/f/abc"), LinkMode::DownloadOnly)
///     .await;
/// if let Some(best) = ranked.best() {
///     println!("{} ({})", best.link.url, best.score);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Resolver {
    engine: Arc<Engine>,
}

impl Resolver {
    /// Validates the configuration and builds a resolver around `fetcher`
    pub fn new(config: ResolverConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(Engine::new(config, fetcher)?),
        })
    }

    /// Builds a resolver with the reqwest-backed fetcher
    pub fn from_config(config: ResolverConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Self::new(config, Arc::new(fetcher))
    }

    /// Builds a resolver sharing an existing alias table
    pub fn with_alias_table(
        config: ResolverConfig,
        fetcher: Arc<dyn Fetcher>,
        aliases: Arc<DomainAliasTable>,
    ) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(Engine::with_aliases(config, fetcher, aliases)?),
        })
    }

    /// The alias table, e.g. to invalidate it
    pub fn aliases(&self) -> &Arc<DomainAliasTable> {
        &self.engine.aliases
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.engine.dispatcher
    }

    /// Mode used by [`resolve`](Self::resolve)
    pub fn default_mode(&self) -> LinkMode {
        LinkMode::from_download_only(self.engine.config.download_only)
    }

    /// Starts resolving and returns the results as they are found
    ///
    /// Links arrive in discovery order, not ranked. A URL is emitted again
    /// only if a later branch found it with a strictly higher score. Dropping
    /// the stream cancels the remaining work.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn resolve_all(&self, reference: SourceReference, mode: LinkMode) -> LinkStream {
        let (tx, rx) = mpsc::unbounded();
        tracing::info!(url = %reference.url, mode = ?mode, "resolving");
        let driver = tokio::spawn(aggregator::drive(
            Arc::clone(&self.engine),
            reference,
            mode,
            tx,
        ));
        LinkStream { rx, driver }
    }

    /// Like [`resolve_all`](Self::resolve_all), in the configured default mode
    pub fn resolve(&self, reference: SourceReference) -> LinkStream {
        self.resolve_all(reference, self.default_mode())
    }

    /// Resolves and hands each item to a callback as it arrives
    pub async fn resolve_with_sinks<L, S>(
        &self,
        reference: SourceReference,
        mode: LinkMode,
        mut on_link: L,
        mut on_subtitle: S,
    ) where
        L: FnMut(ScoredLink),
        S: FnMut(SubtitleTrack),
    {
        let mut stream = self.resolve_all(reference, mode);
        while let Some(item) = stream.next().await {
            match item {
                Resolved::Link(link) => on_link(link),
                Resolved::Subtitle(track) => on_subtitle(track),
            }
        }
    }

    /// Resolves everything, then ranks
    ///
    /// Duplicate URLs keep their highest score; links are sorted by score
    /// with discovery order breaking ties.
    pub async fn collect_ranked(&self, reference: SourceReference, mode: LinkMode) -> RankedLinks {
        let mut links = Vec::new();
        let mut subtitles = Vec::new();

        self.resolve_with_sinks(
            reference,
            mode,
            |link| links.push(link),
            |track| subtitles.push(track),
        )
        .await;

        RankedLinks {
            links: rank(links),
            subtitles,
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.engine.config)
            .field("hosts", &self.engine.dispatcher.len())
            .field("aliases", &self.engine.aliases)
            .finish()
    }
}

/// Stream of [`Resolved`] items from one resolution call
///
/// Ends when every branch has finished. Dropping it aborts the branches
/// still running.
pub struct LinkStream {
    rx: mpsc::UnboundedReceiver<Resolved>,
    driver: JoinHandle<()>,
}

impl Stream for LinkStream {
    type Item = Resolved;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("finished", &self.driver.is_finished())
            .finish()
    }
}

impl Drop for LinkStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
