//! Fan-out and incremental emission
//!
//! The driver runs the caller's reference as the first branch. Every branch
//! reports its candidates plus the references it delegated, and each delegated
//! reference becomes a new branch in the same bounded pool. Candidates are
//! scored, filtered and de-duplicated as reports arrive, then pushed to the
//! caller without waiting for slower branches.

use crate::model::{CandidateLink, SourceReference, SubtitleTrack};
use crate::resolver::context::ResolutionContext;
use crate::resolver::scheduler::BranchScheduler;
use crate::resolver::{strategy, Engine, LinkMode, Resolved};
use crate::score::score_link;
use crate::ResolveError;
use futures::channel::mpsc::UnboundedSender;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// What one branch hands back to the driver
#[derive(Debug, Default)]
struct BranchReport {
    links: Vec<CandidateLink>,
    subtitles: Vec<SubtitleTrack>,
    children: Vec<(SourceReference, ResolutionContext)>,
}

/// Resolves `reference` and every branch it fans out to, sending results to `tx`
///
/// Returns when all branches are done or the receiving side is dropped.
pub(crate) async fn drive(
    engine: Arc<Engine>,
    reference: SourceReference,
    mode: LinkMode,
    tx: UnboundedSender<Resolved>,
) {
    let started = Instant::now();
    let mut scheduler = BranchScheduler::new(engine.config.max_concurrent_branches as usize);
    let mut merger = Merger::new(mode);

    let root = ResolutionContext::new(&engine.config);
    scheduler.spawn(run_branch(Arc::clone(&engine), reference.clone(), root));

    while let Some(report) = scheduler.next().await {
        for (child, ctx) in report.children {
            if ctx.depth > ctx.max_depth {
                let error = ResolveError::DelegationDepth {
                    url: child.url,
                    depth: ctx.depth,
                };
                tracing::info!(kind = error.kind(), "branch dropped: {}", error);
                continue;
            }
            scheduler.spawn(run_branch(Arc::clone(&engine), child, ctx));
        }

        for item in merger.accept(report.links, report.subtitles) {
            if tx.unbounded_send(item).is_err() {
                tracing::debug!(url = %reference.url, "consumer dropped the stream, stopping");
                return;
            }
        }
    }

    tracing::info!(
        url = %reference.url,
        branches = scheduler.spawned(),
        links = merger.emitted(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "resolution finished"
    );
}

/// Runs one branch under its own deadline
///
/// Errors and timeouts are logged here and end only this branch, which then
/// reports nothing.
async fn run_branch(
    engine: Arc<Engine>,
    reference: SourceReference,
    mut ctx: ResolutionContext,
) -> BranchReport {
    let deadline = ctx.arm();
    let started = Instant::now();
    let host = engine.dispatcher.dispatch(&reference).clone();
    let mut ctx = ctx.with_host_hops(host.max_hops);

    let outcome = tokio::time::timeout_at(
        deadline,
        strategy::execute(&engine, &host, &reference, &mut ctx),
    )
    .await;

    match outcome {
        Ok(Ok(output)) => {
            tracing::info!(
                host = %host.name,
                url = %reference.url,
                depth = ctx.depth,
                links = output.links.len(),
                delegated = output.delegated.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "branch resolved"
            );
            BranchReport {
                links: output.links,
                subtitles: output.subtitles,
                children: output
                    .delegated
                    .into_iter()
                    .map(|child| (child, ctx.child()))
                    .collect(),
            }
        }
        Ok(Err(error)) => {
            log_branch_error(&host.name, &reference.url, &error);
            BranchReport::default()
        }
        Err(_) => {
            tracing::warn!(
                host = %host.name,
                url = %reference.url,
                timeout_ms = ctx.overall_timeout.as_millis() as u64,
                "branch deadline exceeded"
            );
            BranchReport::default()
        }
    }
}

fn log_branch_error(host: &str, url: &str, error: &ResolveError) {
    match error {
        ResolveError::Network(_) => {
            tracing::warn!(host, url, kind = error.kind(), "branch abandoned: {}", error)
        }
        ResolveError::Config(_) => {
            tracing::error!(host, url, kind = error.kind(), "branch misconfigured: {}", error)
        }
        _ => tracing::info!(host, url, kind = error.kind(), "branch yielded nothing: {}", error),
    }
}

/// Scores, filters and de-duplicates branch output in arrival order
#[derive(Debug)]
struct Merger {
    mode: LinkMode,
    best: HashMap<String, i64>,
    subtitles: HashSet<SubtitleTrack>,
    discovered: usize,
    emitted: usize,
}

impl Merger {
    fn new(mode: LinkMode) -> Self {
        Self {
            mode,
            best: HashMap::new(),
            subtitles: HashSet::new(),
            discovered: 0,
            emitted: 0,
        }
    }

    /// Returns the items worth emitting
    ///
    /// A URL already emitted is only emitted again when it now scores
    /// strictly higher.
    fn accept(
        &mut self,
        links: Vec<CandidateLink>,
        subtitles: Vec<SubtitleTrack>,
    ) -> Vec<Resolved> {
        let mut out = Vec::new();

        for link in links {
            if !self.mode.allows_streaming() && link.is_streaming() {
                tracing::debug!(url = %link.url, "download-only: dropping streaming URL");
                continue;
            }

            let scored = score_link(link, self.discovered);
            self.discovered += 1;

            if let Some(&previous) = self.best.get(&scored.link.url) {
                if previous >= scored.score {
                    continue;
                }
            }

            self.best.insert(scored.link.url.clone(), scored.score);
            self.emitted += 1;
            out.push(Resolved::Link(scored));
        }

        for track in subtitles {
            if self.subtitles.insert(track.clone()) {
                out.push(Resolved::Subtitle(track));
            }
        }

        out
    }

    fn emitted(&self) -> usize {
        self.emitted
    }
}
