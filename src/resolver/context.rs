//! Per-branch resolution state

use crate::config::EngineConfig;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Budget and loop guard owned by a single branch
///
/// Contexts are never shared between concurrent branches. A branch that hands
/// work to another host creates a [`child`](Self::child) context one level
/// deeper, with its own visited set and hop budget.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    /// Redirect hops this branch may take
    pub max_hops: u32,

    /// Timeout for each request
    pub per_hop_timeout: Duration,

    /// Time the whole branch may take
    pub overall_timeout: Duration,

    /// Delegation level; the caller's reference is level 0
    pub depth: u32,

    /// Deepest level a branch may delegate to
    pub max_depth: u32,

    default_hops: u32,
    hops: u32,
    visited: HashSet<String>,
    deadline: Instant,
}

impl ResolutionContext {
    /// Creates a level-0 context whose clock starts now
    pub fn new(config: &EngineConfig) -> Self {
        let overall_timeout = Duration::from_millis(config.overall_timeout_ms);
        Self {
            max_hops: config.max_hops,
            per_hop_timeout: Duration::from_millis(config.per_hop_timeout_ms),
            overall_timeout,
            depth: 0,
            max_depth: config.max_delegation_depth,
            default_hops: config.max_hops,
            hops: 0,
            visited: HashSet::new(),
            deadline: Instant::now() + overall_timeout,
        }
    }

    /// Restarts the branch clock and returns the new deadline
    ///
    /// Called when the branch actually starts running, so time spent waiting
    /// for a pool slot does not count against it.
    pub fn arm(&mut self) -> Instant {
        self.deadline = Instant::now() + self.overall_timeout;
        self.deadline
    }

    /// Applies a host's own hop budget, if it has one
    pub fn with_host_hops(mut self, max_hops: Option<u32>) -> Self {
        if let Some(max_hops) = max_hops {
            self.max_hops = max_hops;
        }
        self
    }

    /// Records a URL as visited; returns false if it was seen before
    pub fn visit(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Consumes one hop; returns false once the budget is spent
    pub fn take_hop(&mut self) -> bool {
        if self.hops >= self.max_hops {
            return false;
        }
        self.hops += 1;
        true
    }

    pub fn hops_taken(&self) -> u32 {
        self.hops
    }

    /// Returns true if work may be handed one level deeper
    pub fn can_delegate(&self) -> bool {
        self.depth < self.max_depth
    }

    /// Context for a delegated branch: one level deeper, fresh budget
    pub fn child(&self) -> Self {
        Self {
            max_hops: self.default_hops,
            per_hop_timeout: self.per_hop_timeout,
            overall_timeout: self.overall_timeout,
            depth: self.depth + 1,
            max_depth: self.max_depth,
            default_hops: self.default_hops,
            hops: 0,
            visited: HashSet::new(),
            deadline: Instant::now() + self.overall_timeout,
        }
    }
}
