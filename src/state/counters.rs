//! Run-wide counters and the early-termination policy
//!
//! Workers never touch the counters directly; they go through the
//! check-and-increment operations below so `saved` can never pass the target
//! and no seed can visit more listing pages than its budget.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Gates further work on the saved count and per-seed page budgets
#[derive(Debug)]
pub struct TerminationController {
    target: usize,
    page_budget: usize,
    saved: AtomicUsize,
    pages_visited: Vec<AtomicUsize>,
    cancel: CancellationToken,
}

impl TerminationController {
    /// Creates a controller for `seeds` seeds
    ///
    /// `target` and `page_budget` are clamped to at least 1.
    pub fn new(target: usize, page_budget: usize, seeds: usize) -> Self {
        Self {
            target: target.max(1),
            page_budget: page_budget.max(1),
            saved: AtomicUsize::new(0),
            pages_visited: (0..seeds).map(|_| AtomicUsize::new(0)).collect(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn page_budget(&self) -> usize {
        self.page_budget
    }

    pub fn saved(&self) -> usize {
        self.saved.load(Ordering::SeqCst)
    }

    /// Records still wanted before the target is met
    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.saved())
    }

    /// Reserves one save slot; false once the target is met
    ///
    /// The reservation is provisional until `confirm_save` or `release_save`.
    pub fn try_reserve_save(&self) -> bool {
        self.saved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |saved| {
                (saved < self.target).then_some(saved + 1)
            })
            .is_ok()
    }

    /// Settles a reservation whose record was emitted
    ///
    /// Cancels the run and returns true when the target is met.
    pub fn confirm_save(&self) -> bool {
        if self.saved() >= self.target {
            self.abort();
            true
        } else {
            false
        }
    }

    /// Gives back a reservation whose record could not be emitted
    pub fn release_save(&self) {
        let _ = self
            .saved
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |saved| {
                saved.checked_sub(1)
            });
    }

    /// Counts a listing page visit for `seed`; false once its budget is spent
    pub fn try_visit_listing(&self, seed: usize) -> bool {
        let Some(visited) = self.pages_visited.get(seed) else {
            return false;
        };

        visited
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                (count < self.page_budget).then_some(count + 1)
            })
            .is_ok()
    }

    pub fn pages_visited(&self, seed: usize) -> usize {
        self.pages_visited
            .get(seed)
            .map(|v| v.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Whether a listing request for zero-based page `page_number` may be enqueued
    pub fn allows_page(&self, page_number: u32) -> bool {
        (page_number as usize) < self.page_budget
    }

    /// Asks every worker to stop picking up new work
    pub fn abort(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Target of {} reached, draining outstanding work", self.target);
        }
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token handed to workers and the frontier for cooperative cancellation
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
