//! Request model and per-request state machine
//!
//! A request moves `Pending → InFlight → {Succeeded, FailedRetryable,
//! FailedTerminal}`; a retryable failure re-enters `Pending` with its attempt
//! counter incremented.

use crate::HarvestError;
use std::fmt;
use url::Url;

/// The two kinds of pages the harvester visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// Search results page with vacancy links and pagination controls
    Listing,

    /// A single vacancy page
    Detail,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Detail => "detail",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    // ===== Active States =====
    /// Waiting in the frontier
    Pending,

    /// Claimed by a worker
    InFlight,

    // ===== Outcomes =====
    /// Fetched and extracted
    Succeeded,

    /// Failed with a transient or blocked error; will be retried
    FailedRetryable,

    /// Failed permanently or ran out of attempts; dropped
    FailedTerminal,
}

impl RequestState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedTerminal)
    }

    /// Checks whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::InFlight, Self::Succeeded)
                | (Self::InFlight, Self::FailedRetryable)
                | (Self::InFlight, Self::FailedTerminal)
                | (Self::FailedRetryable, Self::Pending)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Succeeded => "succeeded",
            Self::FailedRetryable => "failed_retryable",
            Self::FailedTerminal => "failed_terminal",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work in the frontier
#[derive(Debug, Clone)]
pub struct Request {
    /// Canonical URL; also the deduplication key
    pub url: Url,

    pub kind: PageKind,

    /// Zero-based results page index (always 0 for vacancy pages)
    pub page_number: u32,

    /// Number of failed attempts so far
    pub attempt: u32,

    /// Index of the seed this request descends from
    pub seed: usize,

    state: RequestState,
}

impl Request {
    /// Creates a listing request for page `page_number` of seed `seed`
    pub fn listing(url: Url, page_number: u32, seed: usize) -> Self {
        Self {
            url,
            kind: PageKind::Listing,
            page_number,
            attempt: 0,
            seed,
            state: RequestState::Pending,
        }
    }

    /// Creates a vacancy page request discovered from seed `seed`
    pub fn detail(url: Url, seed: usize) -> Self {
        Self {
            url,
            kind: PageKind::Detail,
            page_number: 0,
            attempt: 0,
            seed,
            state: RequestState::Pending,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Moves the request to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: RequestState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        if self.state == RequestState::FailedRetryable && next == RequestState::Pending {
            self.attempt += 1;
        }
        self.state = next;
        Ok(())
    }
}
