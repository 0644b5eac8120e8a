//! Frontier of pending requests
//!
//! Two FIFO classes: pagination continuation is `High` and always drains
//! before `Normal` (seeds and detail pages). Workers claim requests with
//! [`Frontier::pop`] and report back with [`Frontier::complete`]; the crawl
//! is over once both queues are empty and no claimed request is still being
//! worked on, since only active workers can produce new requests.

use crate::state::Request;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Normal,
}

#[derive(Debug, Default)]
struct Queues {
    high: VecDeque<Request>,
    normal: VecDeque<Request>,
    active: usize,
}

impl Queues {
    fn class_mut(&mut self, priority: Priority) -> &mut VecDeque<Request> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
        }
    }

    fn is_empty(&self) -> bool {
        self.high.is_empty() && self.normal.is_empty()
    }
}

/// Shared pending-work queue
#[derive(Debug)]
pub struct Frontier {
    queues: Mutex<Queues>,
    changed: Notify,
    cancel: CancellationToken,
}

impl Frontier {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            queues: Mutex::new(Queues::default()),
            changed: Notify::new(),
            cancel,
        }
    }

    /// Appends a request to the back of its class
    pub fn push(&self, request: Request, priority: Priority) {
        self.lock().class_mut(priority).push_back(request);
        self.changed.notify_waiters();
    }

    /// Puts a request at the front of its class (retries)
    pub fn push_front(&self, request: Request, priority: Priority) {
        self.lock().class_mut(priority).push_front(request);
        self.changed.notify_waiters();
    }

    /// Claims the next request
    ///
    /// Waits while the queues are empty but other workers are still active.
    /// Returns `None` when the queues are empty and every worker is idle, or
    /// once the run is cancelled.
    pub async fn pop(&self) -> Option<Request> {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if self.cancel.is_cancelled() {
                return None;
            }

            {
                let mut queues = self.lock();
                let next = match queues.high.pop_front() {
                    Some(request) => Some(request),
                    None => queues.normal.pop_front(),
                };

                if let Some(request) = next {
                    queues.active += 1;
                    return Some(request);
                }

                if queues.active == 0 {
                    drop(queues);
                    self.changed.notify_waiters();
                    return None;
                }
            }

            tokio::select! {
                _ = &mut changed => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// Marks a claimed request as finished
    ///
    /// Follow-up requests must be pushed before calling this.
    pub fn complete(&self) {
        {
            let mut queues = self.lock();
            queues.active = queues.active.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Drops every unclaimed request and returns how many were dropped
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut queues = self.lock();
            let dropped = queues.high.len() + queues.normal.len();
            queues.high.clear();
            queues.normal.clear();
            dropped
        };
        self.changed.notify_waiters();
        dropped
    }

    pub fn len(&self) -> usize {
        let queues = self.lock();
        queues.high.len() + queues.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Requests claimed but not yet completed
    pub fn active(&self) -> usize {
        self.lock().active
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }
}
