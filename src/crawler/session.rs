//! Session pool: rotating request identities
//!
//! A session is a header identity (user agent and accept-language) borrowed
//! for one fetch at a time. The pool retires sessions that are worn out
//! (usage ceiling), stale (time-to-live) or unhealthy, and replaces them with
//! freshly drawn identities.

use crate::config::SessionConfig;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Real browser user agents sessions draw their identity from
pub const BROWSER_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7",
    "ru-RU,ru;q=0.9",
    "ru,en;q=0.9",
];

/// Headers a session presents to the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub accept_language: String,
}

impl Identity {
    /// Draws a random browser identity
    pub fn random() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENTS[fastrand::usize(..BROWSER_USER_AGENTS.len())]
                .to_string(),
            accept_language: ACCEPT_LANGUAGES[fastrand::usize(..ACCEPT_LANGUAGES.len())]
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: u64,
    pub identity: Identity,
    pub created_at: Instant,
    pub last_used: Option<Instant>,
    pub request_count: u32,
    pub error_score: u32,
    pub healthy: bool,
}

impl Session {
    fn fresh(id: u64, now: Instant) -> Self {
        Self {
            id,
            identity: Identity::random(),
            created_at: now,
            last_used: None,
            request_count: 0,
            error_score: 0,
            healthy: true,
        }
    }

    fn is_retired(&self, config: &SessionConfig, now: Instant) -> bool {
        !self.healthy
            || self.request_count >= config.max_usage
            || now.saturating_duration_since(self.created_at) >= Duration::from_secs(config.ttl_secs)
    }
}

/// A session borrowed for the duration of one fetch
#[derive(Debug, Clone)]
pub struct SessionLease {
    session_id: u64,
    pub identity: Identity,
}

impl SessionLease {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }
}

/// Result of a fetch made with a leased session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Success,
    /// Transient or permanent failure; counts toward the error ceiling
    Failure,
    /// Bot interdiction; the session is taken out of rotation at once
    Blocked,
}

struct PoolInner {
    sessions: Vec<Session>,
    next_id: u64,
    retired: usize,
}

/// Bounded pool of rotating sessions
pub struct SessionPool {
    config: SessionConfig,
    inner: Mutex<PoolInner>,
}

impl SessionPool {
    pub fn new(config: SessionConfig) -> Self {
        let now = Instant::now();
        let size = config.pool_size.max(1);
        let sessions = (0..size as u64).map(|id| Session::fresh(id, now)).collect();

        Self {
            config,
            inner: Mutex::new(PoolInner {
                sessions,
                next_id: size as u64,
                retired: 0,
            }),
        }
    }

    /// Borrows the least recently used healthy session
    pub fn acquire(&self) -> SessionLease {
        self.acquire_at(Instant::now())
    }

    fn acquire_at(&self, now: Instant) -> SessionLease {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let PoolInner {
            sessions,
            next_id,
            retired,
        } = &mut *inner;

        for session in sessions.iter_mut() {
            if session.is_retired(&self.config, now) {
                tracing::debug!(
                    "Retiring session {} after {} requests (healthy: {})",
                    session.id,
                    session.request_count,
                    session.healthy
                );
                *session = Session::fresh(*next_id, now);
                *next_id += 1;
                *retired += 1;
            }
        }

        // Never-used sessions sort before used ones
        let index = sessions
            .iter()
            .enumerate()
            .min_by_key(|(_, session)| session.last_used)
            .map(|(index, _)| index)
            .unwrap_or(0);

        let session = &mut sessions[index];
        session.request_count += 1;
        session.last_used = Some(now);

        SessionLease {
            session_id: session.id,
            identity: session.identity.clone(),
        }
    }

    /// Returns a lease and records how the fetch went
    pub fn release(&self, lease: SessionLease, outcome: SessionOutcome) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // The session may already have been replaced
        let Some(session) = inner
            .sessions
            .iter_mut()
            .find(|session| session.id == lease.session_id)
        else {
            return;
        };

        match outcome {
            SessionOutcome::Success => session.error_score = 0,
            SessionOutcome::Failure => {
                session.error_score += 1;
                if session.error_score >= self.config.max_errors {
                    session.healthy = false;
                }
            }
            SessionOutcome::Blocked => {
                tracing::warn!("Session {} was blocked, rotating it out", session.id);
                session.healthy = false;
            }
        }
    }

    /// Number of sessions retired and replaced so far
    pub fn retired_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).retired
    }

    pub fn healthy_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sessions
            .iter()
            .filter(|session| session.healthy)
            .count()
    }

    #[cfg(test)]
    fn snapshot(&self) -> Vec<Session> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sessions
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pool_size: usize, max_usage: u32) -> SessionConfig {
        SessionConfig {
            pool_size,
            max_usage,
            ttl_secs: 600,
            max_errors: 2,
        }
    }

    #[test]
    fn test_random_identity_is_a_browser() {
        let identity = Identity::random();
        assert!(identity.user_agent.starts_with("Mozilla/5.0"));
        assert!(identity.accept_language.contains("ru"));
    }

    #[test]
    fn test_acquire_rotates_least_recently_used() {
        let pool = SessionPool::new(config(3, 100));
        let now = Instant::now();

        let ids: Vec<u64> = (0..3)
            .map(|i| pool.acquire_at(now + Duration::from_millis(i)).session_id())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);

        // Session 0 is now the least recently used
        assert_eq!(pool.acquire_at(now + Duration::from_millis(5)).session_id(), 0);
    }

    #[test]
    fn test_usage_ceiling_retires_session() {
        let pool = SessionPool::new(config(1, 2));
        let now = Instant::now();

        let first = pool.acquire_at(now);
        let second = pool.acquire_at(now);
        assert_eq!(first.session_id(), second.session_id());

        let third = pool.acquire_at(now);
        assert_ne!(third.session_id(), first.session_id());
        assert_eq!(pool.retired_count(), 1);
    }

    #[test]
    fn test_ttl_retires_session() {
        let mut cfg = config(1, 100);
        cfg.ttl_secs = 60;
        let pool = SessionPool::new(cfg);
        let start = Instant::now();

        let lease = pool.acquire_at(start);
        let later = pool.acquire_at(start + Duration::from_secs(61));
        assert_ne!(lease.session_id(), later.session_id());
    }

    #[test]
    fn test_blocked_outcome_replaces_session() {
        let pool = SessionPool::new(config(1, 100));
        let lease = pool.acquire();
        let blocked_id = lease.session_id();

        pool.release(lease, SessionOutcome::Blocked);
        assert_eq!(pool.healthy_count(), 0);

        let next = pool.acquire();
        assert_ne!(next.session_id(), blocked_id);
        assert_eq!(pool.healthy_count(), 1);
    }

    #[test]
    fn test_failures_accumulate_until_unhealthy() {
        let pool = SessionPool::new(config(1, 100));

        let lease = pool.acquire();
        pool.release(lease, SessionOutcome::Failure);
        assert_eq!(pool.healthy_count(), 1);

        let lease = pool.acquire();
        pool.release(lease, SessionOutcome::Success);
        assert_eq!(pool.snapshot()[0].error_score, 0);

        for _ in 0..2 {
            let lease = pool.acquire();
            pool.release(lease, SessionOutcome::Failure);
        }
        assert_eq!(pool.healthy_count(), 0);
    }

    #[test]
    fn test_release_of_replaced_session_is_ignored() {
        let pool = SessionPool::new(config(1, 1));
        let stale = pool.acquire();
        let _fresh = pool.acquire();

        pool.release(stale, SessionOutcome::Blocked);
        assert_eq!(pool.healthy_count(), 1);
    }

    #[test]
    fn test_zero_pool_size_still_has_a_session() {
        let pool = SessionPool::new(config(0, 10));
        assert_eq!(pool.snapshot().len(), 1);
    }
}
