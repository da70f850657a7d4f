// 🗂️ Session report store
// One cached report per session, last write wins, expired or excess slots evicted

use crate::aggregator::AggregateReport;
use crate::config::Config;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

// ============================================================================
// SESSION ID
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    /// Cookie value: `<uuid>.<sha256(secret + uuid)>`
    pub fn to_cookie_value(&self, secret_key: &str) -> String {
        format!("{}.{}", self.0, tag(secret_key, &self.0))
    }

    /// Parse a cookie value, rejecting anything whose tag does not verify
    pub fn from_cookie_value(value: &str, secret_key: &str) -> Option<Self> {
        let (id, given_tag) = value.trim().split_once('.')?;
        let id = Uuid::parse_str(id).ok()?;

        tags_match(&tag(secret_key, &id), given_tag).then_some(SessionId(id))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn tag(secret_key: &str, id: &Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update(id.as_bytes());
    format!("{:x}", hasher.finalize())
}

// Constant time over equal-length inputs
fn tags_match(expected: &str, given: &str) -> bool {
    expected.len() == given.len()
        && expected
            .bytes()
            .zip(given.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

// ============================================================================
// REPORT STORE
// ============================================================================

/// ReportStore - session-scoped slot for the latest report
pub trait ReportStore: Send + Sync {
    /// Replace whatever the session held
    fn put(&self, session: SessionId, report: AggregateReport);

    fn get(&self, session: &SessionId) -> Option<AggregateReport>;

    fn remove(&self, session: &SessionId) -> Option<AggregateReport>;
}

/// Default lifetime of an idle slot
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

/// Default number of sessions held at once
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone)]
struct Slot {
    report: AggregateReport,
    stored_at: DateTime<Utc>,
}

/// In-process store with time and size bounds
///
/// A slot expires `ttl` after it was last written. When a write would push
/// the store past `capacity`, the oldest slots go first.
#[derive(Debug)]
pub struct InMemoryReportStore {
    slots: Mutex<HashMap<SessionId, Slot>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::with_limits(
            Duration::seconds(DEFAULT_SESSION_TTL_SECS as i64),
            DEFAULT_MAX_SESSIONS,
        )
    }
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        InMemoryReportStore {
            slots: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Limits from `session_ttl_secs` / `max_sessions`
    pub fn from_config(config: &Config) -> Self {
        Self::with_limits(Duration::seconds(config.session_ttl_secs as i64), config.max_sessions)
    }

    pub fn session_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `put` with an explicit clock
    pub fn put_at(&self, session: SessionId, report: AggregateReport, now: DateTime<Utc>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        let ttl = self.ttl;
        slots.retain(|_, slot| now - slot.stored_at < ttl);
        slots.insert(session, Slot { report, stored_at: now });

        while slots.len() > self.capacity {
            let oldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.stored_at)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    slots.remove(&id);
                    debug!("Evicted report for session {}", id);
                }
                None => break,
            }
        }
    }

    /// `get` with an explicit clock; an expired slot is dropped and reads as empty
    pub fn get_at(&self, session: &SessionId, now: DateTime<Utc>) -> Option<AggregateReport> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        let fresh = slots.get(session).map(|slot| now - slot.stored_at < self.ttl)?;
        if !fresh {
            slots.remove(session);
            return None;
        }

        slots.get(session).map(|slot| slot.report.clone())
    }
}

impl ReportStore for InMemoryReportStore {
    fn put(&self, session: SessionId, report: AggregateReport) {
        self.put_at(session, report, Utc::now());
    }

    fn get(&self, session: &SessionId) -> Option<AggregateReport> {
        self.get_at(session, Utc::now())
    }

    fn remove(&self, session: &SessionId) -> Option<AggregateReport> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session)
            .map(|slot| slot.report)
    }
}
