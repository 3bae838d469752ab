//! Per-session order accounting
//!
//! The ledger is the only mutable state in the guardrail pipeline. Every
//! session gets its own entry behind its own lock, so the check against the
//! order cap and the increment happen as one step and concurrent calls for
//! the same session can never overshoot the cap. Entries are only touched
//! while the map guard is held, so a reset or eviction never races an
//! increment into a removed entry.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug)]
struct LedgerEntry {
    order_count: u32,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl LedgerEntry {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            order_count: 0,
            created_at: now,
            last_active: now,
        }
    }
}

/// Result of [`SessionLedger::try_reserve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The order was counted; `order_count` is the new total
    Reserved { order_count: u32 },
    /// The cap was already reached; nothing changed
    LimitReached { order_count: u32 },
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved { .. })
    }
}

/// Point-in-time view of one session's ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub session_id: String,
    pub order_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Order counts keyed by session id
#[derive(Debug, Default)]
pub struct SessionLedger {
    sessions: RwLock<HashMap<String, Mutex<LedgerEntry>>>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders counted so far for a session; unknown sessions have none
    pub fn order_count(&self, session_id: &str) -> u32 {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map_or(0, |entry| {
                entry.lock().unwrap_or_else(PoisonError::into_inner).order_count
            })
    }

    /// Count one order if the session is still below `cap`
    pub fn try_reserve(&self, session_id: &str, cap: u32) -> Reservation {
        loop {
            {
                let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
                if let Some(entry) = sessions.get(session_id) {
                    return Self::reserve(entry, cap);
                }
            }
            self.sessions
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(session_id.to_string())
                .or_insert_with(|| Mutex::new(LedgerEntry::new()));
        }
    }

    fn reserve(entry: &Mutex<LedgerEntry>, cap: u32) -> Reservation {
        let mut entry = entry.lock().unwrap_or_else(PoisonError::into_inner);
        entry.last_active = Utc::now();

        if entry.order_count >= cap {
            return Reservation::LimitReached {
                order_count: entry.order_count,
            };
        }

        entry.order_count += 1;
        Reservation::Reserved {
            order_count: entry.order_count,
        }
    }

    /// Forget a session; returns the count it had, if it was tracked
    pub fn reset(&self, session_id: &str) -> Option<u32> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .map(|entry| entry.into_inner().unwrap_or_else(PoisonError::into_inner).order_count)
    }

    /// Drop sessions with no reservation attempt within `max_idle`
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let max_idle = TimeDelta::from_std(max_idle).unwrap_or(TimeDelta::MAX);
        let now = Utc::now();

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let entry = entry.lock().unwrap_or_else(PoisonError::into_inner);
            now - entry.last_active <= max_idle
        });
        before - sessions.len()
    }

    /// All tracked sessions, sorted by id
    pub fn snapshot(&self) -> Vec<LedgerSnapshot> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot: Vec<LedgerSnapshot> = sessions
            .iter()
            .map(|(id, entry)| {
                let entry = entry.lock().unwrap_or_else(PoisonError::into_inner);
                LedgerSnapshot {
                    session_id: id.clone(),
                    order_count: entry.order_count,
                    created_at: entry.created_at,
                    last_active: entry.last_active,
                }
            })
            .collect();
        snapshot.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        snapshot
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
