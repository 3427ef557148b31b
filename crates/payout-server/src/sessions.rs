//! Per-wallet engine sessions, kept in memory for the life of the process.

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use payout::TokenAmount;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unix seconds.
    pub started_at: u64,
    pub total_earned: TokenAmount,
    pub last_withdrawal_at: Option<u64>,
}

/// Sessions keyed by lower-cased wallet address.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or reset the session for `wallet`.
    pub fn start(&self, wallet: &str) -> Session {
        let session = Session {
            started_at: now_secs(),
            total_earned: TokenAmount::whole(0),
            last_withdrawal_at: None,
        };
        self.sessions
            .insert(wallet.to_ascii_lowercase(), session.clone());
        session
    }

    pub fn get(&self, wallet: &str) -> Option<Session> {
        self.sessions
            .get(&wallet.to_ascii_lowercase())
            .map(|s| s.value().clone())
    }

    /// Reset earnings after a delivered withdrawal. Returns false when the
    /// wallet never started a session.
    pub fn record_withdrawal(&self, wallet: &str) -> bool {
        match self.sessions.get_mut(&wallet.to_ascii_lowercase()) {
            Some(mut session) => {
                session.total_earned = TokenAmount::whole(0);
                session.last_withdrawal_at = Some(now_secs());
                true
            }
            None => false,
        }
    }

    /// Drop the session for `wallet`. Returns false when there was none.
    pub fn remove(&self, wallet: &str) -> bool {
        self.sessions.remove(&wallet.to_ascii_lowercase()).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
