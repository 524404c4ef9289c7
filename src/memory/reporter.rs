//! Session reporter - in-memory log of game sessions played with rented cards

use parking_lot::Mutex;

use crate::core::{AccountId, CardId, Result, SessionReporter, Timestamp};

/// Outcome of one game session played with a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub card: CardId,
    pub player: AccountId,
    pub restocked: bool,
    pub played_at: Timestamp,
}

/// Session log fed by the game, queried by the engine at settlement.
#[derive(Debug, Default)]
pub struct InMemorySessionReporter {
    sessions: Mutex<Vec<SessionRecord>>,
}

impl InMemorySessionReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished session; `restocked` says whether the player refilled
    /// the card before leaving it.
    pub fn record_session(
        &self,
        card: CardId,
        player: &AccountId,
        restocked: bool,
        played_at: Timestamp,
    ) {
        tracing::debug!(%card, %player, restocked, played_at, "session recorded");
        self.sessions.lock().push(SessionRecord {
            card,
            player: player.clone(),
            restocked,
            played_at,
        });
    }
}

impl SessionReporter for InMemorySessionReporter {
    fn did_restock_during_term(
        &self,
        card: CardId,
        tenant: &AccountId,
        term_started_at: Timestamp,
    ) -> Result<bool> {
        // The latest session of the term decides the state the card was left in.
        let sessions = self.sessions.lock();
        let last = sessions
            .iter()
            .filter(|s| s.card == card && &s.player == tenant && s.played_at >= term_started_at)
            .max_by_key(|s| s.played_at);

        Ok(last.map(|s| s.restocked).unwrap_or(true))
    }
}
