use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::player::Player;
use super::role::Faction;

/// One player's choice of who to kill.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Vote {
    pub voter: Player,
    pub target: Player,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub enum DeathCause {
    Vote,
    /// Killed by a dying hunter's parting shot rather than by vote count.
    Retaliation { by: Player },
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Death {
    pub player: Player,
    pub cause: DeathCause,
}

/// Outcome of the vote and its resolution. Created once at the end of the
/// round and immutable afterwards; the `deaths` vector is ordered, vote
/// deaths first, then cascade deaths in the order they were resolved.
#[derive(Clone, Debug, Serialize)]
pub struct RoundResult {
    pub id: Uuid,
    pub decided_at: DateTime<Utc>,
    pub votes: Vec<Vote>,
    /// Votes received, keyed by target player id.
    pub tally: HashMap<String, usize>,
    pub deaths: Vec<Death>,
    pub winner: Faction,
}

impl RoundResult {
    pub fn died(&self, player_id: &str) -> bool {
        self.deaths.iter().any(|d| d.player.id == player_id)
    }

    pub fn vote_deaths(&self) -> impl Iterator<Item = &Death> {
        self.deaths.iter().filter(|d| d.cause == DeathCause::Vote)
    }

    pub fn cascade_deaths(&self) -> impl Iterator<Item = &Death> {
        self.deaths
            .iter()
            .filter(|d| matches!(d.cause, DeathCause::Retaliation { .. }))
    }
}
