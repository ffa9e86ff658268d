use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::models::game_state::GameStateModel;
use crate::models::role::{Faction, RoleName};
use crate::models::round_result::{Death, DeathCause, RoundResult, Vote};

/// Resolves one round of votes against the end-of-night state.
///
/// Rules, in order:
/// - highest tally of 1 or less kills nobody; werewolves win if any player
///   holds the werewolf card, otherwise the villagers do;
/// - otherwise every player at the highest tally dies, ties included;
/// - each dying hunter drags their own vote target down with them;
/// - a vote-killed tanner wins outright, else any dead werewolf (cascades
///   included) hands the win to the villagers, else the werewolves win.
///
/// A vote naming a player outside the game is a caller bug, not a runtime
/// condition; the resolver assumes well-formed input.
pub fn resolve_round(votes: &[Vote], state: &GameStateModel) -> RoundResult {
    let mut tally: HashMap<String, usize> = HashMap::new();
    for vote in votes {
        *tally.entry(vote.target.id.clone()).or_insert(0) += 1;
    }
    let highest = tally.values().copied().max().unwrap_or(0);

    let mut deaths: Vec<Death> = Vec::new();
    if highest > 1 {
        for vote in votes {
            if tally[&vote.target.id] == highest && !deaths.iter().any(|d| d.player == vote.target)
            {
                deaths.push(Death {
                    player: vote.target.clone(),
                    cause: DeathCause::Vote,
                });
            }
        }

        // A dying hunter's target dies too. Only vote deaths retaliate, so
        // two hunters shooting each other cannot loop.
        let dying_hunters: Vec<_> = deaths
            .iter()
            .filter(|d| state.role_of(&d.player.id) == Some(RoleName::Hunter))
            .map(|d| d.player.clone())
            .collect();
        for hunter in dying_hunters {
            let target = votes
                .iter()
                .find(|v| v.voter.id == hunter.id)
                .map(|v| v.target.clone());
            if let Some(target) = target {
                if !deaths.iter().any(|d| d.player == target) {
                    deaths.push(Death {
                        player: target,
                        cause: DeathCause::Retaliation { by: hunter },
                    });
                }
            }
        }
    }

    let winner = determine_winner(&deaths, state, highest);

    RoundResult {
        id: Uuid::new_v4(),
        decided_at: Utc::now(),
        votes: votes.to_vec(),
        tally,
        deaths,
        winner,
    }
}

fn determine_winner(deaths: &[Death], state: &GameStateModel, highest: usize) -> Faction {
    if highest <= 1 {
        // Nobody lynched: inaction favors the wolves.
        return if state.has_role_in_play(RoleName::Werewolf) {
            Faction::Werewolves
        } else {
            Faction::Villagers
        };
    }

    let voted_out_tanner = deaths.iter().any(|d| {
        d.cause == DeathCause::Vote && state.role_of(&d.player.id) == Some(RoleName::Tanner)
    });
    if voted_out_tanner {
        return Faction::Tanner;
    }

    let dead_werewolf = deaths
        .iter()
        .any(|d| state.role_of(&d.player.id) == Some(RoleName::Werewolf));
    if dead_werewolf {
        Faction::Villagers
    } else {
        Faction::Werewolves
    }
}
