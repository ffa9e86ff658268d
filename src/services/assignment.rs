use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::game_state::GameStateModel;
use crate::models::player::Player;
use crate::models::role::RoleName;

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("expected {expected} role cards for {players} players but got {got}")]
    RoleCountMismatch {
        expected: usize,
        players: usize,
        got: usize,
    },
    #[error(
        "invalid role distribution: there are {count} cards with role {role} \
         when there is a maximum of {max}"
    )]
    InvalidDistribution {
        role: RoleName,
        count: usize,
        max: usize,
    },
}

/// Shuffles the requested deck, deals one role per player positionally and
/// the remaining `table_cards` face-down, then checks every role against
/// its maximum. On error nothing is returned, so no partial state escapes.
pub fn deal_roles(
    chosen: &[RoleName],
    players: &[Player],
    table_cards: usize,
    rng: &mut impl Rng,
) -> Result<GameStateModel, AssignmentError> {
    let expected = players.len() + table_cards;
    if chosen.len() != expected {
        return Err(AssignmentError::RoleCountMismatch {
            expected,
            players: players.len(),
            got: chosen.len(),
        });
    }

    let mut deck = chosen.to_vec();
    deck.shuffle(rng);

    let mut state = GameStateModel::new();
    for (index, role) in deck.into_iter().enumerate() {
        if index < players.len() {
            state.assign(role, players[index].clone());
        } else {
            state.table_roles.push(role);
        }
    }

    for role in RoleName::ALL {
        let count = state.count_of(role);
        if count > role.max_count() {
            return Err(AssignmentError::InvalidDistribution {
                role,
                count,
                max: role.max_count(),
            });
        }
    }

    Ok(state)
}
