use std::fmt;

use serde::{Deserialize, Serialize};

use super::player::Player;
use super::role::RoleName;

/// Canonical mapping of role -> holders plus the face-down table roles.
///
/// Every `RoleName` has a slot, possibly empty. Invariant: the number of
/// assigned players plus the number of table cards equals the number of
/// role cards requested for the session, and no role exceeds its
/// `max_count` across both.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameStateModel {
    player_roles: [Vec<Player>; RoleName::COUNT],
    pub table_roles: Vec<RoleName>,
}

impl GameStateModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, role: RoleName, player: Player) {
        self.player_roles[role.index()].push(player);
    }

    pub fn players_with(&self, role: RoleName) -> &[Player] {
        &self.player_roles[role.index()]
    }

    pub fn role_of(&self, player_id: &str) -> Option<RoleName> {
        RoleName::ALL
            .into_iter()
            .find(|role| self.player_roles[role.index()].iter().any(|p| p.id == player_id))
    }

    pub fn has_role_in_play(&self, role: RoleName) -> bool {
        !self.player_roles[role.index()].is_empty()
    }

    /// Total cards of this role, held and on the table.
    pub fn count_of(&self, role: RoleName) -> usize {
        self.player_roles[role.index()].len()
            + self.table_roles.iter().filter(|r| **r == role).count()
    }

    pub fn assigned_count(&self) -> usize {
        self.player_roles.iter().map(Vec::len).sum()
    }

    /// Moves a player out of `from` into `to`. Used by the role-switch
    /// mechanic; the whole `from` slot is emptied, matching the one-copy
    /// rule.
    pub fn adopt_role(&mut self, player_id: &str, from: RoleName, to: RoleName) {
        let source = &mut self.player_roles[from.index()];
        if let Some(pos) = source.iter().position(|p| p.id == player_id) {
            let player = source.remove(pos);
            source.clear();
            self.player_roles[to.index()].push(player);
        }
    }

    /// Independent deep copy, frozen at the moment it is taken.
    pub fn snapshot(&self) -> GameStateModel {
        self.clone()
    }
}

impl fmt::Display for GameStateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for role in RoleName::ALL {
            let holders = self.players_with(role);
            if !holders.is_empty() {
                let names: Vec<&str> = holders.iter().map(|p| p.name.as_str()).collect();
                writeln!(f, "{}: {}", role, names.join(", "))?;
            }
        }
        let table: Vec<String> = self.table_roles.iter().map(|r| r.to_string()).collect();
        write!(f, "table: {}", table.join(", "))
    }
}
