use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of roles a card can carry. Every role has a slot in the
/// game state, whether or not it was requested for the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    Doppelganger,
    Werewolf,
    Minion,
    Mason,
    Seer,
    Robber,
    Troublemaker,
    Drunk,
    Insomniac,
    Villager,
    Hunter,
    Tanner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Villagers,
    Werewolves,
    Tanner,
}

/// The fixed sequence in which roles act at night. Roles outside this list
/// never take a turn.
pub const NIGHT_CALL_ORDER: [RoleName; 9] = [
    RoleName::Doppelganger,
    RoleName::Werewolf,
    RoleName::Minion,
    RoleName::Mason,
    RoleName::Seer,
    RoleName::Robber,
    RoleName::Troublemaker,
    RoleName::Drunk,
    RoleName::Insomniac,
];

impl RoleName {
    pub const COUNT: usize = 12;

    pub const ALL: [RoleName; RoleName::COUNT] = [
        RoleName::Doppelganger,
        RoleName::Werewolf,
        RoleName::Minion,
        RoleName::Mason,
        RoleName::Seer,
        RoleName::Robber,
        RoleName::Troublemaker,
        RoleName::Drunk,
        RoleName::Insomniac,
        RoleName::Villager,
        RoleName::Hunter,
        RoleName::Tanner,
    ];

    /// Stable position used to key enum-indexed arrays.
    pub fn index(self) -> usize {
        match self {
            RoleName::Doppelganger => 0,
            RoleName::Werewolf => 1,
            RoleName::Minion => 2,
            RoleName::Mason => 3,
            RoleName::Seer => 4,
            RoleName::Robber => 5,
            RoleName::Troublemaker => 6,
            RoleName::Drunk => 7,
            RoleName::Insomniac => 8,
            RoleName::Villager => 9,
            RoleName::Hunter => 10,
            RoleName::Tanner => 11,
        }
    }

    /// How many cards of this role a single deck may contain.
    pub fn max_count(self) -> usize {
        match self {
            RoleName::Werewolf | RoleName::Mason => 2,
            RoleName::Villager => 3,
            _ => 1,
        }
    }

    pub fn faction(self) -> Faction {
        match self {
            RoleName::Werewolf | RoleName::Minion => Faction::Werewolves,
            RoleName::Tanner => Faction::Tanner,
            _ => Faction::Villagers,
        }
    }

    /// Roles a switched player may act as later the same night. The
    /// doppelganger itself is excluded: its turn has already passed by the
    /// time a switch can exist.
    pub fn is_mimic(self) -> bool {
        NIGHT_CALL_ORDER.contains(&self) && self != RoleName::Doppelganger
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoleName::Doppelganger => "doppelganger",
            RoleName::Werewolf => "werewolf",
            RoleName::Minion => "minion",
            RoleName::Mason => "mason",
            RoleName::Seer => "seer",
            RoleName::Robber => "robber",
            RoleName::Troublemaker => "troublemaker",
            RoleName::Drunk => "drunk",
            RoleName::Insomniac => "insomniac",
            RoleName::Villager => "villager",
            RoleName::Hunter => "hunter",
            RoleName::Tanner => "tanner",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Villagers => write!(f, "villagers"),
            Faction::Werewolves => write!(f, "werewolf"),
            Faction::Tanner => write!(f, "tanner"),
        }
    }
}
