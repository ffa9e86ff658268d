use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use futures::future;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::interface::{DeliveryError, PrivateRequest};
use crate::models::game_state::GameStateModel;
use crate::models::player::Player;
use crate::models::role::{RoleName, NIGHT_CALL_ORDER};

#[derive(Debug, thiserror::Error)]
pub enum NightError {
    #[error("could not deliver a role notification to: {0}")]
    UnreachablePlayers(String),
    #[error("no action registered for role {0}")]
    MissingAction(RoleName),
    #[error("the {role} turn failed: {source}")]
    TurnFailed {
        role: RoleName,
        #[source]
        source: anyhow::Error,
    },
}

/// A single role's night turn. Implementations may read and mutate the live
/// state through the context and converse with the acting player in
/// private; they run concurrently with the other holders of the same role.
#[async_trait]
pub trait RoleAction: Send + Sync {
    async fn run(&self, night: &NightContext, actor: &Player) -> anyhow::Result<()>;
}

/// Enum-indexed registry of turn actions, one slot per role.
#[derive(Clone, Default)]
pub struct RoleActionSet {
    actions: [Option<Arc<dyn RoleAction>>; RoleName::COUNT],
}

impl RoleActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, role: RoleName, action: Arc<dyn RoleAction>) {
        self.actions[role.index()] = Some(action);
    }

    pub fn get(&self, role: RoleName) -> Option<Arc<dyn RoleAction>> {
        self.actions[role.index()].clone()
    }
}

/// A pending role adoption: `player` left `source` behind and will act in
/// `target`'s step later the same night. At most one may exist per night.
#[derive(Clone, Debug)]
pub struct RoleSwitch {
    pub source: RoleName,
    pub target: RoleName,
    pub player: Player,
}

/// Shared view handed to role actions while the night runs. The snapshot is
/// frozen at night start; the live state is what the actions mutate.
pub struct NightContext {
    pub snapshot: GameStateModel,
    pub state: Arc<Mutex<GameStateModel>>,
    pub players: Vec<Player>,
    dm: Arc<dyn PrivateRequest>,
    switch: Mutex<Option<RoleSwitch>>,
}

impl NightContext {
    pub fn new(
        snapshot: GameStateModel,
        state: Arc<Mutex<GameStateModel>>,
        players: Vec<Player>,
        dm: Arc<dyn PrivateRequest>,
    ) -> Self {
        Self {
            snapshot,
            state,
            players,
            dm,
            switch: Mutex::new(None),
        }
    }

    pub async fn ask(&self, player: &Player, prompt: &str) -> Result<String, DeliveryError> {
        self.dm.ask(player, prompt).await
    }

    /// Records the one allowed role adoption of the night and moves the
    /// player in the live state. A second write is a rule violation and
    /// fails the calling turn.
    pub async fn record_switch(
        &self,
        source: RoleName,
        target: RoleName,
        player: Player,
    ) -> anyhow::Result<()> {
        let mut slot = self.switch.lock().await;
        if let Some(existing) = slot.as_ref() {
            bail!(
                "a role switch to {} is already pending, cannot also switch to {}",
                existing.target,
                target
            );
        }
        self.state.lock().await.adopt_role(&player.id, source, target);
        *slot = Some(RoleSwitch {
            source,
            target,
            player,
        });
        Ok(())
    }

    pub async fn pending_switch(&self) -> Option<RoleSwitch> {
        self.switch.lock().await.clone()
    }
}

/// Drives the fixed call order over one night. Holders are taken from the
/// snapshot so that mid-night swaps do not re-trigger turns.
pub struct NightOrchestrator {
    requested: Vec<RoleName>,
    cover_delay: Duration,
}

impl NightOrchestrator {
    pub fn new(requested: Vec<RoleName>, cover_delay: Duration) -> Self {
        Self {
            requested,
            cover_delay,
        }
    }

    /// Tells every player their starting role, all sends in flight at once.
    /// Any unreachable player is fatal: the night must not start while
    /// someone does not know their role, and the whole set of failures is
    /// reported so the caller can name them.
    pub async fn notify_roles(&self, night: &NightContext) -> Result<(), NightError> {
        let sends = night.players.iter().map(|player| async {
            let role = night
                .snapshot
                .role_of(&player.id)
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let text = format!(
                "Welcome to a new game of One Night!\n\
                 You have the role **{}**.\nYou fall deeply asleep.",
                role
            );
            night.ask(player, &text).await.map(|_| ())
        });

        let results = future::join_all(sends).await;
        let unreachable: Vec<String> = results
            .iter()
            .zip(&night.players)
            .filter(|(result, _)| result.is_err())
            .map(|(_, player)| player.tag.clone())
            .collect();

        if unreachable.is_empty() {
            Ok(())
        } else {
            Err(NightError::UnreachablePlayers(unreachable.join(", ")))
        }
    }

    /// Runs the night: every call-order role exactly once, in order. All
    /// holders of the current role act concurrently and are joined before
    /// the next step; the first failing turn aborts the rest of the night.
    pub async fn run(&self, night: &NightContext, actions: &RoleActionSet) -> Result<(), NightError> {
        for role in NIGHT_CALL_ORDER {
            let mut actors: Vec<Player> = night.snapshot.players_with(role).to_vec();

            // A switched player acts in the adopted role's step, with the
            // adopted role's action.
            if let Some(switch) = night.pending_switch().await {
                if switch.target == role && role.is_mimic() {
                    actors.push(switch.player.clone());
                }
            }

            if !actors.is_empty() {
                let action = actions.get(role).ok_or(NightError::MissingAction(role))?;
                tracing::info!("running {} turn for {} player(s)", role, actors.len());
                let turns = actors.iter().map(|actor| action.run(night, actor));
                future::try_join_all(turns)
                    .await
                    .map_err(|source| NightError::TurnFailed { role, source })?;
            } else if self.requested.contains(&role) {
                tracing::info!("faking {} because it is a table role", role);
                sleep(self.cover_delay).await;
            }
        }
        tracing::info!("night over");
        Ok(())
    }
}
