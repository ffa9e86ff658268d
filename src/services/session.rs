use std::sync::Arc;

use futures::future;
use rand::thread_rng;
use serde_json::json;
use tokio::sync::Mutex;

use crate::interface::{
    AmbienceController, DeliveryError, PrivateRequest, SessionRegistry, Transport,
};
use crate::models::config::{GameConfig, CONFIG};
use crate::models::game_state::GameStateModel;
use crate::models::player::Player;
use crate::models::role::{RoleName, NIGHT_CALL_ORDER};
use crate::models::round_result::{DeathCause, RoundResult, Vote};
use crate::services::assignment::{deal_roles, AssignmentError};
use crate::services::night::{NightContext, NightError, NightOrchestrator, RoleActionSet};
use crate::services::timer::{PhaseTimer, Time, TimerError};
use crate::services::voting::resolve_round;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum GamePhase {
    Setup,
    Night,
    Day,
    Voting,
    Resolution,
    Ended,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid amount of players: got {got}, expected between {min} and {max}")]
    InvalidPlayerCount { got: usize, min: usize, max: usize },
    #[error("game has already started")]
    AlreadyStarted,
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Night(#[from] NightError),
    #[error("could not collect a vote from {player}: {source}")]
    VoteDelivery {
        player: String,
        #[source]
        source: DeliveryError,
    },
    #[error("{player} voted for {reply:?}, which names no player in this game")]
    InvalidVote { player: String, reply: String },
}

/// One full session: Setup -> Night -> Day -> Voting -> Resolution -> Ended,
/// transitions one-directional, no re-entry. The session owns the game
/// state; collaborators only see the published result.
pub struct GameSession {
    key: String,
    players: Vec<Player>,
    chosen_roles: Vec<RoleName>,
    config: GameConfig,
    transport: Arc<dyn Transport>,
    dm: Arc<dyn PrivateRequest>,
    ambience: Option<Arc<dyn AmbienceController>>,
    registry: Arc<dyn SessionRegistry>,
    actions: RoleActionSet,
    timer: PhaseTimer,
    phase: GamePhase,
    started: bool,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("key", &self.key)
            .field("players", &self.players)
            .field("chosen_roles", &self.chosen_roles)
            .field("phase", &self.phase)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: String,
        players: Vec<Player>,
        chosen_roles: Vec<RoleName>,
        actions: RoleActionSet,
        transport: Arc<dyn Transport>,
        dm: Arc<dyn PrivateRequest>,
        ambience: Option<Arc<dyn AmbienceController>>,
        registry: Arc<dyn SessionRegistry>,
        config: Option<GameConfig>,
    ) -> Result<Self, SessionError> {
        let config = config.unwrap_or_else(|| CONFIG.clone());
        if players.len() < config.min_players || players.len() > config.max_players {
            return Err(SessionError::InvalidPlayerCount {
                got: players.len(),
                min: config.min_players,
                max: config.max_players,
            });
        }
        let timer = PhaseTimer::new(config.day_duration, config.warning_offset);
        Ok(Self {
            key,
            players,
            chosen_roles,
            config,
            transport,
            dm,
            ambience,
            registry,
            actions,
            timer,
            phase: GamePhase::Setup,
            started: false,
        })
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Remaining day time, queryable while the day phase runs.
    pub fn remaining_time(&self) -> Result<Time, TimerError> {
        self.timer.remaining()
    }

    fn tag_players_text(&self) -> String {
        self.players
            .iter()
            .map(|p| p.tag.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Best-effort channel announcement. Failures are logged, never
    /// swallowed silently, and never abort the session.
    async fn announce(&self, text: &str) {
        if let Err(err) = self.transport.send(&self.key, text).await {
            tracing::warn!("announcement failed: {}", err);
        }
    }

    /// Drives the session to its terminal state. Exactly one exit path:
    /// an abort reason is published, the phase is set to `Ended`, and the
    /// registry is told to free the slot, once, whatever happened.
    pub async fn run(&mut self) -> Result<RoundResult, SessionError> {
        if self.started {
            // The first run already reached a terminal state and freed the
            // registry slot; do not free it twice.
            return Err(SessionError::AlreadyStarted);
        }
        self.started = true;

        let outcome = self.play().await;

        if let Err(err) = &outcome {
            tracing::warn!("session {} aborted: {}", self.key, err);
            self.announce(&format!("The game has ended early: {}", err))
                .await;
        }
        self.phase = GamePhase::Ended;
        self.registry.deregister(&self.key).await;
        outcome
    }

    async fn play(&mut self) -> Result<RoundResult, SessionError> {
        // Setup
        let roles_text = self
            .chosen_roles
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.announce(&format!(
            "Starting new game with players: {}\nAnd with these roles: {}",
            self.tag_players_text(),
            roles_text
        ))
        .await;

        let state = deal_roles(
            &self.chosen_roles,
            &self.players,
            self.config.table_cards,
            &mut thread_rng(),
        )?;
        let snapshot = state.snapshot();
        let state = Arc::new(Mutex::new(state));

        let night = NightContext::new(
            snapshot.clone(),
            state.clone(),
            self.players.clone(),
            self.dm.clone(),
        );
        let orchestrator =
            NightOrchestrator::new(self.chosen_roles.clone(), self.config.cover_delay);

        // An uninformed player must never reach the night.
        orchestrator.notify_roles(&night).await?;

        if let Some(ambience) = &self.ambience {
            ambience.start().await;
        }
        self.phase = GamePhase::Night;
        let night_outcome = orchestrator.run(&night, &self.actions).await;
        if let Some(ambience) = &self.ambience {
            ambience.stop().await;
        }
        night_outcome?;

        // Day
        self.phase = GamePhase::Day;
        let minutes = self.config.day_duration.as_secs() / 60;
        self.announce(&format!(
            "{}: The night is over! You now have {} minute(s) to figure out what has happened!",
            self.tag_players_text(),
            minutes
        ))
        .await;
        self.announce(&format!("Wakeup order:\n{}", self.wakeup_order_text()))
            .await;

        self.timer.start();
        let warning = format!(
            "{} {} seconds remaining!",
            self.tag_players_text(),
            self.config.warning_offset.as_secs()
        );
        let transport = self.transport.clone();
        let key = self.key.clone();
        let ran = self
            .timer
            .run(
                || async {
                    if let Err(err) = transport.send(&key, &warning).await {
                        tracing::warn!("announcement failed: {}", err);
                    }
                },
                || async {},
            )
            .await;
        if let Err(err) = ran {
            tracing::warn!("day timer did not run: {}", err);
        }

        // Voting
        self.phase = GamePhase::Voting;
        self.announce(&format!(
            "Everybody stop talking! That means you {}\nReply to the DM you just received to vote for who to kill.",
            self.tag_players_text()
        ))
        .await;
        let votes = self.collect_votes().await?;

        // Resolution
        self.phase = GamePhase::Resolution;
        let end_state = state.lock().await;
        let result = resolve_round(&votes, &end_state);
        self.publish_result(&result, &snapshot, &end_state).await;

        Ok(result)
    }

    fn wakeup_order_text(&self) -> String {
        NIGHT_CALL_ORDER
            .iter()
            .filter(|role| self.chosen_roles.contains(role))
            .enumerate()
            .map(|(i, role)| format!("{}: {}", i + 1, role))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Asks every player for their kill target at the same time. There is
    /// no vote timeout: a player who never answers blocks the phase, and an
    /// unreachable player or an unparseable reply ends the session.
    async fn collect_votes(&self) -> Result<Vec<Vote>, SessionError> {
        let options = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}: {}", i + 1, p.name))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("Choose a player to kill:\n{}", options);

        let requests = self.players.iter().map(|player| {
            let prompt = prompt.clone();
            async move {
                let reply = self.dm.ask(player, &prompt).await.map_err(|source| {
                    SessionError::VoteDelivery {
                        player: player.tag.clone(),
                        source,
                    }
                })?;
                let target =
                    self.parse_vote(&reply)
                        .ok_or_else(|| SessionError::InvalidVote {
                            player: player.tag.clone(),
                            reply: reply.clone(),
                        })?;
                Ok(Vote {
                    voter: player.clone(),
                    target,
                })
            }
        });

        future::try_join_all(requests).await
    }

    /// A reply is either a 1-based number from the prompt list or a player
    /// name, case-insensitive.
    fn parse_vote(&self, reply: &str) -> Option<Player> {
        let reply = reply.trim();
        if let Ok(index) = reply.parse::<usize>() {
            if index >= 1 && index <= self.players.len() {
                return Some(self.players[index - 1].clone());
            }
            return None;
        }
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(reply))
            .cloned()
    }

    async fn publish_result(
        &self,
        result: &RoundResult,
        before: &GameStateModel,
        after: &GameStateModel,
    ) {
        let mut overview: Vec<String> = result
            .tally
            .iter()
            .map(|(id, count)| {
                let name = self
                    .players
                    .iter()
                    .find(|p| &p.id == id)
                    .map(|p| p.name.as_str())
                    .unwrap_or("unknown");
                format!("{}: {}", name, count)
            })
            .collect();
        overview.sort();
        self.announce(&format!("Voting overview:\n{}", overview.join("\n")))
            .await;

        if result.deaths.is_empty() {
            self.announce("Nobody dies!").await;
        } else {
            let lynched = result
                .vote_deaths()
                .map(|d| d.player.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.announce(&format!("The following player(s) die:\n{}", lynched))
                .await;
            for death in result.cascade_deaths() {
                if let DeathCause::Retaliation { by } = &death.cause {
                    self.announce(&format!(
                        "Since {} was a hunter, {} also dies.",
                        by.name, death.player.name
                    ))
                    .await;
                }
            }
        }

        self.announce(&format!("This means **team {}** has won!", result.winner))
            .await;
        self.announce(&format!(
            "Results\n**Roles before the night**:\n{}\n\n**Roles after the night**:\n{}",
            before, after
        ))
        .await;

        let payload = json!({
            "message_type": "round_result",
            "session_key": self.key,
            "result": result,
            "timestamp": result.decided_at.to_rfc3339(),
        });
        if let Err(err) = self.transport.send_structured(&self.key, payload).await {
            tracing::warn!("structured result publish failed: {}", err);
        }
    }
}
