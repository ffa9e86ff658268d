//! Shared fakes and environment setup for the test suites.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Once;

use async_trait::async_trait;
use dotenvy::dotenv;
use tokio::sync::Mutex;

use crate::interface::{
    AmbienceController, DeliveryError, PrivateRequest, SessionRegistry, Transport,
};
use crate::models::player::Player;
use crate::models::role::RoleName;
use crate::services::night::{NightContext, RoleAction};

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        tracing_subscriber::fmt()
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_players(n: usize) -> Vec<Player> {
    (1..=n)
        .map(|i| Player::new(i.to_string(), format!("Player{}", i), format!("<@{}>", i)))
        .collect()
}

/// Captures everything sent to the channel.
#[derive(Default)]
pub struct RecordingTransport {
    pub messages: Mutex<Vec<String>>,
    pub structured: Mutex<Vec<serde_json::Value>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .await
            .iter()
            .any(|m| m.contains(needle))
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, _channel: &str, text: &str) -> Result<(), DeliveryError> {
        self.messages.lock().await.push(text.to_string());
        Ok(())
    }

    async fn send_structured(
        &self,
        _channel: &str,
        message: serde_json::Value,
    ) -> Result<(), DeliveryError> {
        self.structured.lock().await.push(message);
        Ok(())
    }
}

/// Scripted private messaging: per-player reply queues, with an optional
/// set of unreachable player ids. Players without a scripted reply answer
/// "ok", which is enough for acknowledgement prompts.
#[derive(Default)]
pub struct ScriptedDm {
    replies: Mutex<HashMap<String, VecDeque<String>>>,
    unreachable: HashSet<String>,
    pub prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedDm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(players: &[&str]) -> Self {
        Self {
            unreachable: players.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub async fn script_reply(&self, player_id: &str, reply: &str) {
        self.replies
            .lock()
            .await
            .entry(player_id.to_string())
            .or_default()
            .push_back(reply.to_string());
    }
}

#[async_trait]
impl PrivateRequest for ScriptedDm {
    async fn ask(&self, player: &Player, prompt: &str) -> Result<String, DeliveryError> {
        if self.unreachable.contains(&player.id) {
            return Err(DeliveryError::Unreachable(player.tag.clone()));
        }
        self.prompts
            .lock()
            .await
            .push((player.id.clone(), prompt.to_string()));
        let reply = self
            .replies
            .lock()
            .await
            .get_mut(&player.id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| "ok".to_string());
        Ok(reply)
    }
}

/// Counts terminal deregistrations, so tests can assert exactly-once.
#[derive(Default)]
pub struct CountingRegistry {
    pub deregistered: Mutex<Vec<String>>,
}

impl CountingRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRegistry for CountingRegistry {
    async fn deregister(&self, session_key: &str) {
        self.deregistered.lock().await.push(session_key.to_string());
    }
}

#[derive(Default)]
pub struct FakeAmbience {
    pub starts: Mutex<usize>,
    pub stops: Mutex<usize>,
}

#[async_trait]
impl AmbienceController for FakeAmbience {
    async fn start(&self) {
        *self.starts.lock().await += 1;
    }

    async fn stop(&self) {
        *self.stops.lock().await += 1;
    }
}

/// Turn action that records which (role, player) pairs acted, in order.
pub struct RecordingAction {
    pub role: RoleName,
    pub log: std::sync::Arc<Mutex<Vec<(RoleName, String)>>>,
}

#[async_trait]
impl RoleAction for RecordingAction {
    async fn run(&self, _night: &NightContext, actor: &Player) -> anyhow::Result<()> {
        self.log.lock().await.push((self.role, actor.id.clone()));
        Ok(())
    }
}

pub struct NoopAction;

#[async_trait]
impl RoleAction for NoopAction {
    async fn run(&self, _night: &NightContext, _actor: &Player) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct FailingAction;

#[async_trait]
impl RoleAction for FailingAction {
    async fn run(&self, _night: &NightContext, actor: &Player) -> anyhow::Result<()> {
        anyhow::bail!("{} dropped their card", actor.name)
    }
}

/// Doppelganger-style action: adopts `target` for the acting player.
pub struct SwitchAction {
    pub source: RoleName,
    pub target: RoleName,
}

#[async_trait]
impl RoleAction for SwitchAction {
    async fn run(&self, night: &NightContext, actor: &Player) -> anyhow::Result<()> {
        night
            .record_switch(self.source, self.target, actor.clone())
            .await
    }
}
