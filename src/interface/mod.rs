use async_trait::async_trait;

use crate::models::player::Player;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("player {0} is unreachable")]
    Unreachable(String),
    #[error("channel send failed: {0}")]
    SendFailed(String),
}

/// Channel-facing side of the chat service. Sends are awaited; callers
/// decide whether a failure is fatal.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, channel: &str, text: &str) -> Result<(), DeliveryError>;

    async fn send_structured(
        &self,
        channel: &str,
        message: serde_json::Value,
    ) -> Result<(), DeliveryError>;
}

/// Asks a single player a question in private and waits for their reply.
/// Requests to different players are independent and may run concurrently.
#[async_trait]
pub trait PrivateRequest: Send + Sync {
    async fn ask(&self, player: &Player, prompt: &str) -> Result<String, DeliveryError>;
}

/// Optional voice ambience. A session without one simply skips the calls.
#[async_trait]
pub trait AmbienceController: Send + Sync {
    async fn start(&self);
    async fn stop(&self);
}

/// Tracks live sessions. `deregister` is called exactly once per session,
/// at every terminal transition, success or abort.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn deregister(&self, session_key: &str);
}
