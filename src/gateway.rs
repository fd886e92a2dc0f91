//! Chat gateway contract
//!
//! The session runtime never performs transport I/O itself. It returns
//! `GatewayAction`s, and the serving loop hands them to a `ChatGateway`.

pub mod telegram;

use crate::state_machine::state::UserId;
use crate::state_machine::{Event, Keyboard};
use async_trait::async_trait;
use thiserror::Error;

/// Outgoing action produced by a session
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayAction {
    SendText {
        user_id: UserId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    SendImage {
        user_id: UserId,
        /// Encoded PNG
        image: Vec<u8>,
        caption: String,
    },
}

/// Event received from the transport, tagged with its sender
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub event: Event,
    /// Set for button presses, which must be acknowledged
    pub callback_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} failed: {description}")]
    Api { method: String, description: String },
}

/// Outbound side of the transport
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send an HTML-formatted message with an optional inline keyboard
    async fn send_text(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), GatewayError>;

    /// Send an image attachment with an HTML caption
    async fn send_image(
        &self,
        user_id: UserId,
        image: Vec<u8>,
        caption: &str,
    ) -> Result<(), GatewayError>;

    /// Acknowledge a button press
    async fn acknowledge(&self, callback_id: &str) -> Result<(), GatewayError>;
}

/// Inbound side of the transport
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Wait for the next batch of events. An empty batch is a timeout,
    /// `None` means the source is closed.
    async fn next_batch(&self) -> Result<Option<Vec<InboundEvent>>, GatewayError>;
}

/// Perform a single action against the gateway
pub async fn deliver<G: ChatGateway + ?Sized>(
    gateway: &G,
    action: GatewayAction,
) -> Result<(), GatewayError> {
    match action {
        GatewayAction::SendText {
            user_id,
            text,
            keyboard,
        } => gateway.send_text(user_id, &text, keyboard).await,
        GatewayAction::SendImage {
            user_id,
            image,
            caption,
        } => gateway.send_image(user_id, image, &caption).await,
    }
}
