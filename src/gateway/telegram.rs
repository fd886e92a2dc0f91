//! Telegram Bot API adapter
//!
//! Long-polls `getUpdates` for inbound events and sends replies over plain
//! HTTPS calls (https://core.telegram.org/bots/api).

use super::{ChatGateway, GatewayError, InboundEvent, UpdateSource};
use crate::state_machine::state::UserId;
use crate::state_machine::{ButtonAction, Event, Keyboard};
use crate::texts;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Longest caption Telegram accepts on a photo
pub const CAPTION_LIMIT: usize = 1024;
/// Longest text Telegram accepts in one message
pub const MESSAGE_LIMIT: usize = 4096;

/// Extra time on top of the long-poll timeout before the HTTP call gives up
const POLL_GRACE: Duration = Duration::from_secs(10);

const REPORT_FILE_NAME: &str = "report.png";

/// Telegram gateway over the Bot API
pub struct TelegramGateway {
    client: Client,
    bot_token: String,
    poll_timeout: Duration,
    /// Next update id to request
    offset: AtomicI64,
}

impl TelegramGateway {
    pub fn new(bot_token: impl Into<String>, poll_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            bot_token: bot_token.into(),
            poll_timeout,
            offset: AtomicI64::new(0),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.bot_token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        request: RequestBuilder,
    ) -> Result<T, GatewayError> {
        let resp: TelegramResponse<T> = request.send().await?.json().await?;
        if !resp.ok {
            return Err(GatewayError::Api {
                method: method.to_string(),
                description: resp.description.unwrap_or_else(|| "unknown".into()),
            });
        }
        resp.result.ok_or_else(|| GatewayError::Api {
            method: method.to_string(),
            description: "response carried no result".into(),
        })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, GatewayError> {
        let request = self.client.post(self.api_url(method)).json(body);
        self.call(method, request).await
    }

    /// Drop any webhook and the updates queued while the bot was down
    pub async fn delete_webhook(&self) -> Result<(), GatewayError> {
        let _: bool = self
            .post_json("deleteWebhook", &json!({ "drop_pending_updates": true }))
            .await?;
        tracing::info!("Webhook removed, pending updates dropped");
        Ok(())
    }

    async fn send_message(
        &self,
        user_id: UserId,
        text: &str,
        markup: Option<Value>,
    ) -> Result<(), GatewayError> {
        let mut body = json!({
            "chat_id": user_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = markup {
            body["reply_markup"] = markup;
        }
        let _: Value = self.post_json("sendMessage", &body).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        user_id: UserId,
        image: Vec<u8>,
        caption: &str,
    ) -> Result<(), GatewayError> {
        let photo = Part::bytes(image)
            .file_name(REPORT_FILE_NAME)
            .mime_str("image/png")?;
        let form = Form::new()
            .text("chat_id", user_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part("photo", photo);
        let request = self.client.post(self.api_url("sendPhoto")).multipart(form);
        let _: Value = self.call("sendPhoto", request).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn send_text(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), GatewayError> {
        let chunks = split_message(text, MESSAGE_LIMIT);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            // The keyboard goes with the final chunk
            let markup = if i == last {
                keyboard.map(keyboard_markup)
            } else {
                None
            };
            self.send_message(user_id, chunk, markup).await?;
        }
        Ok(())
    }

    async fn send_image(
        &self,
        user_id: UserId,
        image: Vec<u8>,
        caption: &str,
    ) -> Result<(), GatewayError> {
        if caption.chars().count() <= CAPTION_LIMIT {
            return self.send_photo(user_id, image, caption).await;
        }

        tracing::debug!(user_id, len = caption.len(), "Caption too long, sending separately");
        self.send_photo(user_id, image, texts::REPORT_TITLE_CAPTION).await?;
        self.send_text(user_id, caption, None).await
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), GatewayError> {
        let _: bool = self
            .post_json(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramGateway {
    async fn next_batch(&self) -> Result<Option<Vec<InboundEvent>>, GatewayError> {
        let body = json!({
            "offset": self.offset.load(Ordering::SeqCst),
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let request = self
            .client
            .post(self.api_url("getUpdates"))
            .timeout(self.poll_timeout + POLL_GRACE)
            .json(&body);
        let updates: Vec<TgUpdate> = self.call("getUpdates", request).await?;

        let mut events = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset.fetch_max(update.update_id + 1, Ordering::SeqCst);
            match parse_update(update) {
                ParsedUpdate::Event(event) => events.push(event),
                ParsedUpdate::UnknownCallback { callback_id, data } => {
                    tracing::debug!(data = %data, "Ignoring unknown callback payload");
                    if let Err(e) = self.acknowledge(&callback_id).await {
                        tracing::warn!(error = %e, "Failed to acknowledge callback");
                    }
                }
                ParsedUpdate::Ignored => {}
            }
        }
        Ok(Some(events))
    }
}

// -- Telegram API types --

#[derive(Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    from: TgUser,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    first_name: String,
    last_name: Option<String>,
}

impl TgUser {
    fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug)]
enum ParsedUpdate {
    Event(InboundEvent),
    /// Callback whose payload matches no button; still needs an answer
    UnknownCallback { callback_id: String, data: String },
    Ignored,
}

fn parse_update(update: TgUpdate) -> ParsedUpdate {
    if let Some(query) = update.callback_query {
        let data = query.data.unwrap_or_default();
        return match ButtonAction::from_payload(&data) {
            Some(action) => ParsedUpdate::Event(InboundEvent {
                user_id: query.from.id,
                event: Event::Button(action),
                callback_id: Some(query.id),
            }),
            None => ParsedUpdate::UnknownCallback {
                callback_id: query.id,
                data,
            },
        };
    }

    let Some(TgMessage {
        from: Some(from),
        text: Some(text),
    }) = update.message
    else {
        return ParsedUpdate::Ignored;
    };

    let event = if is_start_command(&text) {
        Event::Start {
            display_name: from.full_name(),
        }
    } else {
        Event::Text { text }
    };
    ParsedUpdate::Event(InboundEvent {
        user_id: from.id,
        event,
        callback_id: None,
    })
}

/// `/start`, `/start@SomeBot`, optionally followed by arguments
fn is_start_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or_default();
    let command = command.split_once('@').map_or(command, |(name, _)| name);
    command == "/start"
}

fn keyboard_markup(keyboard: Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|button| {
                    json!({
                        "text": button.label,
                        "callback_data": button.action.payload(),
                    })
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Split text into chunks of at most `limit` characters, preferring line
/// boundaries. Always returns at least one chunk.
fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
