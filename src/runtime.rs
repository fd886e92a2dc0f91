//! Runtime for serving sessions
//!
//! One `SessionRuntime` per authorized user, created on first contact and
//! kept for the life of the process. Events for the same user are handled
//! strictly in arrival order.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::catalog::{Catalog, ProductCatalog};
use crate::gateway::{deliver, ChatGateway, GatewayAction, InboundEvent, UpdateSource};
use crate::report::ReportRenderer;
use crate::state_machine::state::UserId;
use crate::state_machine::{transition, Effect, Event, SessionContext, SessionState};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Type alias for the production manager over the SQLite catalog
pub type ProductionManager = SessionManager<Catalog>;

/// Pause after a failed poll before trying again
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Manager for all session runtimes
pub struct SessionManager<C: ProductCatalog> {
    catalog: Arc<C>,
    renderer: Arc<ReportRenderer>,
    admins: HashSet<UserId>,
    sessions: RwLock<HashMap<UserId, Arc<Mutex<SessionRuntime<C>>>>>,
}

impl<C: ProductCatalog> SessionManager<C> {
    pub fn new(catalog: Arc<C>, renderer: Arc<ReportRenderer>, admins: HashSet<UserId>) -> Self {
        Self {
            catalog,
            renderer,
            admins,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_authorized(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }

    /// Handle one event from `user_id`, returning what to send back
    pub async fn handle_event(&self, user_id: UserId, event: Event) -> Vec<GatewayAction> {
        if !self.is_authorized(user_id) {
            return Self::handle_unauthorized(user_id, event);
        }

        let session = self.get_or_create(user_id).await;
        let mut session = session.lock().await;
        session.handle_event(event)
    }

    /// Strangers only ever get the start refusal, and no session is kept
    fn handle_unauthorized(user_id: UserId, event: Event) -> Vec<GatewayAction> {
        if !matches!(event, Event::Start { .. }) {
            tracing::debug!(user_id, event = event.name(), "Dropping event from unauthorized user");
            return Vec::new();
        }

        tracing::info!(user_id, "Refusing unauthorized user");
        let context = SessionContext::new(user_id, false);
        match transition(&SessionState::Idle, &context, event) {
            Ok(result) => result
                .effects
                .into_iter()
                .filter_map(|effect| match effect {
                    Effect::Reply { text, keyboard } => {
                        Some(GatewayAction::SendText {
                            user_id,
                            text,
                            keyboard,
                        })
                    }
                    _ => None,
                })
                .collect(),
            Err(e) => {
                tracing::debug!(user_id, error = %e, "Ignoring event");
                Vec::new()
            }
        }
    }

    async fn get_or_create(&self, user_id: UserId) -> Arc<Mutex<SessionRuntime<C>>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(&user_id) {
                return Arc::clone(session);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Double-check after acquiring write lock
        Arc::clone(sessions.entry(user_id).or_insert_with(|| {
            tracing::info!(user_id, "Creating session");
            Arc::new(Mutex::new(SessionRuntime::new(
                SessionContext::new(user_id, true),
                Arc::clone(&self.catalog),
                Arc::clone(&self.renderer),
            )))
        }))
    }

    /// Current state of a user's session, if one exists
    #[allow(dead_code)] // Used by tests
    pub async fn session_state(&self, user_id: UserId) -> Option<SessionState> {
        let session = self.sessions.read().await.get(&user_id).cloned()?;
        let state = session.lock().await.state().clone();
        Some(state)
    }

    #[allow(dead_code)] // Used by tests
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Handle one inbound event end to end: acknowledge, transition, deliver.
///
/// Delivery failures are logged and never stop the loop.
pub async fn dispatch<C, G>(manager: &SessionManager<C>, gateway: &G, inbound: InboundEvent)
where
    C: ProductCatalog,
    G: ChatGateway + ?Sized,
{
    let InboundEvent {
        user_id,
        event,
        callback_id,
    } = inbound;

    if let Some(callback_id) = callback_id {
        if let Err(e) = gateway.acknowledge(&callback_id).await {
            tracing::warn!(user_id, error = %e, "Failed to acknowledge callback");
        }
    }

    for action in manager.handle_event(user_id, event).await {
        if let Err(e) = deliver(gateway, action).await {
            tracing::error!(user_id, error = %e, "Failed to deliver message");
        }
    }
}

/// Pull events from `source` and serve them until the source closes.
///
/// Batches are handled in order, one event at a time. A failed poll is
/// logged and retried after a short pause.
pub async fn serve<C, S, G>(manager: &SessionManager<C>, source: &S, gateway: &G)
where
    C: ProductCatalog,
    S: UpdateSource + ?Sized,
    G: ChatGateway + ?Sized,
{
    tracing::info!("Serving updates");
    loop {
        let batch = match source.next_batch().await {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Polling for updates failed");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for inbound in batch {
            dispatch(manager, gateway, inbound).await;
        }
    }
    tracing::info!("Update source closed");
}
