//! Mock implementations for testing
//!
//! These mocks enable serving-loop tests without a live Telegram bot.

use crate::catalog::{
    Catalog, CatalogError, CatalogResult, LocalizedName, ProductCatalog, ProductRecord,
};
use crate::gateway::{ChatGateway, GatewayError, InboundEvent, UpdateSource};
use crate::state_machine::state::UserId;
use crate::state_machine::Keyboard;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// Catalog fixtures
// ============================================================================

pub fn product(code: &str, price: f64, points: f64) -> ProductRecord {
    ProductRecord {
        code: code.to_string(),
        category: "parfum".to_string(),
        name: LocalizedName {
            ru: format!("{code} ru"),
            en: format!("{code} en"),
        },
        internal_price: price,
        external_price: price * 1.2,
        points,
        volume: None,
    }
}

/// In-memory SQLite catalog preloaded with `products`
pub fn catalog_with(products: &[ProductRecord]) -> Catalog {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.load(products).unwrap();
    catalog
}

/// Catalog whose records can disappear mid-session
#[derive(Default)]
pub struct MutableCatalog {
    products: Mutex<HashMap<String, ProductRecord>>,
}

impl MutableCatalog {
    pub fn with(products: &[ProductRecord]) -> Self {
        let catalog = Self::default();
        for p in products {
            catalog
                .products
                .lock()
                .unwrap()
                .insert(p.code.clone(), p.clone());
        }
        catalog
    }

    pub fn remove(&self, code: &str) {
        self.products.lock().unwrap().remove(code);
    }
}

impl ProductCatalog for MutableCatalog {
    fn get_product(&self, code: &str) -> CatalogResult<ProductRecord> {
        self.products
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| CatalogError::ProductNotFound(code.to_string()))
    }
}

// ============================================================================
// Mock Gateway
// ============================================================================

/// Everything the bot sent, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        user_id: UserId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Image {
        user_id: UserId,
        image: Vec<u8>,
        caption: String,
    },
    Ack(String),
}

/// Gateway that records deliveries instead of sending them
#[derive(Default)]
pub struct MockGateway {
    sent: Mutex<Vec<Sent>>,
    /// When set, every send fails after being recorded
    fail_sends: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.fail_sends.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn images(&self) -> Vec<(Vec<u8>, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Image { image, caption, .. } => Some((image, caption)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(sent);
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                method: "mock".to_string(),
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn send_text(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), GatewayError> {
        self.record(Sent::Text {
            user_id,
            text: text.to_string(),
            keyboard,
        })
    }

    async fn send_image(
        &self,
        user_id: UserId,
        image: Vec<u8>,
        caption: &str,
    ) -> Result<(), GatewayError> {
        self.record(Sent::Image {
            user_id,
            image,
            caption: caption.to_string(),
        })
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Ack(callback_id.to_string()));
        Ok(())
    }
}

// ============================================================================
// Scripted Update Source
// ============================================================================

/// Update source that replays queued batches, then closes
#[derive(Default)]
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Vec<InboundEvent>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(self, batch: Vec<InboundEvent>) -> Self {
        self.batches.lock().unwrap().push_back(batch);
        self
    }
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn next_batch(&self) -> Result<Option<Vec<InboundEvent>>, GatewayError> {
        Ok(self.batches.lock().unwrap().pop_front())
    }
}

// ============================================================================
// Serving loop tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportRenderer;
    use crate::runtime::{serve, SessionManager};
    use crate::state_machine::state::Quantity;
    use crate::state_machine::{ButtonAction, Event, SessionState};
    use crate::texts;
    use std::collections::HashSet;
    use std::sync::Arc;

    const ADMIN: UserId = 1;

    fn manager<C: ProductCatalog>(catalog: Arc<C>) -> SessionManager<C> {
        SessionManager::new(
            catalog,
            Arc::new(ReportRenderer::builtin()),
            HashSet::from([ADMIN]),
        )
    }

    fn message(user_id: UserId, text: &str) -> InboundEvent {
        InboundEvent {
            user_id,
            event: Event::Text {
                text: text.to_string(),
            },
            callback_id: None,
        }
    }

    fn start(user_id: UserId) -> InboundEvent {
        InboundEvent {
            user_id,
            event: Event::Start {
                display_name: "Aziz Karimov".to_string(),
            },
            callback_id: None,
        }
    }

    fn press(user_id: UserId, action: ButtonAction, callback_id: &str) -> InboundEvent {
        InboundEvent {
            user_id,
            event: Event::Button(action),
            callback_id: Some(callback_id.to_string()),
        }
    }

    fn qty(n: u8) -> ButtonAction {
        ButtonAction::Quantity(Quantity::new(n).unwrap())
    }

    /// Build a report for Aziz with A1 x3 and A1 x2
    fn aziz_report_batch() -> Vec<InboundEvent> {
        vec![
            start(ADMIN),
            press(ADMIN, ButtonAction::AddSale, "cb-1"),
            message(ADMIN, "Aziz"),
            message(ADMIN, "A1"),
            press(ADMIN, qty(3), "cb-2"),
            message(ADMIN, "A1"),
            press(ADMIN, qty(2), "cb-3"),
            press(ADMIN, ButtonAction::Finish, "cb-4"),
        ]
    }

    #[tokio::test]
    async fn test_full_report_over_gateway() {
        let manager = manager(Arc::new(catalog_with(&[product("A1", 1000.0, 5.0)])));
        let source = ScriptedSource::new().with_batch(aziz_report_batch());
        let gateway = MockGateway::new();

        serve(&manager, &source, &gateway).await;

        let images = gateway.images();
        assert_eq!(images.len(), 1);
        let (image, caption) = &images[0];
        assert!(image.starts_with(b"\x89PNG"));
        assert!(caption.starts_with("Sotuvchi: <b>Aziz</b>\n"));
        assert_eq!(caption.matches("🔹 (A1)").count(), 2);
        assert!(caption.contains("<b>Jami Tushum:</b> 5,000 so'm"));
        assert!(caption.contains("<b>Jami Ball:</b> 25.0"));

        let replies = gateway.texts();
        assert_eq!(
            replies.first().map(String::as_str),
            Some("Assalomu alaykum, <b>Aziz Karimov</b>!")
        );
        assert_eq!(replies.last().map(String::as_str), Some(texts::REPORT_DONE));
        assert_eq!(manager.session_state(ADMIN).await, Some(SessionState::Idle));
    }

    #[tokio::test]
    async fn test_callbacks_are_acknowledged_before_replies() {
        let manager = manager(Arc::new(catalog_with(&[])));
        let source =
            ScriptedSource::new().with_batch(vec![press(ADMIN, ButtonAction::ViewProduct, "cb-9")]);
        let gateway = MockGateway::new();

        serve(&manager, &source, &gateway).await;

        assert_eq!(
            gateway.sent(),
            vec![
                Sent::Ack("cb-9".to_string()),
                Sent::Text {
                    user_id: ADMIN,
                    text: texts::ASK_PRODUCT_CODE.to_string(),
                    keyboard: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_code_in_view_over_gateway() {
        let manager = manager(Arc::new(catalog_with(&[product("A1", 1000.0, 5.0)])));
        let source = ScriptedSource::new().with_batch(vec![
            press(ADMIN, ButtonAction::ViewProduct, "cb-1"),
            message(ADMIN, "ZZ9"),
        ]);
        let gateway = MockGateway::new();

        serve(&manager, &source, &gateway).await;

        assert_eq!(gateway.texts().last().map(String::as_str), Some(texts::PRODUCT_NOT_FOUND));
        assert_eq!(manager.session_state(ADMIN).await, Some(SessionState::Idle));
    }

    #[tokio::test]
    async fn test_finish_with_no_items_sends_no_image() {
        let manager = manager(Arc::new(catalog_with(&[])));
        let source = ScriptedSource::new().with_batch(vec![
            press(ADMIN, ButtonAction::AddSale, "cb-1"),
            message(ADMIN, "Aziz"),
            press(ADMIN, ButtonAction::Finish, "cb-2"),
        ]);
        let gateway = MockGateway::new();

        serve(&manager, &source, &gateway).await;

        assert!(gateway.images().is_empty());
        assert_eq!(gateway.texts().last().map(String::as_str), Some(texts::NOTHING_ADDED));
        assert_eq!(manager.session_state(ADMIN).await, Some(SessionState::Idle));
    }

    #[tokio::test]
    async fn test_catalog_change_mid_session_fails_report() {
        let catalog = Arc::new(MutableCatalog::with(&[product("A1", 1000.0, 5.0)]));
        let manager = manager(Arc::clone(&catalog));
        let gateway = MockGateway::new();

        let building = ScriptedSource::new().with_batch(vec![
            press(ADMIN, ButtonAction::AddSale, "cb-1"),
            message(ADMIN, "Aziz"),
            message(ADMIN, "A1"),
            press(ADMIN, qty(1), "cb-2"),
        ]);
        serve(&manager, &building, &gateway).await;

        catalog.remove("A1");
        let finishing =
            ScriptedSource::new().with_batch(vec![press(ADMIN, ButtonAction::Finish, "cb-3")]);
        serve(&manager, &finishing, &gateway).await;

        assert!(gateway.images().is_empty());
        let last = gateway.texts().pop().unwrap();
        assert!(last.starts_with("❌ Hisobotni yaratib bo'lmadi"));
        assert!(last.contains("A1"));
        assert_eq!(manager.session_state(ADMIN).await, Some(SessionState::Idle));
    }

    #[tokio::test]
    async fn test_unauthorized_user_gets_refusal_only() {
        let manager = manager(Arc::new(catalog_with(&[product("A1", 1000.0, 5.0)])));
        let source = ScriptedSource::new().with_batch(vec![
            start(99),
            press(99, ButtonAction::AddSale, "cb-1"),
            message(99, "A1"),
        ]);
        let gateway = MockGateway::new();

        serve(&manager, &source, &gateway).await;

        assert_eq!(
            gateway.sent(),
            vec![
                Sent::Text {
                    user_id: 99,
                    text: texts::ADMIN_ONLY.to_string(),
                    keyboard: None,
                },
                Sent::Ack("cb-1".to_string()),
            ]
        );
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_delivery_failures_do_not_stop_serving() {
        let manager = manager(Arc::new(catalog_with(&[product("A1", 1000.0, 5.0)])));
        let source = ScriptedSource::new()
            .with_batch(vec![start(ADMIN)])
            .with_batch(vec![press(ADMIN, ButtonAction::AddSale, "cb-1")]);
        let gateway = MockGateway::failing();

        serve(&manager, &source, &gateway).await;

        assert_eq!(gateway.texts().len(), 2);
        assert_eq!(
            manager.session_state(ADMIN).await,
            Some(SessionState::AwaitingSalespersonName)
        );
    }

    #[tokio::test]
    async fn test_sessions_of_different_users_are_isolated() {
        let manager = SessionManager::new(
            Arc::new(catalog_with(&[product("A1", 1000.0, 5.0)])),
            Arc::new(ReportRenderer::builtin()),
            HashSet::from([1, 2]),
        );
        let source = ScriptedSource::new().with_batch(vec![
            press(1, ButtonAction::AddSale, "cb-1"),
            press(2, ButtonAction::AddSale, "cb-2"),
            message(1, "Aziz"),
            message(2, "Dilnoza"),
            message(1, "A1"),
            press(1, qty(4), "cb-3"),
        ]);
        let gateway = MockGateway::new();

        serve(&manager, &source, &gateway).await;

        let one = manager.session_state(1).await.unwrap();
        let two = manager.session_state(2).await.unwrap();
        assert_eq!(one.line_items().len(), 1);
        assert!(two.line_items().is_empty());
        assert!(matches!(
            two,
            SessionState::AwaitingCode { salesperson_name, .. } if salesperson_name == "Dilnoza"
        ));
    }
}
