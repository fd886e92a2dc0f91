//! Pure state transition function

use super::effect::Keyboard;
use super::event::ButtonAction;
use super::state::{PendingProduct, SaleLineItem};
use super::{Effect, Event, SessionContext, SessionState};
use crate::texts;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("No transition for {event} in state {state}")]
    Unhandled {
        state: &'static str,
        event: &'static str,
    },
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. Catalog
/// lookups and report delivery are requested through effects and their
/// outcomes come back as events.
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Entry points, accepted in every state
        // ============================================================

        // Start resets the session and checks the allow-list
        (_, Event::Start { display_name }) => {
            let reply = if context.authorized {
                Effect::reply_with(texts::greeting(&display_name), Keyboard::MainMenu)
            } else {
                Effect::reply(texts::ADMIN_ONLY)
            };
            Ok(TransitionResult::new(SessionState::Idle).with_effect(reply))
        }

        (_, Event::Button(ButtonAction::MainMenu)) => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::reply_with(texts::MAIN_MENU, Keyboard::MainMenu))),

        (_, Event::Button(ButtonAction::ViewProduct)) => {
            Ok(TransitionResult::new(SessionState::ViewingProduct)
                .with_effect(Effect::reply(texts::ASK_PRODUCT_CODE)))
        }

        (_, Event::Button(ButtonAction::AddSale)) => {
            Ok(TransitionResult::new(SessionState::AwaitingSalespersonName)
                .with_effect(Effect::reply(texts::ASK_SALESPERSON_NAME)))
        }

        // A broken catalog ends whatever dialog asked for the lookup
        (_, Event::LookupFailed { reason }) => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::reply_with(texts::lookup_failed(&reason), Keyboard::MainMenu))),

        // ============================================================
        // View-product dialog (single shot)
        // ============================================================
        (SessionState::ViewingProduct, Event::Text { text }) => {
            let code = text.trim();
            if code.is_empty() {
                return Ok(TransitionResult::new(state.clone())
                    .with_effect(Effect::reply(texts::EMPTY_INPUT)));
            }
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::lookup(code)))
        }

        (SessionState::ViewingProduct, Event::ProductFound { product }) => {
            Ok(TransitionResult::new(SessionState::Idle).with_effect(Effect::reply_with(
                texts::product_details(&product),
                Keyboard::MainMenu,
            )))
        }

        (SessionState::ViewingProduct, Event::ProductNotFound { .. }) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::reply_with(texts::PRODUCT_NOT_FOUND, Keyboard::MainMenu)))
        }

        // ============================================================
        // Build-report dialog
        // ============================================================
        (SessionState::AwaitingSalespersonName, Event::Text { text }) => {
            let name = text.trim();
            if name.is_empty() {
                return Ok(TransitionResult::new(state.clone())
                    .with_effect(Effect::reply(texts::EMPTY_INPUT)));
            }
            Ok(TransitionResult::new(SessionState::AwaitingCode {
                salesperson_name: name.to_string(),
                line_items: vec![],
            })
            .with_effect(Effect::reply_with(texts::ASK_FIRST_CODE, Keyboard::Finish)))
        }

        (SessionState::AwaitingCode { .. }, Event::Text { text }) => {
            let code = text.trim();
            if code.is_empty() {
                return Ok(TransitionResult::new(state.clone())
                    .with_effect(Effect::reply_with(texts::EMPTY_INPUT, Keyboard::Finish)));
            }
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::lookup(code)))
        }

        (
            SessionState::AwaitingCode {
                salesperson_name,
                line_items,
            },
            Event::ProductFound { product },
        ) => {
            let pending = PendingProduct {
                code: product.code,
                name_ru: product.name.ru,
                name_en: product.name.en,
            };
            let prompt = texts::product_found_choose_quantity(&pending);
            Ok(TransitionResult::new(SessionState::AwaitingQuantity {
                salesperson_name: salesperson_name.clone(),
                line_items: line_items.clone(),
                pending,
            })
            .with_effect(Effect::reply_with(prompt, Keyboard::Quantity)))
        }

        // A miss is recoverable: ask again, keep everything
        (SessionState::AwaitingCode { .. }, Event::ProductNotFound { .. }) => {
            Ok(TransitionResult::new(state.clone())
                .with_effect(Effect::reply_with(texts::CODE_NOT_FOUND_RETRY, Keyboard::Finish)))
        }

        (
            SessionState::AwaitingQuantity {
                salesperson_name,
                line_items,
                pending,
            },
            Event::Button(ButtonAction::Quantity(quantity)),
        ) => {
            let mut line_items = line_items.clone();
            line_items.push(SaleLineItem::new(pending.code.clone(), quantity));
            Ok(TransitionResult::new(SessionState::AwaitingCode {
                salesperson_name: salesperson_name.clone(),
                line_items,
            })
            .with_effect(Effect::reply_with(
                texts::line_item_added(pending, quantity),
                Keyboard::Finish,
            )))
        }

        (SessionState::AwaitingQuantity { .. }, Event::Text { .. }) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::reply_with(
                texts::CHOOSE_QUANTITY_WITH_BUTTONS,
                Keyboard::Quantity,
            )))
        }

        (
            SessionState::AwaitingCode {
                salesperson_name,
                line_items,
            },
            Event::Button(ButtonAction::Finish),
        ) => {
            if line_items.is_empty() {
                return Ok(TransitionResult::new(SessionState::Idle)
                    .with_effect(Effect::reply_with(texts::NOTHING_ADDED, Keyboard::MainMenu)));
            }
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::reply(texts::REPORT_IN_PROGRESS))
                .with_effect(Effect::CompileReport {
                    salesperson_name: salesperson_name.clone(),
                    line_items: line_items.clone(),
                }))
        }

        // ============================================================
        // Report delivery outcome (dialog already closed)
        // ============================================================
        (SessionState::Idle, Event::ReportDelivered) => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::reply_with(texts::REPORT_DONE, Keyboard::MainMenu))),

        (SessionState::Idle, Event::ReportFailed { reason }) => {
            Ok(TransitionResult::new(SessionState::Idle).with_effect(Effect::reply_with(
                texts::report_failed(&reason),
                Keyboard::MainMenu,
            )))
        }

        (state, event) => Err(TransitionError::Unhandled {
            state: state.name(),
            event: event.name(),
        }),
    }
}
