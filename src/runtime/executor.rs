//! Session runtime executor

use crate::catalog::ProductCatalog;
use crate::gateway::GatewayAction;
use crate::report::{self, ReportRenderer};
use crate::state_machine::state::SaleLineItem;
use crate::state_machine::{transition, Effect, Event, SessionContext, SessionState};
use chrono::{Local, NaiveDate};
use std::sync::Arc;

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Runtime for one user's session
///
/// Owns the session state and executes the effects each transition asks
/// for. Effects that produce an outcome (catalog lookups, report delivery)
/// feed it back as the next event, so a single inbound event runs to
/// completion before `handle_event` returns.
pub struct SessionRuntime<C: ProductCatalog> {
    context: SessionContext,
    state: SessionState,
    catalog: Arc<C>,
    renderer: Arc<ReportRenderer>,
    today: fn() -> NaiveDate,
}

impl<C: ProductCatalog> SessionRuntime<C> {
    pub fn new(context: SessionContext, catalog: Arc<C>, renderer: Arc<ReportRenderer>) -> Self {
        Self {
            context,
            state: SessionState::Idle,
            catalog,
            renderer,
            today: local_today,
        }
    }

    /// Override the clock used to date reports
    #[allow(dead_code)] // Used by tests to pin report dates
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Process one inbound event and everything it sets off
    pub fn handle_event(&mut self, event: Event) -> Vec<GatewayAction> {
        let mut actions = Vec::new();

        // Process events in a loop - no recursion
        let mut events_to_process = vec![event];
        while let Some(event) = events_to_process.pop() {
            let event_name = event.name();
            let result = match transition(&self.state, &self.context, event) {
                Ok(result) => result,
                Err(e) => {
                    tracing::debug!(
                        user_id = self.context.user_id,
                        error = %e,
                        "Ignoring event"
                    );
                    continue;
                }
            };

            if result.new_state != self.state {
                let next = &result.new_state;
                tracing::info!(
                    user_id = self.context.user_id,
                    event = event_name,
                    from = self.state.name(),
                    to = next.name(),
                    dialog = ?next.dialog(),
                    step = ?next.step(),
                    items = next.line_items().len(),
                    pending = ?next.pending_product_code(),
                    "State change"
                );
            }
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(next) = self.execute_effect(effect, &mut actions) {
                    events_to_process.push(next);
                }
            }
        }

        actions
    }

    fn execute_effect(&self, effect: Effect, actions: &mut Vec<GatewayAction>) -> Option<Event> {
        match effect {
            Effect::Reply { text, keyboard } => {
                actions.push(GatewayAction::SendText {
                    user_id: self.context.user_id,
                    text,
                    keyboard,
                });
                None
            }

            Effect::LookupProduct { code } => Some(self.lookup_product(code)),

            Effect::CompileReport {
                salesperson_name,
                line_items,
            } => Some(self.deliver_report(&salesperson_name, &line_items, actions)),
        }
    }

    fn lookup_product(&self, code: String) -> Event {
        match self.catalog.get_product(&code) {
            Ok(product) => Event::ProductFound { product },
            Err(e) if e.is_not_found() => {
                tracing::info!(user_id = self.context.user_id, code = %code, "Product not found");
                Event::ProductNotFound { code }
            }
            Err(e) => {
                tracing::error!(
                    user_id = self.context.user_id,
                    code = %code,
                    error = %e,
                    "Catalog lookup failed"
                );
                Event::LookupFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Compile and render the report, queueing the image and its caption
    fn deliver_report(
        &self,
        salesperson_name: &str,
        line_items: &[SaleLineItem],
        actions: &mut Vec<GatewayAction>,
    ) -> Event {
        let user_id = self.context.user_id;
        let compiled = match report::compile(
            &self.catalog,
            salesperson_name,
            (self.today)(),
            line_items,
        ) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Report compilation failed");
                return Event::ReportFailed {
                    reason: e.to_string(),
                };
            }
        };

        tracing::info!(
            user_id,
            rows = compiled.rows.len(),
            total = compiled.grand_total_sum,
            points = compiled.grand_total_points,
            "Report compiled"
        );

        let caption = compiled.text_summary();
        match self.renderer.render(&compiled) {
            Ok(image) => actions.push(GatewayAction::SendImage {
                user_id,
                image,
                caption,
            }),
            Err(e) => {
                // The summary alone still carries every figure
                tracing::warn!(user_id, error = %e, "Report rendering failed, sending text only");
                actions.push(GatewayAction::SendText {
                    user_id,
                    text: caption,
                    keyboard: None,
                });
            }
        }
        Event::ReportDelivered
    }
}
