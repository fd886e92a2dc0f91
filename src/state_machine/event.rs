//! Events that can occur in a session

use super::state::Quantity;
use crate::catalog::ProductRecord;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Start {
        /// Caller's full name, used in the greeting
        display_name: String,
    },
    Text {
        text: String,
    },
    Button(ButtonAction),

    // Catalog lookup results
    ProductFound {
        product: ProductRecord,
    },
    ProductNotFound {
        code: String,
    },
    LookupFailed {
        reason: String,
    },

    // Report delivery results
    ReportDelivered,
    ReportFailed {
        reason: String,
    },
}

impl Event {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "start",
            Event::Text { .. } => "text",
            Event::Button(_) => "button",
            Event::ProductFound { .. } => "product_found",
            Event::ProductNotFound { .. } => "product_not_found",
            Event::LookupFailed { .. } => "lookup_failed",
            Event::ReportDelivered => "report_delivered",
            Event::ReportFailed { .. } => "report_failed",
        }
    }
}

/// Inline keyboard button presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    MainMenu,
    ViewProduct,
    AddSale,
    Finish,
    Quantity(Quantity),
}

const QUANTITY_PREFIX: &str = "qty_";

impl ButtonAction {
    /// Callback payload carried by the button
    pub fn payload(self) -> String {
        match self {
            ButtonAction::MainMenu => "main_menu".to_string(),
            ButtonAction::ViewProduct => "view_products".to_string(),
            ButtonAction::AddSale => "add_sale".to_string(),
            ButtonAction::Finish => "stop_adding_products".to_string(),
            ButtonAction::Quantity(quantity) => format!("{QUANTITY_PREFIX}{quantity}"),
        }
    }

    /// Parse a callback payload. Unknown payloads and out-of-range
    /// quantities yield `None`.
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            "main_menu" => Some(ButtonAction::MainMenu),
            "view_products" => Some(ButtonAction::ViewProduct),
            "add_sale" => Some(ButtonAction::AddSale),
            "stop_adding_products" => Some(ButtonAction::Finish),
            other => other
                .strip_prefix(QUANTITY_PREFIX)
                .and_then(|n| n.parse::<u8>().ok())
                .and_then(Quantity::new)
                .map(ButtonAction::Quantity),
        }
    }
}
