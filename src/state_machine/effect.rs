//! Effects produced by state transitions

use super::event::ButtonAction;
use super::state::{Quantity, SaleLineItem};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a text message to the session's user
    Reply {
        text: String,
        keyboard: Option<Keyboard>,
    },

    /// Resolve a product code against the catalog
    LookupProduct { code: String },

    /// Compile, render and deliver the finished report
    CompileReport {
        salesperson_name: String,
        line_items: Vec<SaleLineItem>,
    },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn reply_with(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Effect::Reply {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn lookup(code: impl Into<String>) -> Self {
        Effect::LookupProduct { code: code.into() }
    }
}

/// Inline keyboards attached to replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Add sale / view products
    MainMenu,
    /// Finish the report
    Finish,
    /// Quantities 1 to 10
    Quantity,
}

/// A single inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    fn new(label: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

impl Keyboard {
    /// Button rows, top to bottom
    pub fn rows(self) -> Vec<Vec<Button>> {
        match self {
            Keyboard::MainMenu => vec![vec![
                Button::new("✍️ Sotuv qo'shish", ButtonAction::AddSale),
                Button::new("🛍️ Mahsulotlar", ButtonAction::ViewProduct),
            ]],
            Keyboard::Finish => vec![vec![Button::new(
                "✅ Tugatish va Hisobotni Yaratish",
                ButtonAction::Finish,
            )]],
            Keyboard::Quantity => {
                let (low, high): (Vec<_>, Vec<_>) =
                    Quantity::all().partition(|quantity| quantity.get() <= 5);
                [low, high]
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|q| Button::new(q.to_string(), ButtonAction::Quantity(q)))
                            .collect()
                    })
                    .collect()
            }
        }
    }
}
