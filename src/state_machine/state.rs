//! Session state types

use serde::Deserialize;
use std::fmt;

/// Telegram user identifier
pub type UserId = i64;

/// Number of units sold in one line item, always within 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "u8")]
pub struct Quantity(u8);

impl Quantity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every selectable quantity, in ascending order
    pub fn all() -> impl Iterator<Item = Quantity> {
        (Self::MIN..=Self::MAX).map(Quantity)
    }
}

impl TryFrom<u8> for Quantity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Quantity::new(value).ok_or_else(|| format!("quantity out of range: {value}"))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded sale entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLineItem {
    pub product_code: String,
    pub quantity: Quantity,
}

impl SaleLineItem {
    pub fn new(product_code: impl Into<String>, quantity: Quantity) -> Self {
        Self {
            product_code: product_code.into(),
            quantity,
        }
    }
}

/// Product found by code, waiting for its quantity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProduct {
    pub code: String,
    pub name_ru: String,
    pub name_en: String,
}

// ============================================================================
// Session State
// ============================================================================

/// Per-user conversation state
///
/// The report under construction lives inside the building states, so
/// leaving the dialog drops it and a pending product only exists while a
/// quantity is awaited.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// No dialog in progress
    #[default]
    Idle,

    /// View-product dialog, waiting for a single code
    ViewingProduct,

    /// Build-report dialog, waiting for the salesperson name
    AwaitingSalespersonName,

    /// Build-report dialog, waiting for the next product code or finish
    AwaitingCode {
        salesperson_name: String,
        line_items: Vec<SaleLineItem>,
    },

    /// Build-report dialog, waiting for the quantity of `pending`
    AwaitingQuantity {
        salesperson_name: String,
        line_items: Vec<SaleLineItem>,
        pending: PendingProduct,
    },
}

/// Dialog a session is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    None,
    ViewingProduct,
    BuildingReport,
}

/// Step within the current dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    None,
    AwaitingSalespersonName,
    AwaitingCode,
    AwaitingQuantity,
}

impl SessionState {
    pub fn dialog(&self) -> Dialog {
        match self {
            SessionState::Idle => Dialog::None,
            SessionState::ViewingProduct => Dialog::ViewingProduct,
            SessionState::AwaitingSalespersonName
            | SessionState::AwaitingCode { .. }
            | SessionState::AwaitingQuantity { .. } => Dialog::BuildingReport,
        }
    }

    pub fn step(&self) -> Step {
        match self {
            SessionState::Idle => Step::None,
            SessionState::AwaitingSalespersonName => Step::AwaitingSalespersonName,
            SessionState::ViewingProduct | SessionState::AwaitingCode { .. } => Step::AwaitingCode,
            SessionState::AwaitingQuantity { .. } => Step::AwaitingQuantity,
        }
    }

    /// Line items recorded so far in a build-report dialog
    pub fn line_items(&self) -> &[SaleLineItem] {
        match self {
            SessionState::AwaitingCode { line_items, .. }
            | SessionState::AwaitingQuantity { line_items, .. } => line_items,
            _ => &[],
        }
    }

    pub fn pending_product_code(&self) -> Option<&str> {
        match self {
            SessionState::AwaitingQuantity { pending, .. } => Some(&pending.code),
            _ => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::ViewingProduct => "viewing_product",
            SessionState::AwaitingSalespersonName => "awaiting_salesperson_name",
            SessionState::AwaitingCode { .. } => "awaiting_code",
            SessionState::AwaitingQuantity { .. } => "awaiting_quantity",
        }
    }
}

/// Context for a session (immutable for its lifetime)
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: UserId,
    /// Whether the user is on the admin allow-list
    pub authorized: bool,
}

impl SessionContext {
    pub fn new(user_id: UserId, authorized: bool) -> Self {
        Self { user_id, authorized }
    }
}
