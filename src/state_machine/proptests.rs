//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::catalog::{LocalizedName, ProductRecord};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn admin() -> SessionContext {
    SessionContext::new(1, true)
}

fn stranger() -> SessionContext {
    SessionContext::new(2, false)
}

fn product(code: String) -> ProductRecord {
    ProductRecord {
        name: LocalizedName {
            ru: format!("{code} ru"),
            en: format!("{code} en"),
        },
        code,
        category: "parfum".to_string(),
        internal_price: 1000.0,
        external_price: 1200.0,
        points: 5.0,
        volume: None,
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_code() -> impl Strategy<Value = String> {
    "[A-Z][0-9]{1,3}"
}

fn arb_quantity() -> impl Strategy<Value = Quantity> {
    (Quantity::MIN..=Quantity::MAX).prop_map(|n| Quantity::new(n).unwrap())
}

fn arb_button() -> impl Strategy<Value = ButtonAction> {
    prop_oneof![
        Just(ButtonAction::MainMenu),
        Just(ButtonAction::ViewProduct),
        Just(ButtonAction::AddSale),
        Just(ButtonAction::Finish),
        arb_quantity().prop_map(ButtonAction::Quantity),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-zA-Z ]{0,12}".prop_map(|display_name| Event::Start { display_name }),
        "[a-zA-Z0-9 ]{0,12}".prop_map(|text| Event::Text { text }),
        arb_button().prop_map(Event::Button),
        arb_code().prop_map(|code| Event::ProductFound {
            product: product(code)
        }),
        arb_code().prop_map(|code| Event::ProductNotFound { code }),
        "[a-z ]{1,12}".prop_map(|reason| Event::LookupFailed { reason }),
        Just(Event::ReportDelivered),
        "[a-z ]{1,12}".prop_map(|reason| Event::ReportFailed { reason }),
    ]
}

fn arb_line_items() -> impl Strategy<Value = Vec<SaleLineItem>> {
    proptest::collection::vec(
        (arb_code(), arb_quantity()).prop_map(|(code, q)| SaleLineItem::new(code, q)),
        0..6,
    )
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Idle),
        Just(SessionState::ViewingProduct),
        Just(SessionState::AwaitingSalespersonName),
        ("[a-zA-Z]{1,10}", arb_line_items()).prop_map(|(salesperson_name, line_items)| {
            SessionState::AwaitingCode {
                salesperson_name,
                line_items,
            }
        }),
        ("[a-zA-Z]{1,10}", arb_line_items(), arb_code()).prop_map(
            |(salesperson_name, line_items, code)| SessionState::AwaitingQuantity {
                salesperson_name,
                line_items,
                pending: PendingProduct {
                    name_ru: format!("{code} ru"),
                    name_en: format!("{code} en"),
                    code,
                },
            }
        ),
    ]
}

// ============================================================================
// Validity Checkers
// ============================================================================

/// Keyboards only accompany the states that can act on them
fn keyboards_match_state(effects: &[Effect], new_state: &SessionState) -> bool {
    effects.iter().all(|effect| match effect {
        Effect::Reply {
            keyboard: Some(Keyboard::MainMenu),
            ..
        } => *new_state == SessionState::Idle,
        Effect::Reply {
            keyboard: Some(Keyboard::Finish),
            ..
        } => matches!(new_state, SessionState::AwaitingCode { .. }),
        Effect::Reply {
            keyboard: Some(Keyboard::Quantity),
            ..
        } => matches!(new_state, SessionState::AwaitingQuantity { .. }),
        _ => true,
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Line items only ever grow by one within a build-report dialog
    #[test]
    fn prop_line_items_only_grow(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &admin(), event) {
            let before = state.line_items();
            let after = result.new_state.line_items();
            if result.new_state.dialog() == Dialog::BuildingReport && !after.is_empty() {
                prop_assert!(after.len() == before.len() || after.len() == before.len() + 1);
                prop_assert_eq!(&after[..before.len()], before);
            }
        }
    }

    // Replies carry the keyboard matching the state they leave behind
    #[test]
    fn prop_keyboards_match_state(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = SessionState::Idle;
        for event in events {
            if let Ok(result) = transition(&state, &admin(), event) {
                prop_assert!(
                    keyboards_match_state(&result.effects, &result.new_state),
                    "Keyboard/state mismatch: {:?} in {:?}",
                    result.effects,
                    result.new_state
                );
                state = result.new_state;
            }
        }
    }

    // A report is only ever compiled from a non-empty item list, and the
    // session is back to idle when it is
    #[test]
    fn prop_compile_only_with_items(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &admin(), event) {
            for effect in &result.effects {
                if let Effect::CompileReport { line_items, .. } = effect {
                    prop_assert!(!line_items.is_empty());
                    prop_assert_eq!(line_items.as_slice(), state.line_items());
                    prop_assert_eq!(&result.new_state, &SessionState::Idle);
                }
            }
        }
    }

    // Every transition produces at most one lookup and only for non-blank codes
    #[test]
    fn prop_lookups_are_trimmed(state in arb_state(), text in "[ ]{0,3}[A-Z0-9]{0,4}[ ]{0,3}") {
        if let Ok(result) = transition(&state, &admin(), Event::Text { text }) {
            let lookups: Vec<&String> = result.effects.iter().filter_map(|e| match e {
                Effect::LookupProduct { code } => Some(code),
                _ => None,
            }).collect();
            prop_assert!(lookups.len() <= 1);
            for code in lookups {
                prop_assert!(!code.is_empty());
                prop_assert_eq!(code.trim(), code.as_str());
            }
        }
    }

    // Start always lands in idle, whoever sends it
    #[test]
    fn prop_start_resets(state in arb_state(), name in "[a-zA-Z ]{0,12}", authorized in any::<bool>()) {
        let context = if authorized { admin() } else { stranger() };
        let result = transition(&state, &context, Event::Start { display_name: name }).unwrap();
        prop_assert_eq!(result.new_state, SessionState::Idle);
        prop_assert_eq!(result.effects.len(), 1);
    }

    // Unauthorized callers never see a keyboard from start
    #[test]
    fn prop_refusal_has_no_keyboard(name in "[a-zA-Z ]{0,12}") {
        let result = transition(&SessionState::Idle, &stranger(), Event::Start { display_name: name }).unwrap();
        let bare_reply = matches!(result.effects.as_slice(), [Effect::Reply { keyboard: None, .. }]);
        prop_assert!(bare_reply, "unexpected effects: {:?}", result.effects);
    }

    // Free text outside a dialog has no transition
    #[test]
    fn prop_idle_text_is_ignored(text in "[a-zA-Z0-9 ]{0,12}") {
        let outcome = transition(&SessionState::Idle, &admin(), Event::Text { text });
        prop_assert!(outcome.is_err());
    }

    // Finishing after a full dialog yields the items in entry order
    #[test]
    fn prop_dialog_preserves_entry_order(
        entries in proptest::collection::vec((arb_code(), arb_quantity()), 1..10)
    ) {
        let ctx = admin();
        let mut state = transition(&SessionState::Idle, &ctx, Event::Button(ButtonAction::AddSale))
            .unwrap()
            .new_state;
        state = transition(&state, &ctx, Event::Text { text: "Aziz".to_string() }).unwrap().new_state;

        for (code, quantity) in &entries {
            state = transition(&state, &ctx, Event::ProductFound { product: product(code.clone()) })
                .unwrap()
                .new_state;
            state = transition(&state, &ctx, Event::Button(ButtonAction::Quantity(*quantity)))
                .unwrap()
                .new_state;
        }

        let result = transition(&state, &ctx, Event::Button(ButtonAction::Finish)).unwrap();
        let expected: Vec<SaleLineItem> = entries
            .iter()
            .map(|(code, q)| SaleLineItem::new(code.clone(), *q))
            .collect();
        let compile = Effect::CompileReport {
            salesperson_name: "Aziz".to_string(),
            line_items: expected,
        };
        prop_assert!(result.effects.contains(&compile), "missing {:?}", compile);
    }
}
