// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

#[parameterized(
    star_matches_anything = { "*", "Task.Created", true },
    star_matches_undotted = { "*", "Heartbeat", true },
    exact = { "Task.Created", "Task.Created", true },
    exact_other_type = { "Task.Created", "Task.Deleted", false },
    segment_wildcard = { "Task.*", "Task.Created", true },
    segment_wildcard_needs_dot = { "Task.*", "TaskCreated", false },
    segment_wildcard_other_namespace = { "Task.*", "Payment.Due", false },
    segment_wildcard_single_segment_only = { "Task.*", "Task.Item.Added", false },
    leading_wildcard = { "*.Created", "Budget.Created", true },
    in_segment_suffix = { "Finance.Budget*", "Finance.BudgetCreated", true },
    in_segment_prefix = { "Finance.*Created", "Finance.BudgetCreated", true },
    in_segment_middle = { "Finance.B*t*d", "Finance.BudgetCreated", true },
    in_segment_never_crosses_dot = { "Finance*", "Finance.BudgetCreated", false },
    regex_metacharacters_are_literal = { "Task.(a|b)", "Task.a", false },
    regex_metacharacters_exact = { "Task.(a|b)", "Task.(a|b)", true },
    empty_pattern = { "", "", false },
)]
fn pattern_matching(pattern: &str, event_type: &str, expected: bool) {
    assert_eq!(EventPattern::new(pattern).matches(event_type), expected);
}

#[test]
fn wildcard_detection() {
    assert!(EventPattern::new("Task.*").is_wildcard());
    assert!(EventPattern::new("*").is_wildcard());
    assert!(!EventPattern::new("Task.Created").is_wildcard());
}

#[tokio::test]
async fn closure_handlers_receive_the_event() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let handler = handler_fn(move |event: Event| {
        let tx = tx.clone();
        async move {
            tx.send(event.event_type().to_string())?;
            Ok::<(), HandlerError>(())
        }
    });

    let event = Event::builder("Garden.Watered", "garden").build();
    handler.handle(&event).await.unwrap();

    assert_eq!(rx.recv().await.as_deref(), Some("Garden.Watered"));
}

#[test]
fn subscription_info_omits_handler() {
    let sub = Subscription {
        id: SubscriptionId::new("sub-1"),
        pattern: EventPattern::new("Finance.*"),
        subscriber: "calendar".to_string(),
        priority: 5,
        handler: handler_fn(|_| async { Ok::<(), HandlerError>(()) }),
        sequence: 0,
    };

    assert!(sub.matches("Finance.BudgetCreated"));
    assert_eq!(
        sub.info(),
        SubscriptionInfo {
            id: SubscriptionId::new("sub-1"),
            pattern: "Finance.*".to_string(),
            subscriber: "calendar".to_string(),
            priority: 5,
        }
    );
}

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z]{1,8}"
}

proptest! {
    #[test]
    fn every_type_matches_itself_and_star(parts in prop::collection::vec(segment(), 1..4)) {
        let event_type = parts.join(".");
        prop_assert!(EventPattern::new("*").matches(&event_type));
        prop_assert!(EventPattern::new(&event_type).matches(&event_type));
    }

    #[test]
    fn namespace_wildcard_matches_one_level(namespace in segment(), name in segment()) {
        let pattern = EventPattern::new(&format!("{}.*", namespace));
        let dotted = format!("{}.{}", namespace, name);
        let undotted = format!("{}{}", namespace, name);
        prop_assert!(pattern.matches(&dotted));
        prop_assert!(!pattern.matches(&undotted));
    }
}
