//! Failing handlers are isolated from their siblings

use crate::prelude::Log;
use lifehub_core::{handler_fn, Event, EventBus, HandlerError, HandlerFailure, PublishOptions};
use std::time::Duration;

#[tokio::test]
async fn error_and_timeout_each_leave_one_dead_letter() {
    let bus = EventBus::in_memory();
    let log = Log::default();

    bus.subscribe("X", log.recorder("before"), "first", 3).unwrap();
    bus.subscribe(
        "X",
        handler_fn(|_| async { Err::<(), HandlerError>("ledger locked".into()) }),
        "broken",
        2,
    )
    .unwrap();
    bus.subscribe(
        "X",
        handler_fn(|_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), HandlerError>(())
        }),
        "stuck",
        1,
    )
    .unwrap();
    bus.subscribe("X", log.recorder("after"), "last", 0).unwrap();

    let options = PublishOptions::default().with_timeout(Duration::from_millis(50));
    bus.publish(Event::builder("X", "test").build(), options)
        .await
        .unwrap();

    assert_eq!(log.entries(), vec!["before", "after"]);

    let dead = bus.dead_letters();
    assert_eq!(dead.len(), 2);
    assert_eq!(dead[0].subscriber, "broken");
    assert!(matches!(&dead[0].error, HandlerFailure::Error(m) if m == "ledger locked"));
    assert_eq!(dead[1].subscriber, "stuck");
    assert!(matches!(dead[1].error, HandlerFailure::Timeout(_)));
}
