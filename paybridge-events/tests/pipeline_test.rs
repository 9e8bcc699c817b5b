//! Integration tests for paybridge-events

use chrono::{Duration, Utc};
use paybridge_events::*;
use std::sync::Arc;

fn refund(id: &str, amount: i64) -> EventEnvelope {
    EventEnvelope::builder("refund.created", "/payments/refunds")
        .id(id)
        .field("refund_id", format!("re_{id}"))
        .field("charge_id", "ch_1")
        .field("amount", amount)
        .build()
}

#[tokio::test]
async fn test_concurrent_failures_all_reach_dead_letter_queue() {
    let publisher = Arc::new(InMemoryPublisher::new());
    publisher.fail_event_type("refund.created", "broker rejected record");
    let pipeline = EventPipeline::new(publisher.clone());

    let mut tasks = Vec::new();
    for i in 0..32 {
        let pipeline = pipeline.clone();
        tasks.push(tokio::spawn(async move {
            pipeline
                .publish(DEFAULT_TOPIC, refund(&format!("evt_{i}"), 100 + i))
                .await
        }));
    }
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert!(!outcome.is_published());
    }

    let stats = pipeline.dead_letters().statistics();
    assert_eq!(stats.total_events, 32);
    assert_eq!(stats.retry_count, 0);
    assert!(publisher.is_empty());
}

#[tokio::test]
async fn test_published_events_replay_by_type_and_window() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let pipeline = EventPipeline::new(publisher.clone());
    let before = Utc::now() - Duration::seconds(1);

    pipeline.publish(DEFAULT_TOPIC, refund("evt_a", 10)).await.unwrap();
    pipeline
        .publish(
            DEFAULT_TOPIC,
            EventEnvelope::builder("customer.created", "/payments/customers")
                .field("customer_id", "cus_1")
                .build(),
        )
        .await
        .unwrap();
    pipeline.publish(DEFAULT_TOPIC, refund("evt_b", 20)).await.unwrap();

    let after = Utc::now() + Duration::seconds(1);
    let replay = pipeline.replay_store();

    assert_eq!(replay.replay_events(before, after).len(), 3);
    let refunds = replay.replay_events_by_type("refund.created");
    assert_eq!(refunds.len(), 2);
    assert_eq!(refunds[0].id(), "evt_a");
    assert_eq!(replay.statistics().total_replay_operations, 2);
}

#[tokio::test]
async fn test_consumer_skips_unknown_versions() {
    let registry = SchemaRegistry::new();
    let incoming = vec![
        r#"{"id":"1","type":"charge.created","source":"/payments/charges","specversion":"1.0","time":"2024-01-01T00:00:00Z","data":{}}"#,
        r#"{"id":"2","type":"charge.created","source":"/payments/charges","specversion":"7.0","time":"2024-01-01T00:00:00Z","data":{}}"#,
    ];

    let processed: Vec<String> = incoming
        .into_iter()
        .filter_map(|raw| EventEnvelope::from_json(raw).ok())
        .filter(|e| registry.validator().accepts_version(e.specversion()))
        .map(|e| e.id().to_string())
        .collect();

    assert_eq!(processed, ["1"]);
}

#[tokio::test]
async fn test_runtime_schema_extension() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let registry = Arc::new(SchemaRegistry::new());
    registry
        .register(
            EventSchema::new("charge.created", "2.0")
                .description("Charge created with capture mode")
                .required(["charge_id", "amount", "currency", "capture"]),
        )
        .unwrap();
    let pipeline = EventPipeline::new(publisher.clone()).with_schemas(registry.clone());

    let v2 = EventEnvelope::builder("charge.created", "/payments/charges")
        .specversion("2.0")
        .field("charge_id", "ch_1")
        .field("amount", 5)
        .field("currency", "usd")
        .build();
    let err = pipeline.publish(DEFAULT_TOPIC, v2.clone()).await.unwrap_err();
    assert_eq!(err.field(), Some("capture"));

    let v1 = EventEnvelope::builder("charge.created", "/payments/charges")
        .id("evt_v1")
        .specversion("1.0")
        .time(Utc::now())
        .field("charge_id", "ch_1")
        .field("amount", 5)
        .field("currency", "usd")
        .build();
    assert!(registry.migrate_to_version(&v1, "2.0").is_err());
    assert!(pipeline.publish(DEFAULT_TOPIC, v1).await.unwrap().is_published());
}
