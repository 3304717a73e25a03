//! End-to-end replay tests against the in-memory broker.
//!
//! Single-partition brokers are used wherever a scenario depends on exact
//! offsets, since keyless publishing round-robins across partitions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use rewind_broker::{BrokerConfig, CompressionId, MemoryBroker, NewRecord};
use rewind_replay::{
    DecodeService, DecodeServiceError, MessageBody, ReplayError, ReplayHandler, ReplayRequest,
    ScanDirection, ScanOutcome,
};

async fn publish_typed(broker: &MemoryBroker, topic: &str, ty: &str, n: i64) {
    let payload = json!({"type": ty, "n": n}).to_string();
    broker
        .publish(
            topic,
            NewRecord::payload(payload).with_timestamp_ms(1_000 + n),
        )
        .await
        .unwrap();
}

async fn publish_numbered(broker: &MemoryBroker, topic: &str, count: u64) {
    for n in 0..count {
        broker
            .publish(
                topic,
                NewRecord::payload(json!({"n": n}).to_string()).with_timestamp_ms(n as i64),
            )
            .await
            .unwrap();
    }
}

fn field_n(body: &MessageBody) -> i64 {
    body.as_value().unwrap()["n"].as_i64().unwrap()
}

#[tokio::test]
async fn bucketed_replay_keeps_most_recent_matches() {
    // alert#1, sensor#1, alert#2, alert#3 with a cap of 2: the first alert
    // is evicted and only the requested type comes back.
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    publish_typed(&broker, "telemetry", "alert", 1).await;
    publish_typed(&broker, "telemetry", "sensor", 1).await;
    publish_typed(&broker, "telemetry", "alert", 2).await;
    publish_typed(&broker, "telemetry", "alert", 3).await;

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::type_bucketed("telemetry", ["alert"]).with_max_messages(2);
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    let buckets = result.buckets().unwrap();
    assert_eq!(buckets.keys().collect::<Vec<_>>(), vec!["alert"]);
    let ns: Vec<i64> = buckets["alert"].iter().map(|m| field_n(&m.body)).collect();
    assert_eq!(ns, vec![2, 3]);

    assert_eq!(result.summary.processed, 4);
    assert_eq!(result.summary.collected, 2);
    let types = result.summary.types.as_ref().unwrap();
    assert_eq!(types["alert"].count, 2);
    assert_eq!(types["alert"].latest_timestamp_ms, Some(1_003));
}

#[tokio::test(start_paused = true)]
async fn bucketed_replay_reports_requested_types_that_never_appeared() {
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    publish_typed(&broker, "telemetry", "alert", 1).await;

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::type_bucketed("telemetry", ["alert", "sensor"])
        .with_max_messages(1)
        .with_timeout(Duration::from_millis(200));
    let result = handler.execute(request).await.unwrap();

    // The sensor bucket can never fill, so the deadline ends the scan.
    assert_eq!(result.outcome, ScanOutcome::TimedOut);
    let buckets = result.buckets().unwrap();
    assert_eq!(buckets["alert"].len(), 1);
    assert!(buckets["sensor"].is_empty());
    let types = result.summary.types.as_ref().unwrap();
    assert_eq!(types["sensor"].count, 0);
    assert_eq!(types["sensor"].latest_timestamp_ms, None);
}

#[tokio::test]
async fn forward_window_collects_after_target_offset() {
    // Offsets 0..=104; target 100, cap 3: the window is [101, 102, 103].
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    publish_numbered(&broker, "telemetry", 105).await;

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::offset_windowed("telemetry", 100, ScanDirection::Forward)
        .with_max_messages(3);
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    let offsets: Vec<u64> = result.window().unwrap().iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![101, 102, 103]);

    let window = result.summary.window.as_ref().unwrap();
    assert_eq!(window.direction, ScanDirection::Forward);
    assert_eq!(window.target_offset, 100);
    assert_eq!(window.oldest_offset, Some(101));
    assert_eq!(window.newest_offset, Some(103));
}

#[tokio::test]
async fn backward_window_collects_before_target_offset() {
    // Offsets 0..=51; target 50, cap 3: the window is [47, 48, 49]; offset
    // 50 is the boundary and is never retained.
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    publish_numbered(&broker, "telemetry", 52).await;

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::offset_windowed("telemetry", 50, ScanDirection::Backward)
        .with_max_messages(3);
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    let offsets: Vec<u64> = result.window().unwrap().iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![47, 48, 49]);
}

#[tokio::test(start_paused = true)]
async fn backward_window_on_short_topic_yields_partial_window() {
    // Nothing at or past the target, so the boundary never arrives and the
    // deadline returns the partial window. Not an error.
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    publish_numbered(&broker, "telemetry", 3).await;

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::offset_windowed("telemetry", 10, ScanDirection::Backward)
        .with_max_messages(5)
        .with_timeout(Duration::from_millis(200));
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::TimedOut);
    let offsets: Vec<u64> = result.window().unwrap().iter().map(|m| m.offset).collect();
    assert_eq!(offsets, vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn empty_topic_returns_empty_result_without_error() {
    let broker = Arc::new(MemoryBroker::new());
    let handler = ReplayHandler::new(broker);

    let request = ReplayRequest::type_bucketed("never-written", ["alert"])
        .with_timeout(Duration::from_millis(200));
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::TimedOut);
    assert_eq!(result.summary.processed, 0);
    assert_eq!(result.summary.collected, 0);
    assert!(result.buckets().unwrap()["alert"].is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_the_whole_session() {
    let broker = Arc::new(MemoryBroker::new());
    let handler = ReplayHandler::new(broker);

    let request = ReplayRequest::type_bucketed("never-written", ["alert"])
        .with_timeout(Duration::from_millis(500));
    let started = tokio::time::Instant::now();
    let result = handler.execute(request).await.unwrap();

    // Returns at the deadline, not after the broker's own poll wait.
    assert_eq!(result.outcome, ScanOutcome::TimedOut);
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(result.summary.elapsed_ms >= 500);
}

#[tokio::test]
async fn result_echoes_effective_request() {
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    publish_typed(&broker, "telemetry", "alert", 1).await;

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::type_bucketed("telemetry", ["alert"]).with_max_messages(1);
    let result = handler.execute(request.clone()).await.unwrap();

    assert_eq!(result.request, request);
    assert_eq!(result.request.timeout, Duration::from_secs(30));
    assert_eq!(result.request.max_messages, 1);
}

#[tokio::test]
async fn concurrent_requests_on_one_topic_stay_isolated() {
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    for n in 0..6 {
        publish_typed(&broker, "telemetry", if n % 2 == 0 { "alert" } else { "sensor" }, n).await;
    }

    let factory: Arc<MemoryBroker> = Arc::clone(&broker);
    let handler = Arc::new(ReplayHandler::new(factory));
    let alerts = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            handler
                .execute(ReplayRequest::type_bucketed("telemetry", ["alert"]).with_max_messages(3))
                .await
        })
    };
    let sensors = {
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            handler
                .execute(ReplayRequest::type_bucketed("telemetry", ["sensor"]).with_max_messages(3))
                .await
        })
    };

    let alerts = alerts.await.unwrap().unwrap();
    let sensors = sensors.await.unwrap().unwrap();

    let alert_ns: Vec<i64> = alerts.buckets().unwrap()["alert"]
        .iter()
        .map(|m| field_n(&m.body))
        .collect();
    let sensor_ns: Vec<i64> = sensors.buckets().unwrap()["sensor"]
        .iter()
        .map(|m| field_n(&m.body))
        .collect();
    assert_eq!(alert_ns, vec![0, 2, 4]);
    assert_eq!(sensor_ns, vec![1, 3, 5]);
}

#[tokio::test]
async fn multi_partition_topics_replay_order_tolerantly() {
    // Keyless publishing round-robins across partitions; bucketed replay
    // does not depend on cross-partition ordering.
    let broker = Arc::new(MemoryBroker::with_partitions(4));
    for n in 0..8 {
        publish_typed(&broker, "telemetry", "alert", n).await;
    }

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::type_bucketed("telemetry", ["alert"]).with_max_messages(8);
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    let mut ns: Vec<i64> = result.buckets().unwrap()["alert"]
        .iter()
        .map(|m| field_n(&m.body))
        .collect();
    ns.sort_unstable();
    assert_eq!(ns, (0..8).collect::<Vec<i64>>());
}

#[tokio::test]
async fn plain_text_records_land_in_the_unknown_bucket() {
    // A non-JSON payload degrades to {"content": ...}, which carries no
    // type field and is therefore collectable as "unknown".
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    broker
        .publish("telemetry", NewRecord::payload("free-form log line"))
        .await
        .unwrap();

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::type_bucketed("telemetry", ["unknown"]).with_max_messages(1);
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    let bucket = &result.buckets().unwrap()["unknown"];
    assert_eq!(
        bucket[0].body.as_value().unwrap(),
        &json!({"content": "free-form log line"})
    );
}

#[tokio::test]
async fn backward_window_at_offset_zero_completes_immediately() {
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    broker
        .publish("telemetry", NewRecord::payload("first"))
        .await
        .unwrap();

    let handler = ReplayHandler::new(broker);
    let request =
        ReplayRequest::offset_windowed("telemetry", 0, ScanDirection::Backward).with_max_messages(5);
    let result = handler.execute(request).await.unwrap();

    // Offset 0 is already at the target, so it is the boundary itself and
    // nothing precedes it.
    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    assert!(result.window().unwrap().is_empty());
    assert_eq!(result.summary.processed, 1);
}

#[tokio::test]
async fn gzip_compressed_topic_replays_transparently() {
    // The default config registry carries gzip; the reader decompresses
    // on fetch, so the engine only ever sees plain payloads.
    let config = BrokerConfig::new(vec!["broker-1:9092".to_string()]);
    let broker = Arc::new(MemoryBroker::from_config(&config));
    let payload = json!({"type": "alert", "n": 1}).to_string();
    broker
        .publish(
            "telemetry",
            NewRecord::payload(payload).with_compression(CompressionId::Gzip),
        )
        .await
        .unwrap();

    let handler = ReplayHandler::new(broker);
    let request = ReplayRequest::type_bucketed("telemetry", ["alert"]).with_max_messages(1);
    let result = handler.execute(request).await.unwrap();

    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    assert_eq!(field_n(&result.buckets().unwrap()["alert"][0].body), 1);
}

/// Decode service that understands `ok:<json>` payloads and reports
/// everything else as malformed.
struct PrefixService;

#[async_trait]
impl DecodeService for PrefixService {
    async fn decode(&self, payload: &[u8]) -> Result<Value, DecodeServiceError> {
        let text = String::from_utf8_lossy(payload);
        match text.strip_prefix("ok:") {
            Some(rest) => serde_json::from_str(rest)
                .map_err(|e| DecodeServiceError::Malformed(e.to_string())),
            None => Err(DecodeServiceError::Malformed("missing magic prefix".to_string())),
        }
    }
}

#[tokio::test]
async fn schema_decode_failures_degrade_per_message() {
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    broker
        .publish("telemetry", NewRecord::payload(r#"ok:{"type":"alert","n":1}"#))
        .await
        .unwrap();
    broker
        .publish("telemetry", NewRecord::payload("garbled bytes"))
        .await
        .unwrap();
    broker
        .publish("telemetry", NewRecord::payload(r#"ok:{"type":"alert","n":2}"#))
        .await
        .unwrap();

    let handler =
        ReplayHandler::new(broker.clone()).with_decode_service(Arc::new(PrefixService));

    // Bucketed mode: the malformed record is not bucket-eligible.
    let request = ReplayRequest::type_bucketed("telemetry", ["alert"]).with_max_messages(2);
    let result = handler.execute(request).await.unwrap();
    assert_eq!(result.outcome, ScanOutcome::Satisfied);
    let ns: Vec<i64> = result.buckets().unwrap()["alert"]
        .iter()
        .map(|m| field_n(&m.body))
        .collect();
    assert_eq!(ns, vec![1, 2]);
    assert_eq!(result.summary.processed, 3);

    // Windowed mode: the malformed record is retained with its raw body
    // and the decode error attached.
    let request = ReplayRequest::offset_windowed("telemetry", 0, ScanDirection::Forward)
        .with_max_messages(2);
    let result = handler.execute(request).await.unwrap();
    let window = result.window().unwrap();
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].offset, 1);
    assert_eq!(window[0].body, MessageBody::Raw(b"garbled bytes".to_vec()));
    assert!(window[0].decode_error.as_deref().unwrap().contains("magic prefix"));
    assert_eq!(window[1].offset, 2);
    assert!(window[1].decode_error.is_none());
}

/// Decode service that is down entirely.
struct DownService;

#[async_trait]
impl DecodeService for DownService {
    async fn decode(&self, _payload: &[u8]) -> Result<Value, DecodeServiceError> {
        Err(DecodeServiceError::Unavailable("registry unreachable".to_string()))
    }
}

#[tokio::test]
async fn unreachable_decode_service_aborts_the_session() {
    let broker = Arc::new(MemoryBroker::with_partitions(1));
    broker
        .publish("telemetry", NewRecord::payload("anything"))
        .await
        .unwrap();

    let handler =
        ReplayHandler::new(broker.clone()).with_decode_service(Arc::new(DownService));
    let request = ReplayRequest::type_bucketed("telemetry", ["alert"]);

    let err = handler.execute(request).await.unwrap_err();
    assert!(matches!(err, ReplayError::DecodeUnavailable(_)));
    assert!(err.to_string().contains("registry unreachable"));
}
