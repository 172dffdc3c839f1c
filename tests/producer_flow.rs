#![cfg(feature = "transport-mock")]
use mq_loadgen::checkpoint;
use mq_loadgen::payload::DataSource;
use mq_loadgen::roles::producer::{MessageBudget, ProducerConfig, run_producer};
use mq_loadgen::transport::mock::MockSink;
use mq_loadgen::transport::{ConnectOptions, Engine, Transport, TransportBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn connect(sink: &str) -> Box<dyn Transport> {
    let mut opts = ConnectOptions::default();
    opts.params.insert("sink".into(), sink.into());
    TransportBuilder::connect(Engine::Mock, opts)
        .await
        .expect("connect")
}

#[tokio::test]
async fn bounded_producer_emits_exact_count_and_no_checkpoints() {
    let t = connect("flow-bounded").await;
    let publisher = t.create_publisher("events").await.expect("pub");
    let (cp_tx, cp_rx) = checkpoint::channel();

    let cfg = ProducerConfig {
        label: "events".to_string(),
        budget: MessageBudget::Bounded(5),
        delay: Duration::from_millis(1),
        checkpoint_interval: 3,
    };
    run_producer(
        cfg,
        publisher,
        Arc::new(DataSource::new(vec!["hello".to_string()])),
        cp_tx,
        CancellationToken::new(),
    )
    .await
    .expect("producer");

    let sink = MockSink::named("flow-bounded");
    let messages = sink.messages_for("events");
    assert_eq!(messages.len(), 5);
    // Bounded mode never emits a checkpoint, even past the interval.
    assert!(cp_rx.try_recv().is_err());

    let value: serde_json::Value = serde_json::from_slice(&messages[0]).expect("json");
    assert_eq!(value["data"], 2);
    assert_eq!(value["data_string"], "hello");
    assert!(value["timestamp"].as_i64().expect("timestamp") > 0);
}

#[tokio::test]
async fn zero_budget_producer_emits_nothing() {
    let t = connect("flow-zero").await;
    let publisher = t.create_publisher("events").await.expect("pub");
    let (cp_tx, _cp_rx) = checkpoint::channel();

    let cfg = ProducerConfig {
        label: "events".to_string(),
        budget: MessageBudget::Bounded(0),
        delay: Duration::from_millis(1),
        checkpoint_interval: 3,
    };
    run_producer(
        cfg,
        publisher,
        Arc::new(DataSource::new(vec!["hello".to_string()])),
        cp_tx,
        CancellationToken::new(),
    )
    .await
    .expect("producer");

    assert_eq!(MockSink::named("flow-zero").message_count(), 0);
}

#[tokio::test]
async fn unbounded_producer_checkpoints_every_interval_until_cancelled() {
    let t = connect("flow-unbounded").await;
    let publisher = t.create_publisher("stream").await.expect("pub");
    let (cp_tx, cp_rx) = checkpoint::channel();
    let token = CancellationToken::new();

    let cfg = ProducerConfig {
        label: "0".to_string(),
        budget: MessageBudget::Unbounded,
        delay: Duration::from_millis(1),
        checkpoint_interval: 3,
    };
    let handle = tokio::spawn(run_producer(
        cfg,
        publisher,
        Arc::new(DataSource::new(vec!["x".to_string()])),
        cp_tx,
        token.clone(),
    ));

    for _ in 0..2 {
        let cp = tokio::time::timeout(Duration::from_secs(5), cp_rx.recv_async())
            .await
            .expect("checkpoint within deadline")
            .expect("channel open");
        assert_eq!(cp.label, "0");
        assert!(cp.elapsed > Duration::ZERO);
    }
    // Two checkpoints at interval 3 means at least six messages went out.
    assert!(MockSink::named("flow-unbounded").messages_for("stream").len() >= 6);

    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("producer stops on cancel")
        .expect("join")
        .expect("producer result");
}
