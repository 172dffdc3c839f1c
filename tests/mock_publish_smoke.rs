#![cfg(feature = "transport-mock")]
use mq_loadgen::transport::mock::MockSink;
use mq_loadgen::transport::{
    ConnectOptions, DeliveryEvent, Engine, Publisher, Transport, TransportBuilder,
};

fn opts(sink: &str) -> ConnectOptions {
    let mut opts = ConnectOptions::default();
    opts.params.insert("sink".into(), sink.into());
    opts
}

#[tokio::test]
async fn publish_lands_in_sink() {
    let t = TransportBuilder::connect(Engine::Mock, opts("smoke-pub"))
        .await
        .expect("connect");
    let publisher = t.create_publisher("k1").await.expect("pub");
    publisher
        .publish(bytes::Bytes::from_static(b"hello"))
        .await
        .expect("send");

    let sink = MockSink::named("smoke-pub");
    assert_eq!(sink.message_count(), 1);
    assert_eq!(sink.messages_for("k1")[0].as_ref(), b"hello");
}

#[tokio::test]
async fn failed_topic_reports_failed_delivery() {
    let sink = MockSink::named("smoke-fail");
    sink.fail_topic("bad");

    let t = TransportBuilder::connect(Engine::Mock, opts("smoke-fail"))
        .await
        .expect("connect");
    let events = t.delivery_events();

    let good = t.create_publisher("good").await.expect("pub");
    let bad = t.create_publisher("bad").await.expect("pub");
    good.publish(bytes::Bytes::from_static(b"a"))
        .await
        .expect("send");
    bad.publish(bytes::Bytes::from_static(b"b"))
        .await
        .expect("send");

    match events.recv_async().await.expect("event") {
        DeliveryEvent::Delivered { topic } => assert_eq!(topic, "good"),
        other => panic!("expected delivered event, got {other:?}"),
    }
    match events.recv_async().await.expect("event") {
        DeliveryEvent::Failed { topic, reason } => {
            assert_eq!(topic, "bad");
            assert!(!reason.is_empty());
        }
        other => panic!("expected failed event, got {other:?}"),
    }
}
