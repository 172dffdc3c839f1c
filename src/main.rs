use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mq_loadgen::checkpoint;
use mq_loadgen::config::{Config, Topology, plan_topology};
use mq_loadgen::logging;
use mq_loadgen::metrics::delivery::DeliveryStats;
use mq_loadgen::payload::{DataSource, build_word_list};
use mq_loadgen::roles::producer::{MessageBudget, ProducerConfig, run_producer};
use mq_loadgen::transport::{
    DeliveryEvent, Transport, TransportBuilder,
    config::{client_options, parse_engine},
};

#[derive(Parser)]
#[command(name = "mq-loadgen")]
#[command(about = "Synthetic publish load generator for message brokers")]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Transport engine (kafka, mock)
    #[arg(long, default_value = "kafka")]
    engine: String,

    /// Path to the JSON run configuration
    config: PathBuf,

    /// Total messages to produce, or -1 to run unbounded
    #[arg(allow_hyphen_values = true)]
    num_messages: i64,

    /// Fixed delay between messages (e.g. "10ms")
    #[arg(value_parser = humantime::parse_duration)]
    delay: Duration,

    /// Worker count; only legal with an unbounded message count
    num_threads: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    let engine = parse_engine(&cli.engine)
        .with_context(|| format!("unknown transport engine {:?}", cli.engine))?;
    let config = Config::load(&cli.config)?;
    let budget = MessageBudget::from_arg(cli.num_messages)?;
    let plan = plan_topology(&config, budget, cli.num_threads)?;

    println!("mq-loadgen starting:");
    println!("  Delay: {:?}", cli.delay);
    println!(
        "  Checkpoint interval: {} messages",
        config.checkpoint_interval
    );
    println!(
        "  Payload: {} word(s) x {} chars",
        config.word_count, config.word_length
    );

    let opts = client_options(&config.producer)?;
    let transport: Box<dyn Transport> = TransportBuilder::connect(engine, opts)
        .await
        .map_err(|e| anyhow::anyhow!("transport connect error: {e}"))?;

    // Word list is built once and shared read-only by every worker.
    let mut rng = SmallRng::from_entropy();
    let words = build_word_list(&mut rng, config.word_count, config.word_length);
    let data = Arc::new(DataSource::new(words));

    let (cp_tx, cp_rx) = checkpoint::channel();
    let reporter = tokio::spawn(checkpoint::run_reporter(config.checkpoint_interval, cp_rx));

    // Drain delivery reports for the whole run: failures are logged and
    // counted, never retried.
    let delivery_stats = Arc::new(DeliveryStats::new());
    let events = transport.delivery_events();
    let drain_stats = delivery_stats.clone();
    let drain = tokio::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            match event {
                DeliveryEvent::Delivered { .. } => drain_stats.record_delivered().await,
                DeliveryEvent::Failed { topic, reason } => {
                    warn!("delivery failed on topic {topic}: {reason}");
                    drain_stats.record_failed().await;
                }
            }
        }
    });

    let shutdown = CancellationToken::new();

    match plan {
        Topology::Threads { count, topic } => {
            let mut handles = Vec::new();
            for i in 0..count {
                let publisher = transport
                    .create_publisher(&topic)
                    .await
                    .map_err(|e| anyhow::anyhow!("create_publisher error: {e}"))?;
                let cfg = ProducerConfig {
                    label: i.to_string(),
                    budget: MessageBudget::Unbounded,
                    delay: cli.delay,
                    checkpoint_interval: config.checkpoint_interval,
                };
                handles.push(spawn_producer(
                    cfg,
                    publisher,
                    data.clone(),
                    cp_tx.clone(),
                    shutdown.clone(),
                ));
            }
            println!("Started {count} producers on topic {topic}");
            wait_for_interrupt(&shutdown).await;
            join_all(handles).await;
        }
        Topology::PerTopic(topics) => {
            let mut handles = Vec::new();
            for topic in &topics {
                let publisher = transport
                    .create_publisher(topic)
                    .await
                    .map_err(|e| anyhow::anyhow!("create_publisher error: {e}"))?;
                let cfg = ProducerConfig {
                    label: topic.clone(),
                    budget: MessageBudget::Unbounded,
                    delay: cli.delay,
                    checkpoint_interval: config.checkpoint_interval,
                };
                handles.push(spawn_producer(
                    cfg,
                    publisher,
                    data.clone(),
                    cp_tx.clone(),
                    shutdown.clone(),
                ));
            }
            println!("Started one producer per topic: {}", topics.join(", "));
            wait_for_interrupt(&shutdown).await;
            join_all(handles).await;
        }
        Topology::Single { topic, budget } => {
            let publisher = transport
                .create_publisher(&topic)
                .await
                .map_err(|e| anyhow::anyhow!("create_publisher error: {e}"))?;
            let cfg = ProducerConfig {
                label: topic.clone(),
                budget,
                delay: cli.delay,
                checkpoint_interval: config.checkpoint_interval,
            };
            let producing = run_producer(cfg, publisher, data.clone(), cp_tx.clone(), shutdown.clone());
            tokio::select! {
                res = producing => res?,
                _ = signal::ctrl_c() => {
                    info!("interrupt received, stopping producer");
                    shutdown.cancel();
                }
            }
        }
    }

    // Close the checkpoint channel so the reporter drains and stops.
    drop(cp_tx);
    let _ = reporter.await;

    // Flush whatever the client still has queued, then account for the late
    // delivery reports before the drain task goes away.
    transport
        .shutdown()
        .await
        .map_err(|e| anyhow::anyhow!("transport shutdown error: {e}"))?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    drain.abort();

    let snap = delivery_stats.snapshot().await;
    println!("\nFinal delivery statistics:");
    println!("  Delivered: {}", snap.delivered_count);
    println!("  Failed: {}", snap.failed_count);
    println!("  Total duration: {:.2}s", snap.total_duration.as_secs_f64());

    Ok(())
}

fn spawn_producer(
    cfg: ProducerConfig,
    publisher: Box<dyn mq_loadgen::transport::Publisher>,
    data: Arc<DataSource>,
    cp_tx: flume::Sender<checkpoint::Checkpoint>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let label = cfg.label.clone();
    tokio::spawn(async move {
        if let Err(e) = run_producer(cfg, publisher, data, cp_tx, shutdown).await {
            error!("[{label}] producer exited with error: {e:#}");
        }
    })
}

async fn wait_for_interrupt(shutdown: &CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        info!("interrupt received, stopping producers");
    }
    shutdown.cancel();
}
