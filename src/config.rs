use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::roles::producer::MessageBudget;

pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 1000;
pub const DEFAULT_WORD_COUNT: usize = 1;
pub const DEFAULT_WORD_LENGTH: usize = 1000;

/// Run configuration, read from a JSON file. The `producer` map is opaque
/// client configuration handed to the transport verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub topic: Option<String>,
    pub topics: Vec<String>,
    pub checkpoint_interval: u64,
    pub producer: BTreeMap<String, serde_json::Value>,
    pub word_count: usize,
    pub word_length: usize,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.apply_defaults();
        Ok(config)
    }

    /// Zero or missing numeric fields mean "unset" and take the defaults.
    pub fn apply_defaults(&mut self) {
        if self.checkpoint_interval == 0 {
            self.checkpoint_interval = DEFAULT_CHECKPOINT_INTERVAL;
        }
        if self.word_count == 0 {
            self.word_count = DEFAULT_WORD_COUNT;
        }
        if self.word_length == 0 {
            self.word_length = DEFAULT_WORD_LENGTH;
        }
    }

    /// Destination topics: the `topics` list when non-empty, otherwise the
    /// single `topic`.
    pub fn effective_topics(&self) -> Vec<String> {
        if !self.topics.is_empty() {
            return self.topics.clone();
        }
        self.topic
            .iter()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect()
    }
}

/// Worker fan-out decided from the config and process arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// N concurrent unbounded workers against one topic; labels are the
    /// decimal worker index.
    Threads { count: u32, topic: String },
    /// One concurrent unbounded worker per topic; label = topic name.
    PerTopic(Vec<String>),
    /// A single worker on the current task, bounded by the message budget.
    Single { topic: String, budget: MessageBudget },
}

/// Validate fan-out legality and pick the topology. All violations are fatal
/// and must be reported before any worker starts.
pub fn plan_topology(
    config: &Config,
    budget: MessageBudget,
    threads: Option<u32>,
) -> Result<Topology> {
    let mut topics = config.effective_topics();
    if topics.is_empty() {
        bail!("no destination topic configured (set `topic` or `topics`)");
    }

    if let Some(count) = threads {
        if count == 0 {
            bail!("thread count must be at least 1");
        }
        if budget != MessageBudget::Unbounded {
            bail!("finite message counts cannot fan out across threads (use -1)");
        }
        if topics.len() != 1 {
            bail!("thread fan-out requires exactly one configured topic");
        }
        let topic = topics.remove(0);
        return Ok(Topology::Threads { count, topic });
    }

    if topics.len() > 1 {
        if budget != MessageBudget::Unbounded {
            bail!("finite message counts cannot fan out across topics (use -1)");
        }
        return Ok(Topology::PerTopic(topics));
    }

    let topic = topics.remove(0);
    Ok(Topology::Single { topic, budget })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Config {
        let mut config: Config = serde_json::from_str(raw).unwrap();
        config.apply_defaults();
        config
    }

    #[test]
    fn zero_means_unset_and_takes_defaults() {
        let config = parse(r#"{"topic": "t", "word_count": 0, "word_length": 0}"#);
        assert_eq!(config.word_count, 1);
        assert_eq!(config.word_length, 1000);
        assert_eq!(config.checkpoint_interval, 1000);
    }

    #[test]
    fn explicit_values_survive_defaulting() {
        let config = parse(
            r#"{"topic": "t", "checkpoint_interval": 50, "word_count": 4, "word_length": 8}"#,
        );
        assert_eq!(config.checkpoint_interval, 50);
        assert_eq!(config.word_count, 4);
        assert_eq!(config.word_length, 8);
    }

    #[test]
    fn topics_list_takes_precedence_over_single_topic() {
        let config = parse(r#"{"topic": "solo", "topics": ["a", "b"]}"#);
        assert_eq!(config.effective_topics(), vec!["a", "b"]);

        let config = parse(r#"{"topic": "solo"}"#);
        assert_eq!(config.effective_topics(), vec!["solo"]);
    }

    #[test]
    fn producer_settings_pass_through_untouched() {
        let config = parse(r#"{"topic": "t", "producer": {"bootstrap.servers": "broker:9092", "linger.ms": 20}}"#);
        assert_eq!(config.producer.len(), 2);
        assert_eq!(config.producer["bootstrap.servers"], "broker:9092");
        assert_eq!(config.producer["linger.ms"], 20);
    }

    #[test]
    fn single_topic_bounded_runs_inline() {
        let config = parse(r#"{"topic": "t"}"#);
        let plan = plan_topology(&config, MessageBudget::Bounded(10), None).unwrap();
        assert_eq!(
            plan,
            Topology::Single {
                topic: "t".to_string(),
                budget: MessageBudget::Bounded(10),
            }
        );
    }

    #[test]
    fn thread_fanout_requires_unbounded_budget() {
        let config = parse(r#"{"topic": "t"}"#);
        assert!(plan_topology(&config, MessageBudget::Bounded(10), Some(4)).is_err());

        let plan = plan_topology(&config, MessageBudget::Unbounded, Some(4)).unwrap();
        assert_eq!(
            plan,
            Topology::Threads {
                count: 4,
                topic: "t".to_string(),
            }
        );
    }

    #[test]
    fn multi_topic_fanout_requires_unbounded_budget() {
        let config = parse(r#"{"topics": ["a", "b"]}"#);
        assert!(plan_topology(&config, MessageBudget::Bounded(10), None).is_err());

        let plan = plan_topology(&config, MessageBudget::Unbounded, None).unwrap();
        assert_eq!(
            plan,
            Topology::PerTopic(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn illegal_fanout_combinations_fail_fast() {
        let config = parse(r#"{"topics": ["a", "b"]}"#);
        assert!(plan_topology(&config, MessageBudget::Unbounded, Some(2)).is_err());

        let config = parse(r#"{"topic": "t"}"#);
        assert!(plan_topology(&config, MessageBudget::Unbounded, Some(0)).is_err());

        let config = parse("{}");
        assert!(plan_topology(&config, MessageBudget::Unbounded, None).is_err());
    }
}
