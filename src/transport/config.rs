use super::{ConnectOptions, Engine};
use anyhow::{Result, bail};
use std::collections::BTreeMap;

pub fn parse_engine(s: &str) -> Option<Engine> {
    match s.to_lowercase().as_str() {
        "kafka" => Some(Engine::Kafka),
        #[cfg(any(test, feature = "transport-mock"))]
        "mock" => Some(Engine::Mock),
        _ => None,
    }
}

/// Flatten the config file's opaque `producer` map into connect options.
/// Scalars are stringified the way the client expects its properties; nested
/// values have no client equivalent and are rejected.
pub fn client_options(settings: &BTreeMap<String, serde_json::Value>) -> Result<ConnectOptions> {
    let mut opts = ConnectOptions::default();
    for (key, value) in settings {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => bail!("producer setting {key:?} must be a scalar, got {other}"),
        };
        opts.params.insert(key.clone(), rendered);
    }
    Ok(opts)
}
