//! Synthetic load generator for publish-oriented message brokers.
//!
//! Produces randomly generated, timestamped JSON payloads to one or more
//! topics at a fixed inter-message delay, fanned out across topics or
//! concurrent workers, with periodic throughput checkpoints. All broker
//! concerns (batching, retries, partitioning, network I/O) live behind the
//! [`transport`] seam.

pub mod checkpoint;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod payload;
pub mod rate;
pub mod roles;
pub mod transport;
