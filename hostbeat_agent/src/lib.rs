//! Host telemetry agent: samples CPU/memory/process utilization, signs each
//! batch with HMAC-SHA256, and POSTs it to an ingest endpoint. Batches that
//! fail delivery land in a disk-backed FIFO queue and are replayed in order
//! once the endpoint is reachable again.

pub mod agent;
pub mod collector;
pub mod config;
pub mod queue;
pub mod transport;
pub mod types;
