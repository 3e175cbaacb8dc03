//! Data types sent to the ingest service.
//! Keep this module minimal and stable — it defines the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sampled event. Internally tagged so a `metric` event never carries
/// process fields and a `proc` event never carries `mem_free`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TelemetryEvent {
    Metric {
        /// Whole-system CPU utilization in [0, 1].
        cpu: f64,
        /// Available memory, bytes.
        mem_free: u64,
    },
    Proc {
        pid: u32,
        name: String,
        /// Share of total machine CPU over the sampling window, >= 0.
        cpu: f64,
        /// Resident set size, bytes.
        rss: u64,
    },
}

/// One collection cycle's payload: the metric event first, then up to three
/// process events sorted descending by CPU share.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Batch {
    pub agent_id: String,
    pub ts: DateTime<Utc>,
    pub platform: String,
    pub events: Vec<TelemetryEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> Batch {
        Batch {
            agent_id: "test-host".into(),
            ts: Utc::now(),
            platform: "linux".into(),
            events: vec![
                TelemetryEvent::Metric {
                    cpu: 0.1234,
                    mem_free: 8_589_934_592,
                },
                TelemetryEvent::Proc {
                    pid: 4242,
                    name: "cargo".into(),
                    cpu: 0.25,
                    rss: 104_857_600,
                },
            ],
        }
    }

    #[test]
    fn metric_event_omits_process_fields() {
        let json = serde_json::to_string(&TelemetryEvent::Metric {
            cpu: 0.5,
            mem_free: 1024,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"metric\""));
        assert!(!json.contains("pid"));
        assert!(!json.contains("name"));
        assert!(!json.contains("rss"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn proc_event_omits_mem_free() {
        let json = serde_json::to_string(&TelemetryEvent::Proc {
            pid: 1,
            name: "init".into(),
            cpu: 0.01,
            rss: 2048,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"proc\""));
        assert!(!json.contains("mem_free"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn batch_round_trips() {
        let batch = sample_batch();
        let json = serde_json::to_string(&batch).unwrap();
        let parsed: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(batch, parsed);
    }
}
