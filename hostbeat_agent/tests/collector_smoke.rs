//! Live sampling smoke test: bounds and ordering invariants on a real batch.

use hostbeat_agent::collector::TelemetryCollector;
use hostbeat_agent::types::TelemetryEvent;

#[tokio::test]
async fn collect_produces_bounded_ordered_batch() {
    let mut collector = TelemetryCollector::new().await;
    let batch = collector.collect("smoke-host").await;

    assert_eq!(batch.agent_id, "smoke-host");
    assert_eq!(batch.platform, std::env::consts::OS);
    assert!(!batch.events.is_empty());

    // events[0] is always the system metric, cpu within [0, 1].
    match &batch.events[0] {
        TelemetryEvent::Metric { cpu, .. } => {
            assert!((0.0..=1.0).contains(cpu), "cpu out of bounds: {cpu}");
        }
        other => panic!("first event must be the metric, got {other:?}"),
    }

    // At most three process events, strictly positive, descending.
    let procs = &batch.events[1..];
    assert!(procs.len() <= 3, "too many process events: {}", procs.len());
    let mut previous = f64::INFINITY;
    for event in procs {
        match event {
            TelemetryEvent::Proc { cpu, .. } => {
                assert!(*cpu > 0.0, "idle process made it into the batch");
                assert!(*cpu <= previous, "process events not sorted descending");
                previous = *cpu;
            }
            other => panic!("only proc events may follow the metric, got {other:?}"),
        }
    }
}
