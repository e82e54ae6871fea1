//! Integration tests running the backend against the simulated target
//!
//! Run with: cargo test --features mock-target

#![cfg(feature = "mock-target")]

mod common;

use common::builders::ConfigBuilder;
use common::{assert_float_eq, test_timeout};
use ocdplot_rs::backend::{MockDataPattern, MockTarget, SamplerBackend, SessionMessage, StopReason};
use ocdplot_rs::config::RecordFormat;
use ocdplot_rs::types::Representation;
use std::sync::atomic::Ordering;
use std::thread;

#[test]
fn test_sine_pattern_is_sampled_in_order() {
    let config = ConfigBuilder::new(4444).interval_ms(1).build();
    let target = MockTarget::new().with_variable(
        0x2000_0000,
        Representation::Float32,
        MockDataPattern::Sine {
            period: 8.0,
            amplitude: 10.0,
            offset: 0.0,
        },
    );
    let closes = target.close_counter();
    let pattern = MockDataPattern::Sine {
        period: 8.0,
        amplitude: 10.0,
        offset: 0.0,
    };

    let (backend, handle) = SamplerBackend::new(config);
    let worker = thread::spawn(move || backend.run_with_transport(target));

    let mut received = 0u64;
    while received < 8 {
        if let Some(SessionMessage::Sample(update)) = handle.recv_timeout(test_timeout()) {
            assert_eq!(update.sample.frame, received);
            assert_float_eq(
                update.sample.value.as_f64(),
                pattern.value_at(received),
                1e-5,
            );
            received += 1;
        }
    }

    handle.stop();
    assert_eq!(worker.join().unwrap(), StopReason::Requested);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_glitches_are_recorded_as_stale() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("samples.csv");

    let mut config = ConfigBuilder::new(4444)
        .representation(Representation::Int32)
        .interval_ms(1)
        .build();
    config.recording.enabled = true;
    config.recording.file_path = Some(path.clone());
    config.recording.format = RecordFormat::Csv;

    let target = MockTarget::new()
        .with_variable(
            0x2000_0000,
            Representation::Int32,
            MockDataPattern::Constant(-12.0),
        )
        .with_garble_every(3)
        .with_disconnect_after(6);

    let (backend, handle) = SamplerBackend::new(config);
    assert_eq!(backend.run_with_transport(target), StopReason::TransportFailed);

    let stale: Vec<bool> = handle
        .drain()
        .into_iter()
        .filter_map(|m| match m {
            SessionMessage::Sample(update) => Some(update.sample.stale),
            _ => None,
        })
        .collect();
    assert_eq!(stale, vec![false, false, true, false, false, true]);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[1].ends_with(",0,-12,int32_t,false"));
    assert!(lines[3].ends_with(",2,0,int32_t,true"));
}
