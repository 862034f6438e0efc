//! Integration tests that talk to a real sensor on the local network.
//!
//! These tests are gated by environment variables:
//! - `QS_SENSOR_HOST` — sensor control endpoint (e.g., `192.168.1.42:5533`)

use std::time::Duration;

use quakesaver_rs_client::{LivenessProber, StreamSession, StreamSupervisor};

fn sensor_host() -> Option<String> {
    std::env::var("QS_SENSOR_HOST").ok()
}

#[tokio::test]
async fn probe_real_sensor() {
    let Some(host) = sensor_host() else {
        eprintln!("skipping: QS_SENSOR_HOST not set");
        return;
    };

    let prober = LivenessProber::new();
    let report = prober.probe(&host).await;
    assert!(report.alive, "sensor at {host} did not answer the probe");

    if let Some(identity) = report.identity {
        eprintln!("sensor {}@{host} version {}", identity.uid, identity.software_version);
    }
}

#[tokio::test]
async fn stream_a_few_frames() {
    let Some(host) = sensor_host() else {
        eprintln!("skipping: QS_SENSOR_HOST not set");
        return;
    };

    let mut session = StreamSession::new(&host).unwrap();
    session.start().await.unwrap();

    for i in 0..3 {
        let frame = tokio::time::timeout(Duration::from_secs(30), session.next_frame())
            .await
            .unwrap_or_else(|_| panic!("timeout waiting for frame {i}"))
            .unwrap_or_else(|e| panic!("error reading frame {i}: {e}"));

        if let Some(frame) = frame {
            eprintln!(
                "frame {i}: uid={}, channels={}, delta_t={}",
                frame.uid,
                frame.data.len(),
                frame.delta_t
            );
            assert!(frame.is_decoded());
        }
    }

    session.stop().await.unwrap();
}

#[tokio::test]
async fn supervised_stream_keeps_going() {
    let Some(host) = sensor_host() else {
        eprintln!("skipping: QS_SENSOR_HOST not set");
        return;
    };

    let mut supervisor = StreamSupervisor::new(&host).unwrap();
    for i in 0..5 {
        let frame = tokio::time::timeout(Duration::from_secs(30), supervisor.next_frame())
            .await
            .unwrap_or_else(|_| panic!("timeout waiting for frame {i}"));
        eprintln!("frame {i}: uid={}", frame.uid);
    }
    supervisor.stop().await.unwrap();
}
