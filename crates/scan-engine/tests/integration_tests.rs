//! 통합 테스트 — 엔진에서 허브, reducer까지의 전체 파이프라인 검증
//!
//! 시뮬레이션 엔진이 허브의 세션 큐로 이벤트를 흘리고, observer가
//! 수신한 스트림을 로컬 reducer로 fold한 최종 상태를 검증합니다.

use tokio_util::sync::CancellationToken;

use scanwire_core::config::EngineConfig;
use scanwire_core::event::ScanEvent;
use scanwire_core::snapshot::LogLimits;
use scanwire_core::types::{ScanMode, ScanOptions, SessionStatus};
use scanwire_core::wire::{ObserverMessage, ServerNotice};
use scanwire_event_hub::EventHub;
use scanwire_reducer::SessionReducer;
use scanwire_scan_engine::{EventSink, ScanEngine, ScanSpec, SimScanEngine};

fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        tick_min_ms: 10,
        tick_max_ms: 30,
        ..EngineConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn engine_stream_folds_to_completed_snapshot() {
    let hub = EventHub::builder().build();
    let (session, event_tx) = hub.open_session("example.com", ScanMode::Elite).await.unwrap();

    // observer를 먼저 attach — 전체 스트림을 수신
    let (conn, mut rx) = hub.register_observer().await;
    hub.attach(&session.id, &conn).await.unwrap();

    let engine = SimScanEngine::new(fast_engine_config());
    let spec = ScanSpec {
        session_id: session.id.clone(),
        target: session.target.clone(),
        mode: session.mode,
        options: ScanOptions {
            seed: Some(99),
            fail: false,
        },
    };
    let engine_handle = tokio::spawn(engine.run(
        spec,
        EventSink::new(event_tx),
        CancellationToken::new(),
    ));

    // 수신 스트림을 로컬 reducer로 fold
    let mut reducer = SessionReducer::new(session.clone(), LogLimits::default());
    let mut saw_snapshot = false;
    loop {
        let Some(msg) = rx.recv().await else {
            panic!("stream ended before terminal event");
        };
        let parsed: ObserverMessage = serde_json::from_str(&msg).unwrap();
        match parsed {
            ObserverMessage::Notice(ServerNotice::Snapshot { session_id, .. }) => {
                assert_eq!(session_id, session.id);
                saw_snapshot = true;
            }
            ObserverMessage::Notice(_) => {}
            ObserverMessage::Event(event) => {
                let terminal = event.is_terminal();
                reducer.apply(&event).unwrap();
                if terminal {
                    break;
                }
            }
        }
    }
    engine_handle.await.unwrap().unwrap();

    assert!(saw_snapshot);
    let local = reducer.snapshot();
    assert_eq!(local.session.status, SessionStatus::Completed);
    assert_eq!(local.session.progress, 100);

    // 로컬 fold 결과가 서버의 권위 스냅샷과 일치해야 함
    let authoritative = hub.snapshot(&session.id).await.unwrap();
    assert_eq!(authoritative.stats, local.stats);
    assert_eq!(authoritative.session.status, local.session.status);
    assert_eq!(authoritative.findings.len(), local.findings.len());
    assert_eq!(local.summary, Some(local.stats));
}

#[tokio::test(start_paused = true)]
async fn failed_scan_surfaces_failure_to_observers() {
    let hub = EventHub::builder().build();
    let (session, event_tx) = hub.open_session("dead.example.com", ScanMode::Quick).await.unwrap();

    let (conn, mut rx) = hub.register_observer().await;
    hub.attach(&session.id, &conn).await.unwrap();
    let _ = rx.recv().await; // 스냅샷 소비

    let engine = SimScanEngine::new(fast_engine_config());
    let spec = ScanSpec {
        session_id: session.id.clone(),
        target: session.target.clone(),
        mode: session.mode,
        options: ScanOptions {
            seed: Some(1),
            fail: true,
        },
    };
    let result = engine
        .run(spec, EventSink::new(event_tx), CancellationToken::new())
        .await;
    assert!(result.is_err());

    let started = rx.recv().await.unwrap();
    assert!(started.contains("session_started"));
    let failed = rx.recv().await.unwrap();
    let parsed: ObserverMessage = serde_json::from_str(&failed).unwrap();
    match parsed {
        ObserverMessage::Event(ScanEvent::SessionFailed { reason, .. }) => {
            assert_eq!(reason, "target unreachable");
        }
        other => panic!("expected session_failed, got {other:?}"),
    }

    // 세션은 실패 상태로 레지스트리에 남아 조회 가능
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
    loop {
        let snapshot = hub.snapshot(&session.id).await.unwrap();
        if snapshot.session.status == SessionStatus::Failed {
            assert_eq!(snapshot.failure_reason.as_deref(), Some("target unreachable"));
            break;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn reducer_dedups_replayed_engine_stream() {
    // 엔진 스트림을 녹화한 뒤 reducer에 두 번 공급 — 재연결 재전달 시나리오
    let engine = SimScanEngine::new(fast_engine_config());
    let (tx, mut rx) = tokio::sync::mpsc::channel(1024);
    let mut session = scanwire_core::types::Session::new("example.com", ScanMode::Elite);
    session.id = "sess-replay".to_owned();
    let spec = ScanSpec {
        session_id: session.id.clone(),
        target: session.target.clone(),
        mode: session.mode,
        options: ScanOptions {
            seed: Some(77),
            fail: false,
        },
    };
    let handle = tokio::spawn(engine.run(spec, EventSink::new(tx), CancellationToken::new()));

    let mut recorded = Vec::new();
    while let Some(event) = rx.recv().await {
        recorded.push(event);
    }
    handle.await.unwrap().unwrap();

    let mut once = SessionReducer::new(session.clone(), LogLimits::default());
    for event in &recorded {
        once.apply(event).unwrap();
    }
    let mut twice = SessionReducer::new(session, LogLimits::default());
    for event in recorded.iter().chain(recorded.iter()) {
        twice.apply(event).unwrap();
    }

    assert_eq!(once.snapshot().stats, twice.snapshot().stats);
    assert_eq!(once.snapshot().findings.len(), twice.snapshot().findings.len());
}

/// 느린 observer가 생산자를 지연시키지 않아야 합니다 — 큐 포화 시 드롭
#[tokio::test(start_paused = true)]
async fn slow_observer_does_not_stall_producer() {
    let hub = EventHub::builder()
        .send_queue_capacity(1) // 사실상 모든 push가 드롭되는 observer
        .build();
    let (session, event_tx) = hub.open_session("example.com", ScanMode::Full).await.unwrap();
    let (conn, _rx) = hub.register_observer().await;
    // _rx를 소비하지 않음 — 큐가 즉시 포화
    hub.attach(&session.id, &conn).await.unwrap();

    let engine = SimScanEngine::new(fast_engine_config());
    let spec = ScanSpec {
        session_id: session.id.clone(),
        target: session.target.clone(),
        mode: session.mode,
        options: ScanOptions {
            seed: Some(3),
            fail: false,
        },
    };
    // observer가 한 번도 읽지 않아도 스캔은 완료까지 도달
    engine
        .run(spec, EventSink::new(event_tx), CancellationToken::new())
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
    loop {
        let snapshot = hub.snapshot(&session.id).await.unwrap();
        if snapshot.session.status == SessionStatus::Completed {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}
