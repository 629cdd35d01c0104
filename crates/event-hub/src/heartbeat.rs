//! 하트비트 — observer 연결 liveness 점검
//!
//! 연결별 모니터 태스크가 주기적으로 생존 플래그를 check-and-reset합니다.
//! timeout 동안 생존 신호가 없으면 연결은 dead로 판정되어 모든 세션에서
//! detach되고, 공유 세션의 나머지 observer에게 정보성 알림이 전파됩니다.
//! 이벤트 생산 타이머와는 완전히 독립적으로 동작합니다.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use metrics::counter;
use tokio::time;
use tokio_util::sync::CancellationToken;

use scanwire_core::metrics as m;

use crate::connection::ObserverConnection;
use crate::hub::EventHub;

/// 하트비트 루프의 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// timeout 내에 생존 신호가 없어 dead 판정
    TimedOut,
    /// 외부에서 취소됨 (정상 연결 종료)
    Cancelled,
}

/// 연결 하나의 하트비트 점검 루프를 실행합니다.
///
/// `interval`마다 생존 플래그를 확인합니다. 연속 miss 횟수가
/// `timeout / interval`(최소 1)에 도달하면 [`HeartbeatResult::TimedOut`]을
/// 반환합니다. 생존 신호가 한 번이라도 오면 miss 카운트는 리셋됩니다.
pub async fn run_heartbeat(
    connection: Arc<ObserverConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut check_interval = time::interval(interval);
    // 첫 틱은 즉시 발화하므로 건너뜀
    check_interval.tick().await;

    let mut missed: u32 = 0;
    let interval_secs = interval.as_secs().max(1);
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_secs() / interval_secs).max(1) as u32;

    loop {
        tokio::select! {
            _ = check_interval.tick() => {
                if connection.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
                // 다음 생존 신호까지 not-alive로 표시
                connection.is_alive.store(false, Ordering::Relaxed);
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}

/// 연결 모니터 태스크를 스폰합니다.
///
/// 타임아웃 시 허브의 disconnect 경로로 정리를 위임합니다 —
/// attach/detach와 같은 동기화 규율을 공유하므로 경합으로 인한
/// observer 집합 손상이 없습니다.
pub fn spawn_connection_monitor(
    hub: EventHub,
    connection: Arc<ObserverConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<HeartbeatResult> {
    tokio::spawn(async move {
        let result = run_heartbeat(connection.clone(), interval, timeout, cancel).await;
        if result == HeartbeatResult::TimedOut {
            counter!(m::HUB_HEARTBEAT_TIMEOUTS_TOTAL).increment(1);
            tracing::warn!(
                conn_id = %connection.id,
                last_seen_secs = connection.last_seen_elapsed().as_secs(),
                "heartbeat timeout, reaping connection"
            );
            hub.disconnect(&connection.id).await;
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use scanwire_core::types::ScanMode;

    use super::*;

    fn make_connection() -> Arc<ObserverConnection> {
        let (tx, _rx) = mpsc::channel(8);
        Arc::new(ObserverConnection::new("hb-conn".to_owned(), tx))
    }

    #[tokio::test]
    async fn cancelled_heartbeat_returns_cancelled() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_heartbeat(
            conn,
            Duration::from_secs(60),
            Duration::from_secs(180),
            cancel,
        )
        .await;
        assert_eq!(result, HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_connection_times_out() {
        let conn = make_connection();
        conn.is_alive.store(false, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        // timeout=30s, interval=10s → 3회 연속 miss 후 타임아웃
        let result = run_heartbeat(
            conn,
            Duration::from_secs(10),
            Duration::from_secs(30),
            cancel,
        )
        .await;
        assert_eq!(result, HeartbeatResult::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn alive_signals_reset_missed_count() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        let monitor_conn = conn.clone();
        let monitor_cancel = cancel.clone();

        let handle = tokio::spawn(run_heartbeat(
            monitor_conn,
            Duration::from_secs(10),
            Duration::from_secs(30),
            monitor_cancel,
        ));

        // 주기보다 촘촘한 생존 신호 — 타임아웃이 일어나지 않아야 함
        for _ in 0..10 {
            time::sleep(Duration::from_secs(8)).await;
            conn.mark_alive();
        }
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_reaps_dead_connection_from_all_sessions() {
        let hub = EventHub::builder().build();
        let (session, _event_tx) = hub.open_session("example.com", ScanMode::Quick).await.unwrap();

        let (conn, _rx) = hub.register_observer().await;
        hub.attach(&session.id, &conn).await.unwrap();
        conn.is_alive.store(false, Ordering::Relaxed);

        let cancel = CancellationToken::new();
        let handle = spawn_connection_monitor(
            hub.clone(),
            conn.clone(),
            Duration::from_secs(10),
            Duration::from_secs(30),
            cancel,
        );

        assert_eq!(handle.await.unwrap(), HeartbeatResult::TimedOut);
        assert_eq!(hub.connection_count().await, 0);
        assert!(hub.observer_ids(&session.id).await.unwrap().is_empty());
    }
}
