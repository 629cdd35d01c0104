//! 이벤트 허브 — 레지스트리, 연결 관리자, 브로드캐스터의 조립
//!
//! [`EventHub`]는 세션 생명주기와 observer fan-out의 단일 진입점입니다.
//! 세션을 열면 세션 전용 이벤트 큐와 pump 태스크가 생깁니다:
//!
//! ```text
//! ScanEngine -> mpsc(세션별) -> pump -> 권위 reducer fold -> observer fan-out
//! ```
//!
//! pump는 세션당 하나뿐인 publish 경로이므로 생산 순서가 그대로
//! 전달 순서가 되고, 터미널 이벤트를 발행한 뒤 즉시 종료하므로
//! 터미널 이후에는 어떤 이벤트도 발행될 수 없습니다.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc;

use scanwire_core::event::ScanEvent;
use scanwire_core::snapshot::{LogLimits, SessionSnapshot};
use scanwire_core::types::{ScanMode, Session};
use scanwire_core::wire::ServerNotice;

use crate::connection::{ConnectionManager, ObserverConnection, SendOutcome};
use crate::error::HubError;
use crate::registry::SessionRegistry;

/// 이벤트 허브
///
/// 모든 구성 요소를 소유하는 핸들입니다. clone은 값싸고(내부 `Arc`)
/// 전역 상태가 아니므로 테스트에서 독립된 허브를 여러 개 띄울 수 있습니다.
#[derive(Clone)]
pub struct EventHub {
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionManager>,
    send_queue_capacity: usize,
    event_queue_capacity: usize,
}

impl EventHub {
    /// 빌더를 반환합니다.
    pub fn builder() -> EventHubBuilder {
        EventHubBuilder::new()
    }

    // ─── 세션 생명주기 ───────────────────────────────────────────

    /// 세션을 생성하고 이벤트 큐와 pump 태스크를 개설합니다.
    ///
    /// 반환된 송신단은 이벤트 생산자(스캔 엔진)에 전달됩니다.
    /// pump가 터미널 이벤트를 처리하면 수신단이 닫히므로,
    /// 이후의 send는 실패하고 생산자는 중단됩니다.
    pub async fn open_session(
        &self,
        target: &str,
        mode: ScanMode,
    ) -> Result<(Session, mpsc::Sender<ScanEvent>), HubError> {
        let session = self.registry.create(target, mode).await?;
        let (event_tx, event_rx) = mpsc::channel(self.event_queue_capacity);
        tokio::spawn(run_session_pump(
            self.clone(),
            session.id.clone(),
            event_rx,
        ));
        Ok((session, event_tx))
    }

    /// 세션 메타데이터를 조회합니다.
    pub async fn session(&self, id: &str) -> Result<Session, HubError> {
        self.registry.session(id).await
    }

    /// 세션 스냅샷을 조회합니다 (히스토리 질의).
    pub async fn snapshot(&self, id: &str) -> Result<SessionSnapshot, HubError> {
        self.registry.snapshot(id).await
    }

    /// 전체 세션 목록을 반환합니다.
    pub async fn sessions(&self) -> Vec<Session> {
        self.registry.sessions().await
    }

    /// 세션을 제거합니다 (운영자 전용 — 터미널 세션도 이 경로로만 제거).
    pub async fn evict(&self, id: &str) -> Result<(), HubError> {
        let observers = self.registry.evict(id).await?;
        for observer_id in observers {
            if let Some(connection) = self.connections.get(&observer_id).await {
                connection.detach_session(id);
            }
        }
        Ok(())
    }

    // ─── observer 연결 ──────────────────────────────────────────

    /// 새 observer 연결을 등록합니다.
    ///
    /// 반환된 수신단은 전송 계층(writer 태스크)이 소비합니다.
    pub async fn register_observer(
        &self,
    ) -> (Arc<ObserverConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(self.send_queue_capacity);
        let connection = self.connections.register(tx).await;
        tracing::debug!(conn_id = %connection.id, "observer registered");
        (connection, rx)
    }

    /// 연결을 세션에 attach합니다 — catch-up 스냅샷이 즉시 전달됩니다.
    pub async fn attach(
        &self,
        session_id: &str,
        connection: &Arc<ObserverConnection>,
    ) -> Result<(), HubError> {
        self.registry.attach(session_id, connection).await
    }

    /// 연결을 세션에서 detach합니다 (멱등).
    pub async fn detach(&self, session_id: &str, connection: &Arc<ObserverConnection>) {
        self.registry.detach(session_id, connection).await;
    }

    /// 연결을 완전히 정리합니다.
    ///
    /// 전송 종료와 하트비트 타임아웃이 공유하는 경로입니다:
    /// 연결 테이블에서 제거하고, 구독 중이던 모든 세션에서 detach한 뒤,
    /// 같은 세션을 보던 나머지 observer들에게 정보성
    /// `connection_status: disconnected` 알림을 보냅니다.
    pub async fn disconnect(&self, connection_id: &str) {
        let Some(connection) = self.connections.remove(connection_id).await else {
            return;
        };
        let session_ids = connection.attached_sessions();
        for session_id in &session_ids {
            self.registry.detach_id(session_id, connection_id).await;
        }

        let notice = ServerNotice::ConnectionStatus {
            status: "disconnected".to_owned(),
            connection_id: connection_id.to_owned(),
        };
        for session_id in &session_ids {
            self.registry
                .notify_observers(session_id, &notice, &self.connections)
                .await;
        }
        tracing::info!(
            conn_id = %connection_id,
            sessions = session_ids.len(),
            dropped = connection.drop_count(),
            "observer disconnected"
        );
    }

    /// 현재 연결 수를 반환합니다.
    pub async fn connection_count(&self) -> usize {
        self.connections.count().await
    }

    /// 세션의 observer 연결 ID 목록을 반환합니다.
    pub async fn observer_ids(&self, session_id: &str) -> Result<Vec<String>, HubError> {
        self.registry.observer_ids(session_id).await
    }

    // ─── publish 경로 ───────────────────────────────────────────

    /// 세션 이벤트 하나를 발행합니다.
    ///
    /// 허브 내부(pump)에서 호출됩니다. fan-out 중 닫힌 것으로 판명된
    /// 연결은 이 호출 안에서 완전히 정리됩니다.
    pub async fn publish(&self, event: &ScanEvent) -> Result<(), HubError> {
        let closed = self.registry.publish(event, &self.connections).await?;
        for connection_id in closed {
            self.disconnect(&connection_id).await;
        }
        Ok(())
    }

    /// 등록된 모든 연결에 `Heartbeat` 이벤트를 push합니다.
    ///
    /// 세션 스코프가 아니므로 attach 여부와 무관하게 전달됩니다.
    pub async fn broadcast_heartbeat(&self) {
        let event = ScanEvent::Heartbeat {
            timestamp: SystemTime::now(),
        };
        let json = match serde_json::to_string(&event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize heartbeat");
                return;
            }
        };
        let mut closed = Vec::new();
        for connection in self.connections.all().await {
            if connection.send(json.clone()) == SendOutcome::Closed {
                closed.push(connection.id.clone());
            }
        }
        for connection_id in closed {
            self.disconnect(&connection_id).await;
        }
    }
}

/// 세션별 publish pump
///
/// 단일 소비자이므로 생산 순서가 곧 전달 순서입니다.
/// 터미널 이벤트 처리 후 즉시 종료하고 큐를 닫습니다.
async fn run_session_pump(
    hub: EventHub,
    session_id: String,
    mut event_rx: mpsc::Receiver<ScanEvent>,
) {
    while let Some(event) = event_rx.recv().await {
        let terminal = event.is_terminal();
        match hub.publish(&event).await {
            Ok(()) => {}
            Err(HubError::UnknownSession { .. }) => {
                // 세션이 evict됨 — 남은 이벤트는 버림
                tracing::debug!(%session_id, "session evicted, stopping pump");
                break;
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "publish failed, dropping event");
            }
        }
        if terminal {
            tracing::debug!(%session_id, "terminal event published, pump stopping");
            break;
        }
    }
    // 큐를 닫아 생산자의 이후 send를 실패시킴 — 터미널 이후 발행 금지
    event_rx.close();
}

/// 이벤트 허브 빌더
///
/// 허브를 구성하고 큐 용량을 설정합니다.
pub struct EventHubBuilder {
    limits: LogLimits,
    send_queue_capacity: usize,
    event_queue_capacity: usize,
}

impl EventHubBuilder {
    /// 기본값으로 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            limits: LogLimits::default(),
            send_queue_capacity: 256,
            event_queue_capacity: 256,
        }
    }

    /// 유계 로그 보존 개수를 설정합니다.
    pub fn limits(mut self, limits: LogLimits) -> Self {
        self.limits = limits;
        self
    }

    /// observer당 송신 큐 용량을 설정합니다.
    pub fn send_queue_capacity(mut self, capacity: usize) -> Self {
        self.send_queue_capacity = capacity;
        self
    }

    /// 세션별 이벤트 큐 용량을 설정합니다.
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity;
        self
    }

    /// 허브를 빌드합니다.
    pub fn build(self) -> EventHub {
        EventHub {
            registry: Arc::new(SessionRegistry::new(self.limits)),
            connections: Arc::new(ConnectionManager::new()),
            send_queue_capacity: self.send_queue_capacity.max(1),
            event_queue_capacity: self.event_queue_capacity.max(1),
        }
    }
}

impl Default for EventHubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use scanwire_core::types::{ScanSummary, SessionStatus};

    use super::*;

    fn hub() -> EventHub {
        EventHub::builder().build()
    }

    #[tokio::test]
    async fn open_session_returns_event_sender() {
        let hub = hub();
        let (session, event_tx) = hub.open_session("example.com", ScanMode::Quick).await.unwrap();
        assert!(!event_tx.is_closed());
        assert_eq!(hub.session(&session.id).await.unwrap().target, "example.com");
    }

    #[tokio::test]
    async fn pump_closes_queue_after_terminal_event() {
        let hub = hub();
        let (session, event_tx) = hub.open_session("example.com", ScanMode::Quick).await.unwrap();

        event_tx
            .send(ScanEvent::SessionCompleted {
                session_id: session.id.clone(),
                summary: ScanSummary::default(),
            })
            .await
            .unwrap();

        // pump가 터미널을 처리하고 큐를 닫을 때까지 대기
        event_tx.closed().await;

        let event = ScanEvent::Progress {
            session_id: session.id.clone(),
            percent: 99,
            phase: "late".to_owned(),
        };
        assert!(event_tx.send(event).await.is_err());

        let snapshot = hub.snapshot(&session.id).await.unwrap();
        assert_eq!(snapshot.session.status, SessionStatus::Completed);
        assert_eq!(snapshot.session.progress, 100);
    }

    #[tokio::test]
    async fn disconnect_notifies_remaining_observers() {
        let hub = hub();
        let (session, _event_tx) = hub.open_session("example.com", ScanMode::Quick).await.unwrap();

        let (conn_a, mut rx_a) = hub.register_observer().await;
        let (conn_b, mut rx_b) = hub.register_observer().await;
        hub.attach(&session.id, &conn_a).await.unwrap();
        hub.attach(&session.id, &conn_b).await.unwrap();
        let _ = rx_a.recv().await; // 스냅샷 소비
        let _ = rx_b.recv().await;

        hub.disconnect(&conn_b.id).await;

        let msg = rx_a.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "connection_status");
        assert_eq!(value["status"], "disconnected");
        assert_eq!(value["connection_id"], conn_b.id.as_str());

        // 끊긴 당사자는 알림을 받지 않음
        assert!(rx_b.try_recv().is_err());
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn disconnect_unknown_connection_is_noop() {
        let hub = hub();
        hub.disconnect("no-such-connection").await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn broadcast_heartbeat_reaches_all_connections() {
        let hub = hub();
        let (_conn_a, mut rx_a) = hub.register_observer().await;
        let (_conn_b, mut rx_b) = hub.register_observer().await;

        hub.broadcast_heartbeat().await;

        for rx in [&mut rx_a, &mut rx_b] {
            let msg = rx.recv().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
            assert_eq!(value["type"], "heartbeat");
        }
    }

    #[tokio::test]
    async fn evict_detaches_observers() {
        let hub = hub();
        let (session, _event_tx) = hub.open_session("example.com", ScanMode::Quick).await.unwrap();
        let (conn, mut rx) = hub.register_observer().await;
        hub.attach(&session.id, &conn).await.unwrap();
        let _ = rx.recv().await;

        hub.evict(&session.id).await.unwrap();
        assert!(!conn.observes(&session.id));
        assert!(hub.session(&session.id).await.is_err());
    }
}
