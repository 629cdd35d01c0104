//! observer 연결 상태 — 연결 관리자와 연결별 송신 큐
//!
//! [`ObserverConnection`]은 연결 관리자가 배타적으로 소유하며,
//! 브로드캐스터는 라이브 집합을 읽기만 합니다. 송신은 `try_send` 기반으로
//! 절대 블로킹하지 않습니다 — 큐가 가득 찬 느린 observer의 메시지는
//! 드롭 카운터에 기록되고, 닫힌 연결은 기회적으로 정리됩니다.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::gauge;
use parking_lot::Mutex;
use tokio::sync::{RwLock, mpsc};

use scanwire_core::metrics as m;

/// 송신 시도 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 큐에 적재됨
    Sent,
    /// 큐 포화 — 메시지 드롭, 연결은 유지
    Full,
    /// 채널 닫힘 — 연결 정리 대상
    Closed,
}

/// 연결된 observer 하나
///
/// 여러 세션을 동시에 구독할 수 있습니다. liveness 플래그는
/// 하트비트 모니터가 check-and-reset 방식으로 사용합니다.
pub struct ObserverConnection {
    /// 연결 고유 ID (UUID v4)
    pub id: String,
    /// 직렬화된 메시지를 writer 태스크로 보내는 송신 큐
    tx: mpsc::Sender<Arc<String>>,
    /// 구독 중인 세션 ID 집합
    sessions: Mutex<HashSet<String>>,
    /// 마지막 점검 이후 생존 신호 수신 여부
    pub is_alive: AtomicBool,
    /// 마지막 생존 신호 시각
    last_seen: Mutex<Instant>,
    /// 큐 포화로 드롭된 메시지 수
    pub dropped_messages: AtomicU64,
    /// 연결 수립 시각
    pub connected_at: Instant,
}

impl ObserverConnection {
    /// 새 연결을 생성합니다.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            sessions: Mutex::new(HashSet::new()),
            is_alive: AtomicBool::new(true),
            last_seen: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            connected_at: now,
        }
    }

    /// 직렬화된 메시지를 non-blocking으로 송신합니다.
    pub fn send(&self, message: Arc<String>) -> SendOutcome {
        match self.tx.try_send(message) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                SendOutcome::Full
            }
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// 값을 직렬화하여 송신합니다.
    pub fn send_json<T: serde::Serialize>(&self, value: &T) -> SendOutcome {
        match serde_json::to_string(value) {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                tracing::warn!(conn_id = %self.id, error = %e, "failed to serialize message");
                SendOutcome::Full
            }
        }
    }

    /// 세션 구독을 기록합니다.
    pub fn attach_session(&self, session_id: &str) {
        self.sessions.lock().insert(session_id.to_owned());
    }

    /// 세션 구독 기록을 제거합니다 (멱등).
    pub fn detach_session(&self, session_id: &str) {
        self.sessions.lock().remove(session_id);
    }

    /// 해당 세션을 구독 중인지 확인합니다.
    pub fn observes(&self, session_id: &str) -> bool {
        self.sessions.lock().contains(session_id)
    }

    /// 구독 중인 세션 ID 목록의 스냅샷 복사본을 반환합니다.
    pub fn attached_sessions(&self) -> Vec<String> {
        self.sessions.lock().iter().cloned().collect()
    }

    /// 생존 신호를 기록합니다 (ping/pong 또는 임의 활동 수신 시).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// 생존 플래그를 확인하고 리셋합니다.
    ///
    /// 마지막 점검 이후 생존 신호가 있었으면 `true`를 반환합니다.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// 마지막 생존 신호 이후 경과 시간을 반환합니다.
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// 드롭된 메시지 수를 반환합니다.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// 연결 수립 후 경과 시간을 반환합니다.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// observer 연결 관리자
///
/// 연결 ID로 인덱싱된 전체 연결 테이블을 소유합니다.
/// fan-out 반복은 테이블의 스냅샷 복사본 위에서 이루어지므로
/// 반복 중 제거를 허용합니다.
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, Arc<ObserverConnection>>>,
}

impl ConnectionManager {
    /// 빈 연결 관리자를 생성합니다.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// 새 연결을 등록하고 핸들을 반환합니다.
    pub async fn register(&self, tx: mpsc::Sender<Arc<String>>) -> Arc<ObserverConnection> {
        let id = uuid::Uuid::new_v4().to_string();
        let connection = Arc::new(ObserverConnection::new(id.clone(), tx));
        let mut conns = self.connections.write().await;
        let _ = conns.insert(id, connection.clone());
        #[allow(clippy::cast_precision_loss)]
        gauge!(m::HUB_CONNECTIONS_ACTIVE).set(conns.len() as f64);
        connection
    }

    /// 연결을 조회합니다.
    pub async fn get(&self, connection_id: &str) -> Option<Arc<ObserverConnection>> {
        self.connections.read().await.get(connection_id).cloned()
    }

    /// 연결을 제거하고 핸들을 반환합니다.
    pub async fn remove(&self, connection_id: &str) -> Option<Arc<ObserverConnection>> {
        let mut conns = self.connections.write().await;
        let removed = conns.remove(connection_id);
        #[allow(clippy::cast_precision_loss)]
        gauge!(m::HUB_CONNECTIONS_ACTIVE).set(conns.len() as f64);
        removed
    }

    /// 현재 등록된 연결 수를 반환합니다.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// 전체 연결의 스냅샷 복사본을 반환합니다.
    pub async fn all(&self) -> Vec<Arc<ObserverConnection>> {
        self.connections.read().await.values().cloned().collect()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
