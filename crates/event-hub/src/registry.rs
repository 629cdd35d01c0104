//! 세션 레지스트리 — 세션 생명주기와 observer 집합의 소유자
//!
//! 세션 ID → (권위 스냅샷, observer 집합) 매핑을 소유합니다.
//! 권위 스냅샷은 세션별 [`SessionReducer`]가 publish 경로에서 직접
//! fold하므로, attach 시점의 catch-up 스냅샷은 항상 지금까지 발행된
//! 모든 이벤트를 반영합니다.
//!
//! # 잠금 규율
//!
//! attach와 publish는 같은 write 잠금 아래에서 수행됩니다.
//! 따라서 catch-up 스냅샷 송신과 라이브 이벤트 fan-out은 상호 배제되고,
//! "스냅샷 먼저, 그다음 라이브 이벤트" 순서가 gap/중복 없이 보장됩니다.
//! fan-out 자체는 non-blocking `try_send`이므로 잠금 구간은 짧습니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::sync::RwLock;

use scanwire_core::event::ScanEvent;
use scanwire_core::metrics as m;
use scanwire_core::snapshot::{LogLimits, SessionSnapshot};
use scanwire_core::types::{ScanMode, Session};
use scanwire_core::wire::ServerNotice;
use scanwire_reducer::SessionReducer;

use crate::connection::{ConnectionManager, ObserverConnection, SendOutcome};
use crate::error::HubError;

/// 세션 하나의 레지스트리 항목
struct SessionEntry {
    /// 권위 상태 — publish 순서대로 fold됨
    reducer: SessionReducer,
    /// 구독 중인 연결 ID 집합
    observers: HashSet<String>,
}

/// 세션 레지스트리
///
/// 세션은 운영자의 명시적 [`evict`](SessionRegistry::evict)로만 제거되며,
/// 터미널 상태에 도달해도 히스토리 질의가 가능하도록 유지됩니다.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    limits: LogLimits,
}

impl SessionRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new(limits: LogLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }

    /// 새 세션을 `Pending` 상태로 생성합니다.
    ///
    /// # Errors
    ///
    /// 대상이 비어 있으면 [`HubError::InvalidTarget`].
    pub async fn create(&self, target: &str, mode: ScanMode) -> Result<Session, HubError> {
        if target.trim().is_empty() {
            return Err(HubError::InvalidTarget);
        }

        let session = Session::new(target.trim(), mode);
        let entry = SessionEntry {
            reducer: SessionReducer::new(session.clone(), self.limits),
            observers: HashSet::new(),
        };

        let mut sessions = self.sessions.write().await;
        let _ = sessions.insert(session.id.clone(), entry);
        counter!(m::HUB_SESSIONS_CREATED_TOTAL, m::LABEL_MODE => mode.to_string()).increment(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!(m::HUB_SESSIONS_ACTIVE).set(sessions.len() as f64);

        tracing::info!(session_id = %session.id, target = %session.target, %mode, "session created");
        Ok(session)
    }

    /// 세션 메타데이터를 조회합니다.
    pub async fn session(&self, id: &str) -> Result<Session, HubError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|entry| entry.reducer.snapshot().session.clone())
            .ok_or_else(|| HubError::UnknownSession { id: id.to_owned() })
    }

    /// 세션의 권위 스냅샷을 조회합니다 (히스토리 질의).
    pub async fn snapshot(&self, id: &str) -> Result<SessionSnapshot, HubError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|entry| entry.reducer.snapshot().clone())
            .ok_or_else(|| HubError::UnknownSession { id: id.to_owned() })
    }

    /// 모든 세션의 메타데이터를 최신 생성 순으로 반환합니다.
    pub async fn sessions(&self) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut list: Vec<Session> = sessions
            .values()
            .map(|entry| entry.reducer.snapshot().session.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// 세션을 레지스트리에서 제거합니다 (운영자 전용).
    ///
    /// 제거 당시 구독 중이던 연결 ID 목록을 반환합니다.
    pub async fn evict(&self, id: &str) -> Result<Vec<String>, HubError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .remove(id)
            .ok_or_else(|| HubError::UnknownSession { id: id.to_owned() })?;
        #[allow(clippy::cast_precision_loss)]
        gauge!(m::HUB_SESSIONS_ACTIVE).set(sessions.len() as f64);
        tracing::info!(session_id = %id, "session evicted");
        Ok(entry.observers.into_iter().collect())
    }

    /// 연결을 세션의 observer 집합에 등록합니다.
    ///
    /// 부수 효과: 연결은 이후의 어떤 라이브 이벤트보다도 먼저
    /// 현재 스냅샷을 catch-up으로 수신합니다. 스냅샷을 적재할 수 없는
    /// 연결(닫힘/큐 포화)은 등록이 취소되고 에러를 반환합니다.
    pub async fn attach(
        &self,
        session_id: &str,
        connection: &Arc<ObserverConnection>,
    ) -> Result<(), HubError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| HubError::UnknownSession {
                id: session_id.to_owned(),
            })?;

        let notice = ServerNotice::Snapshot {
            session_id: session_id.to_owned(),
            snapshot: entry.reducer.snapshot().clone(),
        };
        if connection.send_json(&notice) != SendOutcome::Sent {
            return Err(HubError::ConnectionClosed {
                id: connection.id.clone(),
            });
        }

        let _ = entry.observers.insert(connection.id.clone());
        connection.attach_session(session_id);
        tracing::debug!(%session_id, conn_id = %connection.id, "observer attached");
        Ok(())
    }

    /// 연결을 세션의 observer 집합에서 제거합니다 (멱등).
    pub async fn detach(&self, session_id: &str, connection: &Arc<ObserverConnection>) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            let _ = entry.observers.remove(&connection.id);
        }
        connection.detach_session(session_id);
    }

    /// 연결 ID만으로 observer 집합에서 제거합니다 (연결 종료 경로).
    pub async fn detach_id(&self, session_id: &str, connection_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            let _ = entry.observers.remove(connection_id);
        }
    }

    /// 세션의 현재 observer 연결 ID 목록을 반환합니다 (스냅샷 복사본).
    pub async fn observer_ids(&self, session_id: &str) -> Result<Vec<String>, HubError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|entry| entry.observers.iter().cloned().collect())
            .ok_or_else(|| HubError::UnknownSession {
                id: session_id.to_owned(),
            })
    }

    /// 세션 이벤트를 권위 스냅샷에 fold하고 모든 observer에 fan-out합니다.
    ///
    /// 송신 채널이 닫혀 있던 연결 ID 목록을 반환합니다 — 호출자는
    /// 해당 연결을 완전히 정리해야 합니다. publish 실패가 다른 observer의
    /// 전달을 중단시키지 않습니다.
    ///
    /// # Errors
    ///
    /// - [`HubError::UnknownSession`]: 레지스트리에 없는 세션
    /// - [`HubError::Terminated`]: 터미널 이벤트 이후의 publish
    pub async fn publish(
        &self,
        event: &ScanEvent,
        connections: &ConnectionManager,
    ) -> Result<Vec<String>, HubError> {
        let session_id = match event.session_id() {
            Some(id) => id.to_owned(),
            // 세션 스코프가 아닌 이벤트는 여기로 오지 않음
            None => return Ok(Vec::new()),
        };

        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&session_id)
            .ok_or_else(|| HubError::UnknownSession {
                id: session_id.clone(),
            })?;

        if entry.reducer.snapshot().session.status.is_terminal() {
            return Err(HubError::Terminated { id: session_id });
        }

        if let Err(e) = entry.reducer.apply(event) {
            // 키 조회로 도달했으므로 불일치는 불가능하지만, 방어적으로 드롭
            tracing::warn!(error = %e, "event rejected by authoritative reducer");
            return Ok(Vec::new());
        }
        counter!(m::HUB_EVENTS_PUBLISHED_TOTAL, m::LABEL_KIND => event.kind()).increment(1);

        let json = match serde_json::to_string(event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                tracing::warn!(kind = event.kind(), error = %e, "failed to serialize event");
                return Ok(Vec::new());
            }
        };

        let mut closed = Vec::new();
        let observer_ids: Vec<String> = entry.observers.iter().cloned().collect();
        for observer_id in observer_ids {
            let Some(connection) = connections.get(&observer_id).await else {
                // 이미 등록 해제된 연결 — 집합에서 기회적으로 제거
                let _ = entry.observers.remove(&observer_id);
                continue;
            };
            match connection.send(json.clone()) {
                SendOutcome::Sent => {
                    counter!(m::HUB_FANOUT_DELIVERIES_TOTAL).increment(1);
                }
                SendOutcome::Full => {
                    counter!(m::HUB_MESSAGES_DROPPED_TOTAL).increment(1);
                    tracing::debug!(
                        conn_id = %observer_id,
                        kind = event.kind(),
                        "observer queue full, message dropped"
                    );
                }
                SendOutcome::Closed => {
                    let _ = entry.observers.remove(&observer_id);
                    closed.push(observer_id);
                }
            }
        }

        Ok(closed)
    }

    /// 세션의 모든 observer에 전송 계층 알림을 보냅니다.
    pub async fn notify_observers(
        &self,
        session_id: &str,
        notice: &ServerNotice,
        connections: &ConnectionManager,
    ) {
        let observer_ids = {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                Some(entry) => entry.observers.iter().cloned().collect::<Vec<_>>(),
                None => return,
            }
        };
        for observer_id in observer_ids {
            if let Some(connection) = connections.get(&observer_id).await {
                let _ = connection.send_json(notice);
            }
        }
    }
}
