//! 와이어 프로토콜 — observer 연결의 메시지 어휘
//!
//! observer는 세션별 duplex 채널로 [`ClientMessage`]를 보내고,
//! 서버는 [`ServerNotice`]와 raw [`ScanEvent`]를 push합니다.
//! 이벤트는 래핑 없이 그대로 직렬화되며, 스냅샷/연결 상태 알림만
//! 별도의 notice 메시지입니다.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::event::ScanEvent;
use crate::snapshot::SessionSnapshot;

/// observer → 서버 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 세션 구독 — 서버는 즉시 catch-up 스냅샷으로 응답
    Attach {
        /// 구독할 세션 ID
        session_id: String,
    },
    /// 구독 해제 — 멱등, 구독 중이 아니어도 에러 없음
    Detach {
        /// 해제할 세션 ID
        session_id: String,
    },
    /// 생존 신호 — 서버는 `Pong`으로 응답하고 liveness를 갱신
    Ping,
}

/// 서버 → observer 알림 메시지 (이벤트 외 전송 계층 메시지)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerNotice {
    /// attach 직후 전달되는 catch-up 스냅샷 — 이후의 라이브 이벤트보다 항상 먼저
    Snapshot {
        /// 세션 ID
        session_id: String,
        /// 세션 전체 스냅샷
        snapshot: SessionSnapshot,
    },
    /// 공유 세션 observer의 연결 상태 변화 (정보성 — 스캔 정확성과 무관)
    ConnectionStatus {
        /// 상태 ("disconnected")
        status: String,
        /// 대상 연결 ID
        connection_id: String,
    },
    /// `Ping`에 대한 응답
    Pong {
        /// 응답 시각
        timestamp: SystemTime,
    },
    /// 클라이언트 요청 실패 (예: 존재하지 않는 세션 attach)
    Error {
        /// 에러 메시지
        error: String,
        /// 관련 세션 ID (있을 경우)
        session_id: Option<String>,
    },
}

/// observer가 수신하는 모든 메시지의 합집합
///
/// 이벤트는 래핑 없이 전송되므로 소비자는 untagged로 구분합니다.
/// notice의 `type` 태그("snapshot", "connection_status", "pong")와
/// 이벤트 종류 태그는 서로 겹치지 않습니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObserverMessage {
    /// 전송 계층 알림
    Notice(ServerNotice),
    /// raw 스캔 이벤트
    Event(ScanEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScanMode, Session};

    #[test]
    fn client_message_attach_roundtrip() {
        let msg = ClientMessage::Attach {
            session_id: "sess-1".to_owned(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"attach\""));
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ClientMessage::Attach { session_id } if session_id == "sess-1"));
    }

    #[test]
    fn client_message_ping_has_no_fields() {
        let json = serde_json::to_string(&ClientMessage::Ping).unwrap();
        assert_eq!(json, "{\"type\":\"ping\"}");
    }

    #[test]
    fn server_notice_snapshot_tag() {
        let notice = ServerNotice::Snapshot {
            session_id: "sess-1".to_owned(),
            snapshot: SessionSnapshot::new(Session::new("example.com", ScanMode::Quick)),
        };
        let value = serde_json::to_value(&notice).unwrap();
        assert_eq!(value["type"], "snapshot");
        assert_eq!(value["session_id"], "sess-1");
    }

    #[test]
    fn observer_message_distinguishes_event_from_notice() {
        let event_json = serde_json::json!({
            "type": "progress",
            "session_id": "s",
            "percent": 10,
            "phase": "recon",
        });
        let parsed: ObserverMessage = serde_json::from_value(event_json).unwrap();
        assert!(matches!(
            parsed,
            ObserverMessage::Event(ScanEvent::Progress { percent: 10, .. })
        ));

        let notice_json = serde_json::json!({
            "type": "connection_status",
            "status": "disconnected",
            "connection_id": "conn-9",
        });
        let parsed: ObserverMessage = serde_json::from_value(notice_json).unwrap();
        assert!(matches!(
            parsed,
            ObserverMessage::Notice(ServerNotice::ConnectionStatus { .. })
        ));
    }

    #[test]
    fn observer_message_parses_snapshot() {
        let notice = ServerNotice::Snapshot {
            session_id: "sess-2".to_owned(),
            snapshot: SessionSnapshot::new(Session::new("example.com", ScanMode::Full)),
        };
        let json = serde_json::to_string(&notice).unwrap();
        let parsed: ObserverMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ObserverMessage::Notice(ServerNotice::Snapshot { session_id, snapshot }) => {
                assert_eq!(session_id, "sess-2");
                assert_eq!(snapshot.session.target, "example.com");
            }
            other => panic!("expected snapshot notice, got {other:?}"),
        }
    }
}
