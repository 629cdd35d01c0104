//! 이벤트 모델 — 스캔 세션 생명주기 이벤트의 닫힌 집합
//!
//! 모든 세션 상태는 이 이벤트 스트림에서만 파생됩니다.
//! [`ScanEvent`]는 내부 태그(`type`) 방식의 닫힌 tagged union으로,
//! 소비자 측 match가 항상 exhaustive하도록 강제합니다.
//! 새 이벤트 종류는 컴파일 타임에 모든 소비자에게 드러납니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::types::{AttackChain, Finding, Insight, ScanMode, ScanSummary};

/// 알려진 이벤트 종류 태그 목록 (와이어 `type` 필드 값)
pub const EVENT_KINDS: [&str; 10] = [
    "session_started",
    "progress",
    "tool_started",
    "tool_completed",
    "finding_discovered",
    "chain_detected",
    "insight_produced",
    "session_completed",
    "session_failed",
    "heartbeat",
];

/// 스캔 세션 생명주기 이벤트
///
/// 세션 스코프 이벤트는 모두 `session_id`를 가지며,
/// 한 세션에 대해 생산 순서 그대로 각 observer에 전달되어야 합니다.
/// 터미널 이벤트(`SessionCompleted`/`SessionFailed`)는 세션당 최대 1회이며
/// 그 이후로는 어떤 이벤트도 생산되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    /// 세션 시작 — 세션 생성 직후 가장 먼저 방출
    SessionStarted {
        /// 세션 ID
        session_id: String,
        /// 스캔 대상
        target: String,
        /// 스캔 모드
        mode: ScanMode,
    },
    /// 진행률 갱신 — percent는 단조 비감소, 100에서 클램프
    Progress {
        /// 세션 ID
        session_id: String,
        /// 진행률 (0..=100)
        percent: u8,
        /// 현재 단계 레이블
        phase: String,
    },
    /// 도구 실행 시작
    ToolStarted {
        /// 세션 ID
        session_id: String,
        /// 도구 이름
        tool: String,
        /// 실행 대상
        target: String,
        /// 시작 시각
        started_at: SystemTime,
    },
    /// 도구 실행 완료
    ToolCompleted {
        /// 세션 ID
        session_id: String,
        /// 도구 이름
        tool: String,
        /// 해당 도구가 찾은 발견 사항 수
        findings_count: u32,
    },
    /// 발견 사항 탐지 — 같은 틱의 `Progress` 뒤에 방출
    FindingDiscovered {
        /// 세션 ID
        session_id: String,
        /// 발견 사항
        finding: Finding,
    },
    /// 공격 체인 탐지
    ChainDetected {
        /// 세션 ID
        session_id: String,
        /// 공격 체인
        chain: AttackChain,
    },
    /// 인사이트 생성
    InsightProduced {
        /// 세션 ID
        session_id: String,
        /// 인사이트
        insight: Insight,
    },
    /// 세션 정상 완료 (터미널)
    SessionCompleted {
        /// 세션 ID
        session_id: String,
        /// 심각도별 발견 사항 요약
        summary: ScanSummary,
    },
    /// 세션 실패 종료 (터미널)
    SessionFailed {
        /// 세션 ID
        session_id: String,
        /// 실패 사유
        reason: String,
    },
    /// 연결 유지 하트비트 — 세션 스코프가 아님
    Heartbeat {
        /// 송신 시각
        timestamp: SystemTime,
    },
}

impl ScanEvent {
    /// 이벤트가 속한 세션 ID를 반환합니다.
    ///
    /// `Heartbeat`는 세션 스코프가 아니므로 `None`입니다.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::SessionStarted { session_id, .. }
            | Self::Progress { session_id, .. }
            | Self::ToolStarted { session_id, .. }
            | Self::ToolCompleted { session_id, .. }
            | Self::FindingDiscovered { session_id, .. }
            | Self::ChainDetected { session_id, .. }
            | Self::InsightProduced { session_id, .. }
            | Self::SessionCompleted { session_id, .. }
            | Self::SessionFailed { session_id, .. } => Some(session_id),
            Self::Heartbeat { .. } => None,
        }
    }

    /// 터미널 이벤트 여부를 반환합니다.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::SessionCompleted { .. } | Self::SessionFailed { .. }
        )
    }

    /// 이벤트 종류명을 반환합니다 (로깅 및 라우팅에 사용).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::Progress { .. } => "progress",
            Self::ToolStarted { .. } => "tool_started",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::FindingDiscovered { .. } => "finding_discovered",
            Self::ChainDetected { .. } => "chain_detected",
            Self::InsightProduced { .. } => "insight_produced",
            Self::SessionCompleted { .. } => "session_completed",
            Self::SessionFailed { .. } => "session_failed",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }

    /// 비정형 JSON 메시지를 검증하여 well-typed 이벤트로 변환합니다.
    ///
    /// 실패 조건:
    /// - `type` 태그 누락 또는 알 수 없는 종류
    /// - 필수 필드 누락
    /// - 범위 밖 값 (percent > 100, confidence > 100)
    ///
    /// 부수 효과는 없습니다.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, EventError> {
        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EventError::Malformed {
                reason: "missing event type tag".to_owned(),
            })?;

        if !EVENT_KINDS.contains(&kind) {
            return Err(EventError::Malformed {
                reason: format!("unknown event kind: {kind}"),
            });
        }

        let event: Self =
            serde_json::from_value(value.clone()).map_err(|e| EventError::Malformed {
                reason: e.to_string(),
            })?;
        event.validate()?;
        Ok(event)
    }

    /// 이벤트 페이로드의 값 범위를 검증합니다.
    pub fn validate(&self) -> Result<(), EventError> {
        match self {
            Self::Progress { percent, .. } if *percent > 100 => Err(EventError::Malformed {
                reason: format!("progress percent out of range: {percent}"),
            }),
            Self::FindingDiscovered { finding, .. } if finding.confidence > 100 => {
                Err(EventError::Malformed {
                    reason: format!("finding confidence out of range: {}", finding.confidence),
                })
            }
            Self::ChainDetected { chain, .. } if chain.confidence > 100 => {
                Err(EventError::Malformed {
                    reason: format!("chain confidence out of range: {}", chain.confidence),
                })
            }
            Self::InsightProduced { insight, .. } if insight.confidence > 100 => {
                Err(EventError::Malformed {
                    reason: format!("insight confidence out of range: {}", insight.confidence),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStarted { session_id, target, mode } => {
                write!(f, "session_started[{}] target={target} mode={mode}", short(session_id))
            }
            Self::Progress { session_id, percent, phase } => {
                write!(f, "progress[{}] {percent}% phase={phase}", short(session_id))
            }
            Self::ToolStarted { session_id, tool, .. } => {
                write!(f, "tool_started[{}] tool={tool}", short(session_id))
            }
            Self::ToolCompleted { session_id, tool, findings_count } => {
                write!(
                    f,
                    "tool_completed[{}] tool={tool} findings={findings_count}",
                    short(session_id),
                )
            }
            Self::FindingDiscovered { session_id, finding } => {
                write!(f, "finding_discovered[{}] {finding}", short(session_id))
            }
            Self::ChainDetected { session_id, chain } => {
                write!(f, "chain_detected[{}] {chain}", short(session_id))
            }
            Self::InsightProduced { session_id, insight } => {
                write!(
                    f,
                    "insight_produced[{}] type={}",
                    short(session_id),
                    insight.insight_type,
                )
            }
            Self::SessionCompleted { session_id, summary } => {
                write!(f, "session_completed[{}] {summary}", short(session_id))
            }
            Self::SessionFailed { session_id, reason } => {
                write!(f, "session_failed[{}] reason={reason}", short(session_id))
            }
            Self::Heartbeat { .. } => write!(f, "heartbeat"),
        }
    }
}

fn short(id: &str) -> &str {
    &id[..8.min(id.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn sample_finding() -> Finding {
        Finding {
            id: "f-100".to_owned(),
            finding_type: "sql_injection".to_owned(),
            title: "SQL Injection".to_owned(),
            severity: Severity::Critical,
            confidence: 85,
            cve_id: None,
            cwe_id: None,
            cvss_score: None,
            url: None,
            description: "desc".to_owned(),
            discovered_at: SystemTime::now(),
        }
    }

    #[test]
    fn session_id_for_scoped_events() {
        let event = ScanEvent::Progress {
            session_id: "sess-1".to_owned(),
            percent: 50,
            phase: "scanning".to_owned(),
        };
        assert_eq!(event.session_id(), Some("sess-1"));
    }

    #[test]
    fn heartbeat_has_no_session_id() {
        let event = ScanEvent::Heartbeat {
            timestamp: SystemTime::now(),
        };
        assert_eq!(event.session_id(), None);
    }

    #[test]
    fn terminal_events() {
        let completed = ScanEvent::SessionCompleted {
            session_id: "s".to_owned(),
            summary: ScanSummary::default(),
        };
        let failed = ScanEvent::SessionFailed {
            session_id: "s".to_owned(),
            reason: "target unreachable".to_owned(),
        };
        let progress = ScanEvent::Progress {
            session_id: "s".to_owned(),
            percent: 10,
            phase: "p".to_owned(),
        };
        assert!(completed.is_terminal());
        assert!(failed.is_terminal());
        assert!(!progress.is_terminal());
    }

    #[test]
    fn serializes_with_snake_case_tag() {
        let event = ScanEvent::FindingDiscovered {
            session_id: "sess-1".to_owned(),
            finding: sample_finding(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "finding_discovered");
        assert_eq!(value["session_id"], "sess-1");
        assert_eq!(value["finding"]["severity"], "critical");
    }

    #[test]
    fn from_json_roundtrip() {
        let event = ScanEvent::Progress {
            session_id: "sess-1".to_owned(),
            percent: 42,
            phase: "Technology Profiling".to_owned(),
        };
        let value = serde_json::to_value(&event).unwrap();
        let back = ScanEvent::from_json(&value).unwrap();
        assert_eq!(back.kind(), "progress");
        assert_eq!(back.session_id(), Some("sess-1"));
    }

    #[test]
    fn from_json_rejects_missing_tag() {
        let value = serde_json::json!({"session_id": "s", "percent": 10});
        let err = ScanEvent::from_json(&value).unwrap_err();
        assert!(err.to_string().contains("missing event type"));
    }

    #[test]
    fn from_json_rejects_unknown_kind() {
        let value = serde_json::json!({"type": "scan_exploded", "session_id": "s"});
        let err = ScanEvent::from_json(&value).unwrap_err();
        assert!(err.to_string().contains("unknown event kind"));
    }

    #[test]
    fn from_json_rejects_missing_field() {
        // phase 필드 누락
        let value = serde_json::json!({"type": "progress", "session_id": "s", "percent": 10});
        assert!(ScanEvent::from_json(&value).is_err());
    }

    #[test]
    fn from_json_rejects_out_of_range_percent() {
        let value = serde_json::json!({
            "type": "progress",
            "session_id": "s",
            "percent": 150,
            "phase": "p",
        });
        let err = ScanEvent::from_json(&value).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn validate_rejects_bad_confidence() {
        let mut finding = sample_finding();
        finding.confidence = 120;
        let event = ScanEvent::FindingDiscovered {
            session_id: "s".to_owned(),
            finding,
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn kind_matches_wire_tag() {
        let event = ScanEvent::SessionStarted {
            session_id: "s".to_owned(),
            target: "example.com".to_owned(),
            mode: ScanMode::Quick,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], event.kind());
    }

    #[test]
    fn all_kinds_listed() {
        assert_eq!(EVENT_KINDS.len(), 10);
        assert!(EVENT_KINDS.contains(&"heartbeat"));
        assert!(EVENT_KINDS.contains(&"session_failed"));
    }

    #[test]
    fn display_is_single_line() {
        let event = ScanEvent::Progress {
            session_id: "0123456789abcdef".to_owned(),
            percent: 35,
            phase: "Initiating Smart Scans".to_owned(),
        };
        let display = event.to_string();
        assert!(display.contains("progress[01234567]"));
        assert!(display.contains("35%"));
        assert!(!display.contains('\n'));
    }

    #[test]
    fn events_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<ScanEvent>();
    }
}
