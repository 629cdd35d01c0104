//! 세션 스냅샷 — 이벤트 스트림에서 파생된 유계(bounded) 상태 뷰
//!
//! [`SessionSnapshot`]은 한 세션의 질의 가능한 현재 상태입니다.
//! attach 시점의 catch-up 스냅샷과 히스토리 질의 응답이 모두 이 타입이며,
//! 실제 fold 로직은 `scanwire-reducer` 크레이트에 있습니다.

use serde::{Deserialize, Serialize};

use crate::types::{AttackChain, Finding, Insight, ScanSummary, Session, ToolActivityEntry};

/// 유계 로그의 보존 개수 설정
///
/// 각 로그는 최신 N개만 유지합니다. 권위 있는 발견 사항 목록과
/// dedup 키 집합은 유계가 아닙니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogLimits {
    /// 도구 활동 로그 보존 개수
    pub tool_activity: usize,
    /// 인사이트 로그 보존 개수
    pub insights: usize,
    /// 공격 체인 목록 보존 개수
    pub chains: usize,
    /// 표시용 최근 발견 사항 보존 개수
    pub recent_findings: usize,
}

impl Default for LogLimits {
    fn default() -> Self {
        Self {
            tool_activity: 10,
            insights: 20,
            chains: 10,
            recent_findings: 25,
        }
    }
}

/// 로컬 키가 부여된 발견 사항
///
/// `key`는 reducer가 부여하는 로컬 단조 증가 키입니다.
/// 생산자 ID와 무관하게 표시 계층에서 항목을 구별하는 데 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFinding {
    /// 로컬 고유 키 (reducer 단조 증가)
    pub key: u64,
    /// 발견 사항 본문
    pub finding: Finding,
}

/// 세션 상태 스냅샷
///
/// 한 세션의 이벤트 스트림을 fold한 결과입니다. 최신 항목이 앞에 옵니다.
/// `findings`는 무제한(히스토리 질의용 권위 목록), 나머지 로그는
/// [`LogLimits`]에 따라 최신 N개만 유지합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// 세션 메타데이터 (상태, 진행률, 단계 포함)
    pub session: Session,
    /// 심각도별 발견 사항 카운터 — 이벤트 인스턴스당 정확히 1회 증가
    pub stats: ScanSummary,
    /// 권위 있는 발견 사항 목록 (무제한, 최신 우선)
    pub findings: Vec<RecordedFinding>,
    /// 표시용 최근 발견 사항 (유계)
    pub recent_findings: Vec<RecordedFinding>,
    /// 도구 활동 로그 (유계)
    pub tool_activity: Vec<ToolActivityEntry>,
    /// 공격 체인 목록 (유계)
    pub chains: Vec<AttackChain>,
    /// 인사이트 로그 (유계)
    pub insights: Vec<Insight>,
    /// 터미널 요약 (`SessionCompleted` 수신 시 저장)
    pub summary: Option<ScanSummary>,
    /// 실패 사유 (`SessionFailed` 수신 시 저장)
    pub failure_reason: Option<String>,
}

impl SessionSnapshot {
    /// 빈 스냅샷을 생성합니다.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            stats: ScanSummary::default(),
            findings: Vec::new(),
            recent_findings: Vec::new(),
            tool_activity: Vec::new(),
            chains: Vec::new(),
            insights: Vec::new(),
            summary: None,
            failure_reason: None,
        }
    }
}
