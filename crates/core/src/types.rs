//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 세션, 발견 사항, 공격 체인 등 스캔 도메인의 핵심 개념이 여기 모여 있습니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// 발견 사항(Finding)의 심각도를 나타냅니다.
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 낮은 심각도
    #[default]
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 모든 심각도를 높은 순서대로 반환합니다.
    pub const fn all() -> [Self; 4] {
        [Self::Critical, Self::High, Self::Medium, Self::Low]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// 스캔 모드
///
/// 세션 생성 시 선택하는 스캔 강도입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// 빠른 스캔 — 기본 점검만 수행
    #[default]
    Quick,
    /// 전체 스캔
    Full,
    /// 심층 스캔 — 체인 분석과 인사이트 생성 포함
    Elite,
}

impl ScanMode {
    /// 문자열에서 스캔 모드를 파싱합니다 (대소문자 무시).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quick" => Some(Self::Quick),
            "full" => Some(Self::Full),
            "elite" => Some(Self::Elite),
            _ => None,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quick => write!(f, "quick"),
            Self::Full => write!(f, "full"),
            Self::Elite => write!(f, "elite"),
        }
    }
}

/// 세션 상태
///
/// 상태 전환은 해당 세션의 이벤트로만 일어납니다:
/// `Pending` → `Running` → `Completed` | `Failed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// 생성됨, 아직 시작 전
    #[default]
    Pending,
    /// 스캔 진행 중
    Running,
    /// 정상 완료 (터미널)
    Completed,
    /// 실패 종료 (터미널)
    Failed,
}

impl SessionStatus {
    /// 터미널 상태(더 이상 이벤트가 생산되지 않는 상태) 여부를 반환합니다.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 스캔 세션 메타데이터
///
/// 하나의 end-to-end 스캔 생명주기를 나타냅니다.
/// 상태는 전적으로 해당 세션의 이벤트 스트림에서 파생되며,
/// 레지스트리에서의 제거는 운영자의 명시적 evict로만 일어납니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 세션 고유 ID (UUID v4, 생산자 할당)
    pub id: String,
    /// 스캔 대상
    pub target: String,
    /// 스캔 모드
    pub mode: ScanMode,
    /// 현재 상태
    pub status: SessionStatus,
    /// 생성 시각
    pub created_at: SystemTime,
    /// 현재 진행률 (0..=100)
    pub progress: u8,
    /// 현재 단계 레이블
    pub phase: String,
}

impl Session {
    /// 새 세션을 `Pending` 상태로 생성합니다.
    pub fn new(target: impl Into<String>, mode: ScanMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target: target.into(),
            mode,
            status: SessionStatus::Pending,
            created_at: SystemTime::now(),
            progress: 0,
            phase: String::new(),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session[{}] target={} mode={} status={} progress={}%",
            &self.id[..8.min(self.id.len())],
            self.target,
            self.mode,
            self.status,
            self.progress,
        )
    }
}

/// 세션 생성 옵션
///
/// `seed`는 시뮬레이션 엔진의 결정적 난수 시드입니다.
/// `fail`은 "대상 도달 불가" 실패 경로를 추상적으로 주입합니다.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScanOptions {
    /// 이벤트 생산 난수 시드 (미지정 시 엔트로피 기반)
    #[serde(default)]
    pub seed: Option<u64>,
    /// 실패 경로 주입 — 첫 틱에서 세션을 `Failed`로 종료
    #[serde(default)]
    pub fail: bool,
}

/// 발견 사항 (취약점)
///
/// 스캔 도구가 탐지한 개별 취약점을 나타냅니다. 생성 이후 불변입니다.
/// `id`는 생산자가 할당하며, 중복 재전달 판별(dedup)의 키로 사용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// 생산자 할당 고유 ID — 재전달 dedup 키
    pub id: String,
    /// 취약점 유형 (예: "sql_injection", "xss")
    pub finding_type: String,
    /// 제목
    pub title: String,
    /// 심각도
    pub severity: Severity,
    /// 신뢰도 (0..=100)
    pub confidence: u8,
    /// CVE 식별자 (있을 경우)
    pub cve_id: Option<String>,
    /// CWE 식별자 (있을 경우)
    pub cwe_id: Option<String>,
    /// CVSS 점수 (있을 경우)
    pub cvss_score: Option<f64>,
    /// 발견된 URL (있을 경우)
    pub url: Option<String>,
    /// 상세 설명
    pub description: String,
    /// 발견 시각
    pub discovered_at: SystemTime,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (type={} confidence={})",
            self.severity, self.title, self.finding_type, self.confidence,
        )
    }
}

/// 공격 체인
///
/// 여러 발견 사항을 연결해 실제 공격 경로를 구성한 결과입니다.
/// 체인은 항상 critical 취급입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackChain {
    /// 체인 이름
    pub name: String,
    /// 성공 시 영향
    pub impact: String,
    /// 공격 단계 목록
    pub steps: Vec<String>,
    /// 신뢰도 (0..=100)
    pub confidence: u8,
}

impl fmt::Display for AttackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} steps, confidence={})",
            self.name,
            self.steps.len(),
            self.confidence,
        )
    }
}

/// 파생 인사이트
///
/// 발견 사항을 종합해 생성된 분석 메시지입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// 인사이트 유형 (예: "pattern", "anomaly")
    pub insight_type: String,
    /// 메시지 본문
    pub message: String,
    /// 관련 심각도 (있을 경우)
    pub severity: Option<Severity>,
    /// 신뢰도 (0..=100)
    pub confidence: u8,
}

/// 스캔 요약 — 심각도별 발견 사항 수
///
/// `SessionCompleted` 이벤트에 실려 전달되며,
/// 세션 동안 실제로 방출된 발견 사항에서 결정적으로 계산됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// critical 발견 수
    pub critical: u32,
    /// high 발견 수
    pub high: u32,
    /// medium 발견 수
    pub medium: u32,
    /// low 발견 수
    pub low: u32,
}

impl ScanSummary {
    /// 전체 발견 사항 수를 반환합니다.
    pub fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low
    }

    /// 지정 심각도의 카운터를 1 증가시킵니다.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    /// 지정 심각도의 카운터 값을 반환합니다.
    pub fn count(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "critical={} high={} medium={} low={}",
            self.critical, self.high, self.medium, self.low,
        )
    }
}

/// 도구 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// 실행 중
    Running,
    /// 완료됨
    Completed,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// 도구 활동 로그 항목
///
/// `ToolStarted`로 생성되고, 같은 도구명의 `ToolCompleted`가 도착하면
/// 제자리에서 완료 상태로 갱신됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolActivityEntry {
    /// 도구 이름 (예: "nmap")
    pub tool: String,
    /// 실행 대상
    pub target: String,
    /// 실행 상태
    pub status: ToolStatus,
    /// 완료 시 발견 사항 수
    pub findings: Option<u32>,
    /// 시작 시각
    pub started_at: SystemTime,
}

impl fmt::Display for ToolActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.findings {
            Some(count) => write!(f, "{} [{}] findings={}", self.tool, self.status, count),
            None => write!(f, "{} [{}]", self.tool, self.status),
        }
    }
}
