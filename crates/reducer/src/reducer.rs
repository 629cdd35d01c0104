//! 세션 상태 reducer — 이벤트 스트림의 순수 fold
//!
//! [`SessionReducer`]는 한 세션에 바인딩되어 이벤트를 순서대로 받아
//! [`SessionSnapshot`]을 갱신합니다. 이벤트 종류당 케이스 하나이며,
//! match는 exhaustive합니다 — 새 이벤트 종류는 컴파일 에러로 드러납니다.
//!
//! # Dedup
//!
//! 재연결 후 재전달된 `FindingDiscovered`가 카운터를 두 번 올리지 않도록
//! 생산자 할당 `finding.id`를 dedup 키로 사용합니다. 수락된 발견 사항에는
//! 로컬 단조 증가 키가 별도로 부여됩니다. seen 집합은 유계가 아닙니다.

use std::collections::HashSet;

use metrics::counter;

use scanwire_core::event::ScanEvent;
use scanwire_core::metrics as m;
use scanwire_core::snapshot::{LogLimits, RecordedFinding, SessionSnapshot};
use scanwire_core::types::{Session, SessionStatus, ToolActivityEntry, ToolStatus};

use crate::error::ReducerError;

/// 한 세션의 이벤트 스트림을 스냅샷으로 fold하는 reducer
///
/// 부수 효과 없는 순수 fold입니다 (메트릭 카운터 제외).
/// 진행률은 생산자 계약상 단조이므로 last-write가 곧 max-write입니다.
#[derive(Debug)]
pub struct SessionReducer {
    session_id: String,
    snapshot: SessionSnapshot,
    seen_findings: HashSet<String>,
    next_key: u64,
    limits: LogLimits,
}

impl SessionReducer {
    /// 세션에 바인딩된 새 reducer를 생성합니다.
    pub fn new(session: Session, limits: LogLimits) -> Self {
        Self {
            session_id: session.id.clone(),
            snapshot: SessionSnapshot::new(session),
            seen_findings: HashSet::new(),
            next_key: 0,
            limits,
        }
    }

    /// catch-up 스냅샷에서 reducer를 복원합니다.
    ///
    /// 늦게 attach한 observer가 스냅샷 이후의 라이브 이벤트를 이어서
    /// fold할 때 사용합니다. dedup 집합은 스냅샷의 발견 사항 목록에서
    /// 재구성되므로, 스냅샷 이전 이벤트가 재전달되어도 이중 계수되지
    /// 않습니다.
    pub fn from_snapshot(snapshot: SessionSnapshot, limits: LogLimits) -> Self {
        let seen_findings = snapshot
            .findings
            .iter()
            .map(|recorded| recorded.finding.id.clone())
            .collect();
        let next_key = snapshot
            .findings
            .iter()
            .map(|recorded| recorded.key + 1)
            .max()
            .unwrap_or(0);
        Self {
            session_id: snapshot.session.id.clone(),
            snapshot,
            seen_findings,
            next_key,
            limits,
        }
    }

    /// 바인딩된 세션 ID를 반환합니다.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// 현재 스냅샷에 대한 불변 참조를 반환합니다.
    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    /// reducer를 소비하고 스냅샷을 반환합니다.
    pub fn into_snapshot(self) -> SessionSnapshot {
        self.snapshot
    }

    /// 이벤트 하나를 스냅샷에 fold합니다.
    ///
    /// 바인딩된 세션이 아닌 이벤트는 [`ReducerError::SessionMismatch`]로
    /// 거부되며 스냅샷은 변하지 않습니다. `Heartbeat`는 no-op입니다.
    pub fn apply(&mut self, event: &ScanEvent) -> Result<(), ReducerError> {
        if let Some(session_id) = event.session_id()
            && session_id != self.session_id
        {
            counter!(m::REDUCER_SESSION_MISMATCH_TOTAL).increment(1);
            return Err(ReducerError::SessionMismatch {
                expected: self.session_id.clone(),
                got: session_id.to_owned(),
            });
        }

        match event {
            ScanEvent::SessionStarted { target, mode, .. } => {
                self.snapshot.session.target = target.clone();
                self.snapshot.session.mode = *mode;
                self.snapshot.session.status = SessionStatus::Running;
            }
            ScanEvent::Progress { percent, phase, .. } => {
                // 생산자 계약상 단조 — 덮어쓰기가 곧 최댓값 유지
                self.snapshot.session.progress = *percent;
                self.snapshot.session.phase = phase.clone();
            }
            ScanEvent::ToolStarted {
                tool,
                target,
                started_at,
                ..
            } => {
                self.snapshot.tool_activity.insert(
                    0,
                    ToolActivityEntry {
                        tool: tool.clone(),
                        target: target.clone(),
                        status: ToolStatus::Running,
                        findings: None,
                        started_at: *started_at,
                    },
                );
                self.snapshot.tool_activity.truncate(self.limits.tool_activity);
            }
            ScanEvent::ToolCompleted {
                tool,
                findings_count,
                ..
            } => {
                // 가장 최근의 running 항목만 완료 처리.
                // 매칭이 없으면(순서 역전/중복) no-op — 합성 항목을 만들지 않습니다.
                match self
                    .snapshot
                    .tool_activity
                    .iter_mut()
                    .find(|entry| entry.tool == *tool && entry.status == ToolStatus::Running)
                {
                    Some(entry) => {
                        entry.status = ToolStatus::Completed;
                        entry.findings = Some(*findings_count);
                    }
                    None => {
                        tracing::debug!(tool, "tool_completed without matching running entry");
                    }
                }
            }
            ScanEvent::FindingDiscovered { finding, .. } => {
                if !self.seen_findings.insert(finding.id.clone()) {
                    counter!(m::REDUCER_DUPLICATE_FINDINGS_TOTAL).increment(1);
                    tracing::debug!(finding_id = %finding.id, "duplicate finding ignored");
                    return Ok(());
                }
                let recorded = RecordedFinding {
                    key: self.next_key,
                    finding: finding.clone(),
                };
                self.next_key += 1;
                self.snapshot.stats.record(finding.severity);
                self.snapshot.recent_findings.insert(0, recorded.clone());
                self.snapshot
                    .recent_findings
                    .truncate(self.limits.recent_findings);
                self.snapshot.findings.insert(0, recorded);
            }
            ScanEvent::ChainDetected { chain, .. } => {
                self.snapshot.chains.insert(0, chain.clone());
                self.snapshot.chains.truncate(self.limits.chains);
            }
            ScanEvent::InsightProduced { insight, .. } => {
                self.snapshot.insights.insert(0, insight.clone());
                self.snapshot.insights.truncate(self.limits.insights);
            }
            ScanEvent::SessionCompleted { summary, .. } => {
                self.snapshot.session.status = SessionStatus::Completed;
                self.snapshot.session.progress = 100;
                self.snapshot.summary = Some(*summary);
            }
            ScanEvent::SessionFailed { reason, .. } => {
                self.snapshot.session.status = SessionStatus::Failed;
                self.snapshot.failure_reason = Some(reason.clone());
            }
            ScanEvent::Heartbeat { .. } => {}
        }

        Ok(())
    }
}
