//! 시뮬레이션 엔진 — 외부 입력 없이 그럴듯한 스캔 타임라인을 생산
//!
//! 데모와 테스트에 쓰이는 기본 [`ScanEngine`] 구현입니다.
//! 모든 난수는 세션 생성 시 주입된 시드의 [`StdRng`]에서 나오므로
//! 같은 시드와 세션 ID는 항상 같은 이벤트 시퀀스를 만듭니다
//! (타임스탬프 제외).
//!
//! 타임라인: 지터 틱마다 진행률을 유계 증가시키고, 진행률이 임계값을
//! 넘으면 고정 확률로 발견 사항을 합성합니다. 단계 전환 시 이전 단계의
//! 도구를 완료 처리하고 새 단계의 도구를 시작합니다. 진행률 100 도달 시
//! 세션 동안 방출한 발견 사항에서 요약을 계산해 `SessionCompleted`로
//! 종료합니다.

use std::time::{Duration, SystemTime};

use metrics::counter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time;
use tokio_util::sync::CancellationToken;

use scanwire_core::config::EngineConfig;
use scanwire_core::event::ScanEvent;
use scanwire_core::metrics as m;
use scanwire_core::types::{AttackChain, Finding, Insight, ScanMode, ScanSummary, Severity};

use crate::engine::{BoxFuture, EventSink, ScanEngine, ScanSpec};
use crate::error::EngineError;
use crate::phases::{self, PHASES};

/// 시드 주입식 결정적 시뮬레이션 엔진
pub struct SimScanEngine {
    config: EngineConfig,
}

impl SimScanEngine {
    /// 설정으로 엔진을 생성합니다.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl Default for SimScanEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ScanEngine for SimScanEngine {
    fn name(&self) -> &str {
        "sim-scan-engine"
    }

    fn run(
        &self,
        spec: ScanSpec,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), EngineError>> {
        let config = self.config.clone();
        Box::pin(async move { simulate(config, spec, sink, cancel).await })
    }
}

async fn simulate(
    config: EngineConfig,
    spec: ScanSpec,
    sink: EventSink,
    cancel: CancellationToken,
) -> Result<(), EngineError> {
    let seed = spec.options.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    tracing::info!(
        session_id = %spec.session_id,
        target = %spec.target,
        mode = %spec.mode,
        seed,
        "simulated scan starting"
    );

    sink.emit(ScanEvent::SessionStarted {
        session_id: spec.session_id.clone(),
        target: spec.target.clone(),
        mode: spec.mode,
    })
    .await?;

    if spec.options.fail {
        sink.emit(ScanEvent::SessionFailed {
            session_id: spec.session_id.clone(),
            reason: "target unreachable".to_owned(),
        })
        .await?;
        counter!(m::ENGINE_SESSIONS_FINISHED_TOTAL, m::LABEL_KIND => "failed").increment(1);
        return Err(EngineError::Unreachable {
            target: spec.target,
        });
    }

    let mut progress: u8 = 0;
    let mut summary = ScanSummary::default();
    let mut finding_seq: u32 = 0;
    let mut phase_findings: u32 = 0;
    let mut chain_emitted = false;
    let mut current_phase = phases::phase_index(progress);

    // 첫 단계의 도구 시작
    if let Some(index) = current_phase
        && let Some(tool) = PHASES[index].tool
    {
        emit_tool_started(&sink, &spec, tool).await?;
    }

    loop {
        let delay_ms = rng.random_range(config.tick_min_ms..=config.tick_max_ms);
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(session_id = %spec.session_id, "scan cancelled");
                counter!(m::ENGINE_SESSIONS_FINISHED_TOTAL, m::LABEL_KIND => "cancelled")
                    .increment(1);
                return Ok(());
            }
            () = time::sleep(Duration::from_millis(delay_ms)) => {}
        }

        #[allow(clippy::cast_possible_truncation)]
        let step = rng.random_range(1..=u64::from(config.max_progress_step)) as u8;
        progress = progress.saturating_add(step).min(100);

        sink.emit(ScanEvent::Progress {
            session_id: spec.session_id.clone(),
            percent: progress,
            phase: phases::phase_label(progress).to_owned(),
        })
        .await?;

        // 단계 전환 — 이전 도구 완료, 새 도구 시작
        let new_phase = phases::phase_index(progress);
        if new_phase != current_phase {
            if let Some(index) = current_phase
                && let Some(tool) = PHASES[index].tool
            {
                sink.emit(ScanEvent::ToolCompleted {
                    session_id: spec.session_id.clone(),
                    tool: tool.to_owned(),
                    findings_count: phase_findings,
                })
                .await?;
            }
            phase_findings = 0;
            if let Some(index) = new_phase
                && let Some(tool) = PHASES[index].tool
            {
                emit_tool_started(&sink, &spec, tool).await?;
            }
            current_phase = new_phase;
        }

        // 발견 사항 — 항상 같은 틱의 Progress 뒤에 방출
        if progress > config.finding_threshold_percent
            && progress < 100
            && rng.random_bool(config.finding_probability)
        {
            let finding = synth_finding(&mut rng, &spec, finding_seq);
            let severity = finding.severity;
            finding_seq += 1;
            phase_findings += 1;
            summary.record(severity);
            counter!(m::ENGINE_FINDINGS_EMITTED_TOTAL, m::LABEL_SEVERITY => severity.to_string())
                .increment(1);

            sink.emit(ScanEvent::FindingDiscovered {
                session_id: spec.session_id.clone(),
                finding,
            })
            .await?;

            // 체인/인사이트는 quick 모드에서는 합성하지 않음
            if spec.mode != ScanMode::Quick {
                if !chain_emitted && summary.critical + summary.high >= 2 {
                    chain_emitted = true;
                    sink.emit(ScanEvent::ChainDetected {
                        session_id: spec.session_id.clone(),
                        chain: synth_chain(&mut rng),
                    })
                    .await?;
                }
                if rng.random_bool(0.2) {
                    sink.emit(ScanEvent::InsightProduced {
                        session_id: spec.session_id.clone(),
                        insight: synth_insight(&mut rng, severity),
                    })
                    .await?;
                }
            }
        }

        if progress >= 100 {
            break;
        }
    }

    sink.emit(ScanEvent::SessionCompleted {
        session_id: spec.session_id.clone(),
        summary,
    })
    .await?;
    counter!(m::ENGINE_SESSIONS_FINISHED_TOTAL, m::LABEL_KIND => "completed").increment(1);
    tracing::info!(
        session_id = %spec.session_id,
        findings = summary.total(),
        "simulated scan completed"
    );
    Ok(())
}

async fn emit_tool_started(
    sink: &EventSink,
    spec: &ScanSpec,
    tool: &str,
) -> Result<(), EngineError> {
    sink.emit(ScanEvent::ToolStarted {
        session_id: spec.session_id.clone(),
        tool: tool.to_owned(),
        target: spec.target.clone(),
        started_at: SystemTime::now(),
    })
    .await
}

fn synth_finding(rng: &mut StdRng, spec: &ScanSpec, seq: u32) -> Finding {
    let severity = match rng.random_range(0..4u8) {
        0 => Severity::Critical,
        1 => Severity::High,
        2 => Severity::Medium,
        _ => Severity::Low,
    };
    let catalog = phases::titles_for(severity);
    let (finding_type, title) = catalog[rng.random_range(0..catalog.len())];

    let cvss_base = match severity {
        Severity::Critical => 8.0,
        Severity::High => 6.0,
        Severity::Medium => 4.0,
        Severity::Low => 1.0,
    };
    let cvss_spread = if severity == Severity::Low { 2.9 } else { 1.9 };
    let cvss_score = cvss_base + rng.random_range(0.0..=cvss_spread);

    let cve_id = if rng.random_bool(0.5) {
        Some(format!("CVE-2024-{:04}", rng.random_range(1..=9999u32)))
    } else {
        None
    };
    let cwe_id = match finding_type {
        "sql_injection" => Some("CWE-89".to_owned()),
        "xss" => Some("CWE-79".to_owned()),
        "path_traversal" => Some("CWE-22".to_owned()),
        "ssrf" => Some("CWE-918".to_owned()),
        "file_upload" => Some("CWE-434".to_owned()),
        _ => None,
    };

    Finding {
        // 세션 내 단조 시퀀스 — 재전달 dedup 키로 쓰이므로 세션별 유일
        id: format!("{}-f-{}", spec.session_id, seq),
        finding_type: finding_type.to_owned(),
        title: title.to_owned(),
        severity,
        confidence: rng.random_range(40..=95),
        cve_id,
        cwe_id,
        cvss_score: Some(cvss_score),
        url: Some(format!("https://{}/", spec.target)),
        description: format!("{title} detected while scanning {}.", spec.target),
        discovered_at: SystemTime::now(),
    }
}

fn synth_chain(rng: &mut StdRng) -> AttackChain {
    AttackChain {
        name: "Credential Compromise Chain".to_owned(),
        impact: "Full account takeover and lateral movement".to_owned(),
        steps: vec![
            "Target Discovery".to_owned(),
            "Parameter Enumeration".to_owned(),
            "Injection Testing".to_owned(),
            "Data Extraction".to_owned(),
            "Privilege Escalation".to_owned(),
        ],
        confidence: rng.random_range(50..=90),
    }
}

fn synth_insight(rng: &mut StdRng, severity: Severity) -> Insight {
    let (insight_type, message) = phases::INSIGHTS[rng.random_range(0..phases::INSIGHTS.len())];
    Insight {
        insight_type: insight_type.to_owned(),
        message: message.to_owned(),
        severity: Some(severity),
        confidence: rng.random_range(40..=90),
    }
}
