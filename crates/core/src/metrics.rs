//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `scanwire_`
//! - 모듈명: `hub_`, `engine_`, `reducer_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 스캔 모드 레이블 키 (quick, full, elite)
pub const LABEL_MODE: &str = "mode";

/// 이벤트 종류 레이블 키
pub const LABEL_KIND: &str = "kind";

// ─── Event Hub 메트릭 ──────────────────────────────────────────────

/// Hub: 생성된 세션 수 (counter, label: mode)
pub const HUB_SESSIONS_CREATED_TOTAL: &str = "scanwire_hub_sessions_created_total";

/// Hub: 현재 레지스트리에 있는 세션 수 (gauge)
pub const HUB_SESSIONS_ACTIVE: &str = "scanwire_hub_sessions_active";

/// Hub: 발행된 이벤트 수 (counter, label: kind)
pub const HUB_EVENTS_PUBLISHED_TOTAL: &str = "scanwire_hub_events_published_total";

/// Hub: observer에 전달된 메시지 수 (counter)
pub const HUB_FANOUT_DELIVERIES_TOTAL: &str = "scanwire_hub_fanout_deliveries_total";

/// Hub: 큐 포화로 드롭된 메시지 수 (counter)
pub const HUB_MESSAGES_DROPPED_TOTAL: &str = "scanwire_hub_messages_dropped_total";

/// Hub: 현재 연결된 observer 수 (gauge)
pub const HUB_CONNECTIONS_ACTIVE: &str = "scanwire_hub_connections_active";

/// Hub: 하트비트 타임아웃으로 정리된 연결 수 (counter)
pub const HUB_HEARTBEAT_TIMEOUTS_TOTAL: &str = "scanwire_hub_heartbeat_timeouts_total";

// ─── Scan Engine 메트릭 ────────────────────────────────────────────

/// Engine: 방출된 발견 사항 수 (counter, label: severity)
pub const ENGINE_FINDINGS_EMITTED_TOTAL: &str = "scanwire_engine_findings_emitted_total";

/// Engine: 터미널 상태에 도달한 세션 수 (counter, label: kind)
pub const ENGINE_SESSIONS_FINISHED_TOTAL: &str = "scanwire_engine_sessions_finished_total";

// ─── Reducer 메트릭 ────────────────────────────────────────────────

/// Reducer: 중복 재전달로 무시된 발견 사항 수 (counter)
pub const REDUCER_DUPLICATE_FINDINGS_TOTAL: &str = "scanwire_reducer_duplicate_findings_total";

/// Reducer: 세션 불일치로 거부된 이벤트 수 (counter)
pub const REDUCER_SESSION_MISMATCH_TOTAL: &str = "scanwire_reducer_session_mismatch_total";

/// 모든 메트릭의 설명을 recorder에 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        HUB_SESSIONS_CREATED_TOTAL,
        "Total number of scan sessions created"
    );
    describe_gauge!(
        HUB_SESSIONS_ACTIVE,
        "Number of sessions currently held in the registry"
    );
    describe_counter!(
        HUB_EVENTS_PUBLISHED_TOTAL,
        "Total number of events published through the hub"
    );
    describe_counter!(
        HUB_FANOUT_DELIVERIES_TOTAL,
        "Total number of messages delivered to observers"
    );
    describe_counter!(
        HUB_MESSAGES_DROPPED_TOTAL,
        "Total number of messages dropped due to full observer queues"
    );
    describe_gauge!(
        HUB_CONNECTIONS_ACTIVE,
        "Number of currently registered observer connections"
    );
    describe_counter!(
        HUB_HEARTBEAT_TIMEOUTS_TOTAL,
        "Total number of connections reaped by heartbeat timeout"
    );
    describe_counter!(
        ENGINE_FINDINGS_EMITTED_TOTAL,
        "Total number of findings emitted by the scan engine"
    );
    describe_counter!(
        ENGINE_SESSIONS_FINISHED_TOTAL,
        "Total number of sessions that reached a terminal state"
    );
    describe_counter!(
        REDUCER_DUPLICATE_FINDINGS_TOTAL,
        "Total number of re-delivered findings ignored by deduplication"
    );
    describe_counter!(
        REDUCER_SESSION_MISMATCH_TOTAL,
        "Total number of events rejected for targeting the wrong session"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_have_prefix() {
        for name in [
            HUB_SESSIONS_CREATED_TOTAL,
            HUB_EVENTS_PUBLISHED_TOTAL,
            ENGINE_FINDINGS_EMITTED_TOTAL,
            REDUCER_DUPLICATE_FINDINGS_TOTAL,
        ] {
            assert!(name.starts_with("scanwire_"));
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // recorder 미설치 상태에서도 no-op으로 동작해야 합니다
        describe_all();
    }
}
