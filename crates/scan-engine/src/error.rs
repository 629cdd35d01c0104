//! 에러 타입 — 엔진 도메인 에러

/// 스캔 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 스캔 대상에 도달할 수 없음 — 세션은 `SessionFailed`로 종료됨
    #[error("target unreachable: {target}")]
    Unreachable { target: String },

    /// 이벤트 큐가 닫힘 — 세션이 종료되었거나 evict됨
    #[error("event sink closed")]
    SinkClosed,
}
