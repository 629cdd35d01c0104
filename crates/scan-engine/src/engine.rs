//! 이벤트 생산 계약 — 스캔 엔진이 지켜야 하는 방출 규칙
//!
//! [`ScanEngine`]은 교체 가능한 생산자 trait입니다. 기본 구현은
//! [`SimScanEngine`](crate::simulator::SimScanEngine)이고, 실제 스캔
//! 엔진은 같은 계약을 지키는 한 확률 모델과 무관하게 대체할 수 있습니다.
//!
//! # 방출 계약
//!
//! 1. `SessionStarted`를 가장 먼저 방출한다
//! 2. `Progress.percent`는 단조 비감소이며 100에서 클램프된다
//! 3. 한 틱 안에서 `Progress`가 `FindingDiscovered`보다 먼저 온다
//! 4. 터미널 이벤트(`SessionCompleted`/`SessionFailed`)는 정확히 1회,
//!    그 이후에는 아무 이벤트도 방출하지 않는다

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scanwire_core::event::ScanEvent;
use scanwire_core::types::{ScanMode, ScanOptions};

use crate::error::EngineError;

/// dyn-compatible async 반환 타입
///
/// trait 메서드가 RPITIT 대신 boxed future를 반환하여
/// `Arc<dyn ScanEngine>`으로 동적 관리할 수 있게 합니다.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 엔진 실행에 필요한 세션 입력
#[derive(Debug, Clone)]
pub struct ScanSpec {
    /// 세션 ID — 방출되는 모든 세션 스코프 이벤트에 실림
    pub session_id: String,
    /// 스캔 대상
    pub target: String,
    /// 스캔 모드
    pub mode: ScanMode,
    /// 세션 생성 옵션 (시드, 실패 주입)
    pub options: ScanOptions,
}

/// 이벤트 방출 싱크
///
/// 세션별 이벤트 큐의 송신단 래퍼입니다. 큐가 닫히면(터미널 처리
/// 또는 evict) 이후의 emit은 [`EngineError::SinkClosed`]로 실패하고,
/// 엔진은 생산을 중단해야 합니다.
pub struct EventSink {
    tx: mpsc::Sender<ScanEvent>,
}

impl EventSink {
    /// 송신단을 감싼 싱크를 생성합니다.
    pub fn new(tx: mpsc::Sender<ScanEvent>) -> Self {
        Self { tx }
    }

    /// 이벤트 하나를 큐에 적재합니다.
    pub async fn emit(&self, event: ScanEvent) -> Result<(), EngineError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| EngineError::SinkClosed)
    }

    /// 큐가 닫혔는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 스캔 이벤트 생산자 trait
///
/// 구현체는 방출 계약(모듈 문서 참조)을 지켜야 합니다.
pub trait ScanEngine: Send + Sync {
    /// 엔진 이름 (로깅용)
    fn name(&self) -> &str;

    /// 세션 하나의 이벤트 타임라인을 생산합니다.
    ///
    /// `cancel`이 발화하면 추가 이벤트 없이 조속히 반환해야 합니다.
    /// 터미널 이벤트 방출 후에는 어떤 이벤트도 emit하지 않습니다.
    fn run(
        &self,
        spec: ScanSpec,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<(), EngineError>>;
}
