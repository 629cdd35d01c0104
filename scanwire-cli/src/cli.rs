//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};

/// Scanwire CLI — 스캔 세션 생성/조회/실시간 관찰 도구
#[derive(Parser)]
#[command(name = "scanwire", version, about)]
pub struct Cli {
    /// 서버 기본 URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// 출력 형식
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 스캔 세션 생성
    Scan {
        /// 스캔 대상 (호스트명 또는 URL)
        #[arg(long)]
        target: String,

        /// 스캔 모드 (quick, full, elite)
        #[arg(long, default_value = "quick")]
        mode: String,

        /// 결정적 이벤트 생산을 위한 난수 시드
        #[arg(long)]
        seed: Option<u64>,

        /// 실패 경로 주입 (대상 도달 불가 시뮬레이션)
        #[arg(long)]
        fail: bool,

        /// 생성 직후 라이브 스트림 관찰
        #[arg(long)]
        watch: bool,
    },
    /// 세션 목록 조회
    Sessions,
    /// 세션 스냅샷 조회
    Status {
        /// 세션 ID
        session_id: String,
    },
    /// 세션에 attach하여 라이브 이벤트 관찰
    Watch {
        /// 세션 ID
        session_id: String,
    },
    /// 세션을 레지스트리에서 제거
    Evict {
        /// 세션 ID
        session_id: String,
    },
}

/// Output format selector shared by every subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_command() {
        let cli = Cli::parse_from([
            "scanwire", "scan", "--target", "example.com", "--mode", "elite", "--seed", "42",
            "--watch",
        ]);
        match cli.command {
            Commands::Scan {
                target,
                mode,
                seed,
                fail,
                watch,
            } => {
                assert_eq!(target, "example.com");
                assert_eq!(mode, "elite");
                assert_eq!(seed, Some(42));
                assert!(!fail);
                assert!(watch);
            }
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn parses_watch_command() {
        let cli = Cli::parse_from(["scanwire", "watch", "sess-1"]);
        assert!(matches!(
            cli.command,
            Commands::Watch { session_id } if session_id == "sess-1"
        ));
        assert_eq!(cli.server, "http://127.0.0.1:8080");
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn parses_json_output_flag() {
        let cli = Cli::parse_from(["scanwire", "--output", "json", "sessions"]);
        assert_eq!(cli.output, OutputFormat::Json);
    }
}
