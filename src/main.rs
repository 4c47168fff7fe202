//! 乗車領収書フォームのエントリポイント。

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod config;
mod events;
mod fare;
mod form;
mod input;
mod layout;
mod receipt;
mod shortcuts;
mod ui;

/// ログファイル名。TUIが標準出力を使うためファイルへ出す。
const LOG_FILE: &str = "trip_receipt.log";

/// ファイルロギングを初期化し、非同期書き込みのガードを返す。
fn init_logging() -> Result<WorkerGuard> {
    // 追記型のファイル出力を非同期ライタで包む。
    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // ANSI色はファイルに不要なので切る。
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", LOG_FILE);
    Ok(guard)
}

/// ログ初期化→フォーム実行→端末復元。
fn main() -> Result<()> {
    // ガードを保持している間だけログが書き出される。
    let _log_guard = init_logging()?;
    tracing::info!("trip receipt form starting");

    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal);
    // エラー時でも端末は必ず戻す。
    ui::restore_terminal()?;

    if let Err(ref e) = res {
        tracing::error!("app error: {e:#}");
    }
    tracing::info!("trip receipt form exiting");
    res
}
