//! 端末をTUIモードへ切り替え、終了時に元へ戻す。

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

/// アプリ全体で使う端末型。
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// rawモード + 代替画面でフォームを描画できる端末を用意する。
pub fn init_terminal() -> Result<Tui> {
    // キー入力を1つずつ受け取るためrawモードへ。
    enable_raw_mode().context("failed to enable raw mode")?;
    // 代替画面へ入り、カーソルは入力ボックス側で表現するので隠す。
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// rawモードと代替画面を解除する。
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)?;
    Ok(())
}
