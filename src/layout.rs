//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メインレイアウトの3つの領域
pub struct MainLayout {
    /// フォーム + INFOパネルの領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// ボディ部の2つの領域
pub struct BodyLayout {
    /// 入力フォームの領域
    pub form: Rect,
    /// 料金プレビューとログの領域
    pub info_panel: Rect,
}

/// 画面を Body + HELP + STATUS に分割
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Body
            Constraint::Length(3), // HELPバー
            Constraint::Length(3), // STATUSバー
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// Body領域を フォーム 60% + INFO 40% に分割
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    BodyLayout {
        form: chunks[0],
        info_panel: chunks[1],
    }
}

/// 領収書表示用に中央の枠を切り出す
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
