//! フィールド編集用のポップアップ入力（InputBox）。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::form::FormField;

/// 入力可能な文字の制限。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFilter {
    /// 任意の文字。
    Text,
    /// 数値入力（数字・小数点・符号）。
    Number,
    /// 数字のみ、最大桁数付き。
    Digits { max_len: usize },
}

impl InputFilter {
    /// フィールドに応じた入力制限を返す。
    pub fn for_field(field: FormField) -> Self {
        match field {
            FormField::Distance | FormField::Duration | FormField::FinalTotal => Self::Number,
            FormField::CardLastFour => Self::Digits { max_len: 4 },
            _ => Self::Text,
        }
    }

    /// 現在の文字数を踏まえて、文字を受け付けるか判定する。
    fn accepts(self, c: char, current_len: usize) -> bool {
        match self {
            Self::Text => !c.is_control(),
            Self::Number => c.is_ascii_digit() || c == '.' || c == '-',
            Self::Digits { max_len } => c.is_ascii_digit() && current_len < max_len,
        }
    }

    /// ヘルプ行に添える説明。
    fn hint(self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Number => Some("数値のみ"),
            Self::Digits { .. } => Some("数字4桁"),
        }
    }
}

/// InputBox入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// プロンプトメッセージ
    pub prompt: String,
    /// 現在の入力値
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 確定時に書き込むフィールド
    pub target: FormField,
    /// 入力制限
    pub filter: InputFilter,
}

impl InputBoxState {
    /// フィールドの現在値を初期値として入力ボックスを開く。
    pub fn for_field(target: FormField, value: String) -> Self {
        let filter = InputFilter::for_field(target);
        // 既存値も入力制限に合わせて整える。
        let value: String = match filter {
            InputFilter::Digits { max_len } => crate::form::digits_only(&value, max_len),
            _ => value,
        };
        Self {
            prompt: format!("{}:", target.label()),
            cursor: value.chars().count(),
            value,
            target,
            filter,
        }
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// バイト位置へ変換する。
    fn byte_at(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// 文字を挿入（入力制限に反する文字は無視）。戻り値は挿入できたか。
    pub fn insert_char(&mut self, c: char) -> bool {
        // 制限に合わない文字は受け付けない。
        if !self.filter.accepts(c, self.len()) {
            return false;
        }
        // カーソル位置へ挿入して進める。
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
        true
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        // カーソルが先頭なら何もしない。
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        // カーソルが末尾なら何もしない。
        if self.cursor < self.len() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// カーソルを左に移動
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// カーソルを右に移動
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    /// カーソルを先頭に移動
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// カーソルを末尾に移動
    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    /// 行全体をクリア
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// InputBoxをポップアップとして描画
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    // 中央に配置されたポップアップ領域を計算する。
    let popup_area = centered_popup(f.area(), 70, 7);

    // 既存の描画を消してポップアップ用の背景にする。
    f.render_widget(Clear, popup_area);

    // ポップアップの外枠を描画する。
    let block = Block::default()
        .borders(Borders::ALL)
        .title(state.target.key())
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    // 内部レイアウト（プロンプト + 入力フィールド + 空行 + ヘルプ）。
    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(popup_area);

    // プロンプトを描画する。
    let prompt_widget = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt_widget, inner[0]);

    // 入力値をカーソル付きで描画する（横スクロール対応）。
    let visible = visible_with_cursor(state, inner[1].width as usize);
    let input_widget = Paragraph::new(visible).style(Style::default().fg(Color::Green));
    f.render_widget(input_widget, inner[1]);

    // ヘルプテキストに入力制限の説明を添える。
    let help = match state.filter.hint() {
        Some(hint) => format!("Enter=確定 | ESC=キャンセル | Ctrl+U=クリア | {hint}"),
        None => "Enter=確定 | ESC=キャンセル | Ctrl+U=クリア".to_string(),
    };
    let help = Paragraph::new(help)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, inner[3]);
}

/// 表示幅に収まる範囲を切り出し、カーソル位置に`|`を挿入する。
fn visible_with_cursor(state: &InputBoxState, width: usize) -> String {
    // カーソルが表示幅を超えたらスクロールさせる。
    let offset = state.cursor.saturating_sub(width.saturating_sub(2));
    let chars: Vec<char> = state.value.chars().skip(offset).take(width).collect();
    let at = (state.cursor - offset).min(chars.len());
    let before: String = chars[..at].iter().collect();
    let after: String = chars[at..].iter().collect();
    format!("{before}|{after}")
}

/// 中央配置のポップアップ領域を計算
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    // 縦方向の中央行を取り出す。
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    // 横方向も中央に寄せる。
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(rows[1])[1]
}
