//! 画面種別と描画側と共有するUI状態。

use crate::form::FormField;

/// TUIで現在表示中の画面。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// 乗車情報の入力フォーム。
    Form,
    /// 直近に発行した領収書の表示。
    Receipt,
}

/// 描画側と共有するUI状態。
#[derive(Clone, Debug)]
pub struct UiState {
    /// 現在の画面。
    pub screen: Screen,
    /// フォーム上で選択中のフィールド。
    pub selected: FormField,
    /// 右側パネルに表示するログ。
    pub log: Vec<String>,
    /// 画面下部のステータス文言。
    pub status: String,
    /// エラーメッセージ（強調表示用）。
    pub error: Option<String>,
}

impl UiState {
    /// フォーム画面の先頭フィールドから始める。
    pub fn new() -> Self {
        Self {
            screen: Screen::Form,
            selected: FormField::PickupAddress,
            log: vec![],
            status: "Ready".into(),
            error: None,
        }
    }

    /// ログ行を追加する（古いものから捨てる）。
    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
        if self.log.len() > 50 {
            self.log.remove(0);
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
