//! ショートカット設定の管理。

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ショートカット設定の全体。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortcuts {
    pub form: FormShortcuts,
    pub receipt: ReceiptShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// 入力フォーム画面のショートカット。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormShortcuts {
    pub quit: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
    pub edit_field: Vec<String>,
    pub clear_field: Vec<String>,
    pub submit: Vec<String>,
    pub new_form: Vec<String>,
    pub view_receipt: Vec<String>,
}

/// 領収書表示画面のショートカット。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptShortcuts {
    pub back: Vec<String>,
    pub new_form: Vec<String>,
}

/// InputBoxのショートカット。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// TOMLから読み込み、無ければデフォルトを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 未作成の場合は既定値を利用する。
            return Ok(Self::default());
        }
        // 既存ファイルを読み込んでパースする。
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).with_context(|| format!("invalid shortcuts in {}", path.display()))
    }
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            form: FormShortcuts {
                quit: vec!["q".into()],
                next_field: vec!["Tab".into(), "Down".into(), "j".into()],
                prev_field: vec!["BackTab".into(), "Up".into(), "k".into()],
                edit_field: vec!["Enter".into(), "e".into()],
                clear_field: vec!["Delete".into(), "x".into()],
                submit: vec!["s".into()],
                new_form: vec!["n".into()],
                view_receipt: vec!["v".into()],
            },
            receipt: ReceiptShortcuts {
                back: vec!["Esc".into(), "q".into()],
                new_form: vec!["n".into()],
            },
            input_box: InputBoxShortcuts {
                confirm: vec!["Enter".into()],
                cancel: vec!["Esc".into()],
                backspace: vec!["Backspace".into()],
                delete: vec!["Delete".into()],
                left: vec!["Left".into()],
                right: vec!["Right".into()],
                home: vec!["Home".into()],
                end: vec!["End".into()],
                clear_line: vec!["Ctrl+u".into()],
            },
        }
    }
}

/// ヘルプ表示用にキー一覧を連結する。
pub fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

/// KeyEventがいずれかのショートカット文字列と一致するか判定する。
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// KeyEventが単一のショートカット文字列と一致するか判定する。
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    // ショートカット文字列を分解する（例: "Ctrl+u", "a", "Enter"）。
    let parts: Vec<&str> = shortcut.split('+').collect();

    let (modifiers_str, key_str) = if parts.len() > 1 {
        // 修飾キー付きの形式（例: "Ctrl+u"）。
        (&parts[0..parts.len() - 1], parts[parts.len() - 1])
    } else {
        // 修飾キーなしの形式（例: "a", "Enter"）。
        (&[][..], parts[0])
    };

    // 修飾キーを解析して期待値を作る。
    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match *modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    // BackTabは端末によってShift付きで届くため、Shiftを無視して比べる。
    let actual_modifiers = if key.code == KeyCode::BackTab {
        key.modifiers.difference(KeyModifiers::SHIFT)
    } else {
        key.modifiers
    };

    // 修飾キーが一致しなければ即座に不一致とする。
    if actual_modifiers != expected_modifiers {
        return false;
    }

    // キーコードの種別ごとに一致判定を行う。
    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "BackTab" | "backtab" => key.code == KeyCode::BackTab,
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        // 単一文字は Char として比較する。
        s if s.len() == 1 => {
            if let Some(c) = s.chars().next() {
                key.code == KeyCode::Char(c)
            } else {
                false
            }
        }
        _ => false,
    }
}
