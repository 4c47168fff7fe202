//! キー入力ハンドラー関数。

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    events::Screen,
    form::{FormField, SubmitOutcome},
    input::InputBoxState,
    shortcuts,
};

use super::App;

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub fn handle_key(app: &mut App, k: KeyEvent) -> bool {
    // 入力ボックスが開いていれば最優先で処理する。
    if app.input_box.is_some() {
        handle_input_box_key(app, k);
        return false;
    }

    // 画面ごとのハンドラへ委譲する。
    match app.ui.screen {
        Screen::Form => handle_form_key(app, k),
        Screen::Receipt => {
            handle_receipt_key(app, k);
            false
        }
    }
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// フォーム画面のキー処理。
fn handle_form_key(app: &mut App, k: KeyEvent) -> bool {
    let sc = &app.shortcuts.form;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return true;
    } else if shortcuts::matches_shortcut(&k, &sc.next_field) {
        app.ui.selected = app.ui.selected.next();
    } else if shortcuts::matches_shortcut(&k, &sc.prev_field) {
        app.ui.selected = app.ui.selected.prev();
    } else if shortcuts::matches_shortcut(&k, &sc.edit_field) {
        // 現在値を初期値として入力ボックスを開く。
        let field = app.ui.selected;
        app.input_box = Some(InputBoxState::for_field(field, app.form.field_value(field)));
    } else if shortcuts::matches_shortcut(&k, &sc.clear_field) {
        let field = app.ui.selected;
        app.form.clear_field(field);
        app.ui.status = format!("Cleared {}", field.key());
    } else if shortcuts::matches_shortcut(&k, &sc.submit) {
        submit_form(app);
    } else if shortcuts::matches_shortcut(&k, &sc.new_form) {
        // 入力内容をすべて破棄して最初から。
        app.form.reset();
        app.ui.selected = FormField::PickupAddress;
        app.ui.error = None;
        app.ui.status = "New receipt".into();
        tracing::info!("form reset");
    } else if shortcuts::matches_shortcut(&k, &sc.view_receipt) {
        if app.last_receipt.is_some() {
            app.ui.screen = Screen::Receipt;
        } else {
            app.ui.status = "No receipt issued yet".into();
        }
    }

    false
}

/// フォームを送信し、結果をステータスへ反映する。
fn submit_form(app: &mut App) {
    match app.form.submit() {
        Ok(SubmitOutcome::Submitted { receipt_number }) => {
            // 画面遷移は領収書の受信側で行う。
            app.ui.error = None;
            app.ui.status = format!("Issuing {receipt_number}...");
        }
        Ok(SubmitOutcome::Invalid { errors }) => {
            // 最初のエラー項目へカーソルを移す。
            app.ui.error = None;
            if let Some(first) = app.form.errors().keys().next() {
                app.ui.selected = *first;
            }
            app.ui.status = format!("{errors} field(s) need attention");
        }
        Ok(SubmitOutcome::Duplicate { receipt_number }) => {
            app.ui.status =
                format!("Receipt {receipt_number} already issued; edit a field to issue another");
        }
        Err(e) => {
            // 計算側の失敗は画面に出してフォームへ戻す。
            tracing::error!("submit failed: {e:#}");
            app.ui.error = Some(format!("{e:#}"));
        }
    }
}

/// 領収書表示画面のキー処理。
fn handle_receipt_key(app: &mut App, k: KeyEvent) {
    let sc = &app.shortcuts.receipt;

    if shortcuts::matches_shortcut(&k, &sc.back) {
        app.ui.screen = Screen::Form;
    } else if shortcuts::matches_shortcut(&k, &sc.new_form) {
        app.form.reset();
        app.ui.selected = FormField::PickupAddress;
        app.ui.screen = Screen::Form;
        app.ui.status = "New receipt".into();
    }
}

/// 入力ボックスのキー処理。
fn handle_input_box_key(app: &mut App, k: KeyEvent) {
    let Some(state) = &mut app.input_box else {
        return;
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        // 閉じる前に値と対象を取り出す。
        let value = state.value.clone();
        let target = state.target;
        app.input_box = None;

        // フォームへ反映し、次のフィールドへ進む。
        app.form.set_field(target, &value);
        app.ui.error = None;
        app.ui.status = format!("Updated {}", target.key());
        app.ui.selected = target.next();
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        // 入力制限に合わない文字は入力ボックス側で捨てられる。
        state.insert_char(c);
    }
}
