//! TUIのイベントループと、フォーム・領収書を束ねるアプリ状態。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::{path::Path, time::Duration};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    events::{Screen, UiState},
    fare::{TariffCalculator, UuidReceiptNumbers},
    form::{FormField, ReceiptForm, SubmitHandler},
    input::InputBoxState,
    receipt::ReceiptRecord,
    shortcuts::Shortcuts,
    ui::Tui,
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 設定ファイルのパス。
const CONFIG_PATH: &str = "config.toml";
/// ショートカット設定ファイルのパス。
const SHORTCUTS_PATH: &str = "shortcut.toml";

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// 起動時に読み込んだ設定。
    pub cfg: Config,
    /// 画面・選択・ステータスなどUI固有の状態。
    pub ui: UiState,
    /// 乗車情報フォーム。
    pub form: ReceiptForm,
    /// フォームの送信ハンドラから届く領収書。
    pub receipt_rx: mpsc::UnboundedReceiver<ReceiptRecord>,
    /// 直近に発行した領収書。
    pub last_receipt: Option<ReceiptRecord>,
    /// このセッションで発行した枚数。
    pub issued: usize,
    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,
    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

impl App {
    /// 設定から料金計算器と採番器を組み立て、フォームを用意する。
    pub fn new(cfg: Config, shortcuts: Shortcuts) -> Self {
        // 送信された領収書はチャネル経由でループ側が受け取る。
        let (tx, rx) = mpsc::unbounded_channel::<ReceiptRecord>();
        let on_submit: SubmitHandler = Box::new(move |record: ReceiptRecord| {
            if tx.send(record).is_err() {
                tracing::warn!("receipt dropped: receiver closed");
            }
        });

        let form = ReceiptForm::new(
            Box::new(TariffCalculator::new(cfg.tariff.clone())),
            Box::new(UuidReceiptNumbers::new(cfg.receipt.number_prefix.clone())),
            on_submit,
        );

        Self {
            cfg,
            ui: UiState::new(),
            form,
            receipt_rx: rx,
            last_receipt: None,
            issued: 0,
            input_box: None,
            shortcuts,
        }
    }

    /// 届いている領収書をすべて取り込む。
    pub fn drain_receipts(&mut self) {
        while let Ok(record) = self.receipt_rx.try_recv() {
            self.accept_receipt(record);
        }
    }

    /// 発行された領収書を表示状態へ反映する。
    fn accept_receipt(&mut self, record: ReceiptRecord) {
        self.issued += 1;
        self.ui.push_log(format!(
            "{} {}",
            record.receipt_number,
            render::money(&self.cfg.receipt.currency_symbol, record.final_total)
        ));
        self.ui.status = format!("Receipt {} issued", record.receipt_number);
        self.ui.screen = Screen::Receipt;

        // 設定で有効なときだけフォームを空にする。
        if self.cfg.receipt.reset_after_submit {
            self.form.reset();
            self.ui.selected = FormField::PickupAddress;
        }
        self.last_receipt = Some(record);
    }
}

/// ユーザーが終了するまでメインTUIループを回す。
pub fn run_app(terminal: &mut Tui) -> Result<()> {
    // 設定ファイルを読み込む（初回はデフォルトを生成）。
    let cfg = Config::load_or_default(Path::new(CONFIG_PATH))?;
    tracing::info!(
        "config loaded: prefix={} reset_after_submit={}",
        cfg.receipt.number_prefix,
        cfg.receipt.reset_after_submit
    );

    // ショートカット設定を読み込む（無ければデフォルト）。
    let shortcuts = Shortcuts::load_or_default(SHORTCUTS_PATH)?;

    let mut app = App::new(cfg, shortcuts);

    loop {
        // 送信済みの領収書を先に取り込んでから描画する。
        app.drain_receipts();
        terminal.draw(|f| draw(f, &app))?;

        // 短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(k) = event::read()?
        {
            // どの画面でもCtrl+Cで終了できるようにする。
            if is_ctrl_c(&k) {
                break;
            }
            // キーリピートやリリースは無視する。
            if k.kind != KeyEventKind::Press {
                continue;
            }
            if handle_key(&mut app, k) {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn press(app: &mut App, code: KeyCode) -> bool {
        let quit = handle_key(app, KeyEvent::new(code, KeyModifiers::empty()));
        app.drain_receipts();
        quit
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    /// 選択中のフィールドを入力ボックス経由で埋めて次へ進む。
    fn fill(app: &mut App, text: &str) {
        press(app, KeyCode::Enter);
        type_text(app, text);
        press(app, KeyCode::Enter);
    }

    fn filled_app() -> App {
        let mut app = App::new(Config::default(), Shortcuts::default());
        for value in [
            "Main St 1",
            "2nd Ave",
            "2024-05-01",
            "14:30",
            "10",
            "20",
            "Visa",
            "1234",
        ] {
            fill(&mut app, value);
        }
        app
    }

    #[test]
    fn test_keyboard_flow_issues_receipt() {
        // キー操作だけで領収書が発行され、表示画面へ移る。
        let mut app = filled_app();
        assert_eq!(app.ui.selected, FormField::FinalTotal);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.issued, 1);
        assert_eq!(app.ui.screen, Screen::Receipt);
        let receipt = app.last_receipt.as_ref().unwrap();
        assert_eq!(receipt.calculated_total, 111.0);
        assert_eq!(receipt.final_total, 111.0);
        assert!(receipt.receipt_number.starts_with("RCPT-"));
    }

    #[test]
    fn test_double_submit_issues_once() {
        // 連打しても2枚目は発行されない。
        let mut app = filled_app();
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.issued, 1);
        assert!(app.ui.status.contains("already issued"));
    }

    #[test]
    fn test_invalid_submit_selects_first_error() {
        // 検証エラー時は最初のエラー項目へ移動する。
        let mut app = App::new(Config::default(), Shortcuts::default());
        press(&mut app, KeyCode::Tab);
        fill(&mut app, "2nd Ave");
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.issued, 0);
        assert_eq!(app.ui.screen, Screen::Form);
        assert_eq!(app.ui.selected, FormField::PickupAddress);
        assert_eq!(app.form.errors().len(), 7);
    }

    #[test]
    fn test_bad_date_shows_error_without_receipt() {
        // 日付が解釈できなければエラー表示のみで発行しない。
        let mut app = filled_app();
        app.form.set_field(FormField::TripDate, "2024-02-30");
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.issued, 0);
        assert!(app.ui.error.is_some());
    }

    #[test]
    fn test_reset_after_submit_when_configured() {
        // 設定が有効なら発行後にフォームを空にする。
        let mut cfg = Config::default();
        cfg.receipt.reset_after_submit = true;
        let mut app = App::new(cfg, Shortcuts::default());
        app.form.set_field(FormField::PickupAddress, "Main St 1");
        app.form.set_field(FormField::DestinationAddress, "2nd Ave");
        app.form.set_field(FormField::TripDate, "2024-05-01");
        app.form.set_field(FormField::TripTime, "14:30");
        app.form.set_field(FormField::Distance, "10");
        app.form.set_field(FormField::Duration, "20");
        app.form.set_field(FormField::PaymentMethod, "Visa");
        app.form.set_field(FormField::CardLastFour, "1234");

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.issued, 1);
        assert!(app.form.fields().pickup_address.is_empty());
        assert!(app.last_receipt.is_some());
    }

    #[test]
    fn test_quit_from_form() {
        // フォーム画面のqで終了する。
        let mut app = App::new(Config::default(), Shortcuts::default());
        assert!(press(&mut app, KeyCode::Char('q')));
    }
}
