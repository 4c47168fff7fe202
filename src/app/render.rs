//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::{
    events::Screen,
    fare::resolve_day_of_week,
    form::{FormField, SubmitPhase, TotalEntry},
    input, layout,
    receipt::ReceiptRecord,
    shortcuts::{Shortcuts, format_keys},
};

use super::App;

/// 金額を通貨記号付きで小数2桁に整形する。
pub fn money(symbol: &str, amount: f64) -> String {
    format!("{symbol}{amount:.2}")
}

/// 画面全体を描画する。
pub fn draw(f: &mut Frame, app: &App) {
    // Body + HELP + STATUS に分割する。
    let main_layout = layout::create_main_layout(f.area());

    match app.ui.screen {
        Screen::Form => draw_form_screen(f, app, main_layout.body),
        Screen::Receipt => draw_receipt_screen(f, app, main_layout.body),
    }

    // HELPバー（画面ごとのショートカット）を描画する。
    let help_bar = Paragraph::new(help_text(app.ui.screen, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    // STATUSバーを描画する。
    f.render_widget(build_status_bar(app), main_layout.status_bar);

    // 入力ボックスが開いていれば重ねて描画する。
    if let Some(state) = &app.input_box {
        input::render_input_box(f, state);
    }
}

/// フォーム画面（入力欄 + INFOパネル）を描画する。
fn draw_form_screen(f: &mut Frame, app: &App, area: Rect) {
    let body = layout::create_body_layout(area);

    let form = Paragraph::new(form_lines(app))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Formulario de Recibo"),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(form, body.form);

    let info = Paragraph::new(info_lines(app))
        .block(Block::default().borders(Borders::ALL).title("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, body.info_panel);
}

/// 各フィールドの行と、検証エラーの行を組み立てる。
fn form_lines(app: &App) -> Vec<Line<'static>> {
    let symbol = &app.cfg.receipt.currency_symbol;
    let mut lines = Vec::new();

    for field in FormField::ALL {
        let selected = field == app.ui.selected;
        let marker = if selected { "→ " } else { "  " };

        // 上書き合計が空なら計算値をプレースホルダとして薄く表示する。
        let value = app.form.field_value(field);
        let value_span = if value.is_empty() && field == FormField::FinalTotal {
            let hint = match app.form.preview() {
                Some(fare) => format!("auto: {}", money(symbol, fare.total)),
                None => "Monto total calculado automáticamente".to_string(),
            };
            Span::styled(hint, Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(value)
        };

        let label_style = if selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(255, 140, 0))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(field.label().to_string(), label_style),
            Span::raw(": "),
            value_span,
        ]));

        if let Some(msg) = app.form.errors().get(&field) {
            lines.push(Line::from(Span::styled(
                format!("    {msg}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

/// 料金プレビューとログを組み立てる。
fn info_lines(app: &App) -> Vec<Line<'static>> {
    let symbol = &app.cfg.receipt.currency_symbol;
    let mut lines = vec![Line::from("Tarifa".bold())];

    match app.form.preview() {
        Some(fare) => {
            let day = resolve_day_of_week(&app.form.fields().trip_date)
                .map(|d| d.label())
                .unwrap_or("-");
            lines.push(Line::from(format!("Día: {day}")));
            lines.push(Line::from(format!("Tarifa base: {}", money(symbol, fare.base_fare))));
            lines.push(Line::from(format!(
                "Cuota de solicitud: {}",
                money(symbol, fare.request_fee)
            )));
            lines.push(Line::from(format!("Multiplicador: x{:.2}", fare.day_multiplier)));
            lines.push(Line::from(format!("Total calculado: {}", money(symbol, fare.total))));
            let final_total = app.form.total().resolve(fare.total);
            lines.push(Line::from(format!("Total final: {}", money(symbol, final_total))));
        }
        None => lines.push(Line::from(
            "Ingrese distancia, duración y fecha para calcular.".to_string(),
        )),
    }

    // 上書きの状態を示す。
    if let TotalEntry::Overridden { amount, .. } = app.form.total() {
        lines.push(Line::from(format!("Monto modificado: {}", money(symbol, *amount))));
        if app.form.override_is_stale() {
            lines.push(Line::from(Span::styled(
                "El viaje cambió después de modificar el monto".to_string(),
                Style::default().fg(Color::Yellow),
            )));
        }
    }

    if let SubmitPhase::Emitted { receipt_number } = app.form.phase() {
        lines.push(Line::from(Span::styled(
            format!("Emitido: {receipt_number}"),
            Style::default().fg(Color::Green),
        )));
    }

    // 直近のログを末尾に表示する。
    lines.push(Line::from(""));
    lines.push(Line::from("Log:".bold()));
    let start = app.ui.log.len().saturating_sub(8);
    lines.extend(app.ui.log[start..].iter().cloned().map(Line::from));
    lines
}

/// 領収書表示画面を描画する。
fn draw_receipt_screen(f: &mut Frame, app: &App, area: Rect) {
    let text = match &app.last_receipt {
        Some(r) => receipt_lines(r, &app.cfg.receipt.currency_symbol),
        None => vec![Line::from("No receipt issued yet")],
    };
    let height = text.len() as u16 + 2;
    let panel = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("RECIBO"))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, layout::centered_rect(area, 60, height));
}

/// 領収書の表示行。
fn receipt_lines(r: &ReceiptRecord, symbol: &str) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::from(format!("No. {}", r.receipt_number)).bold()),
        Line::from(format!("Emitido: {}", r.timestamp)),
        Line::from(""),
        Line::from(format!("Origen: {}", r.pickup_address)),
        Line::from(format!("Destino: {}", r.destination_address)),
        Line::from(format!("Fecha: {} {}", r.trip_date, r.trip_time)),
        Line::from(format!("Distancia: {} km", r.distance)),
        Line::from(format!("Duración: {} min", r.duration)),
        Line::from(""),
        Line::from(format!("Tarifa base: {}", money(symbol, r.base_fare))),
        Line::from(format!("Cuota de solicitud: {}", money(symbol, r.request_fee))),
        Line::from(format!("Multiplicador: x{:.2}", r.day_multiplier)),
        Line::from(format!("Total calculado: {}", money(symbol, r.calculated_total))),
        Line::from(Span::from(format!("Total: {}", money(symbol, r.final_total))).bold()),
    ];
    if r.is_overridden() {
        lines.push(Line::from(Span::styled(
            "(monto modificado manualmente)".to_string(),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Pago: {} **** {}",
        r.payment_method, r.card_last_four
    )));
    lines
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let screen_name = match app.ui.screen {
        Screen::Form => "Form",
        Screen::Receipt => "Receipt",
    };

    // エラーの有無で表示を切り替える。
    let status_text = match &app.ui.error {
        Some(err) => format!("[{screen_name}] Issued: {} | ERROR: {err}", app.issued),
        None => format!("[{screen_name}] Issued: {} | {}", app.issued, app.ui.status),
    };

    let mut status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });

    // エラー時は赤色で強調表示する。
    if app.ui.error.is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }
    status_bar
}

/// 現在画面に応じたヘルプ文字列を返す。
fn help_text(screen: Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::Form => {
            let sc = &shortcuts.form;
            format!(
                "{}: edit | {}/{}: move | {}: clear | {}: submit | {}: new | {}: receipt | {}: quit",
                format_keys(&sc.edit_field),
                format_keys(&sc.next_field),
                format_keys(&sc.prev_field),
                format_keys(&sc.clear_field),
                format_keys(&sc.submit),
                format_keys(&sc.new_form),
                format_keys(&sc.view_receipt),
                format_keys(&sc.quit),
            )
        }
        Screen::Receipt => format!(
            "{}: back to form | {}: new receipt",
            format_keys(&shortcuts.receipt.back),
            format_keys(&shortcuts.receipt.new_form),
        ),
    }
}
