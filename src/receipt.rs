//! 発行済み領収書レコード。

use anyhow::Result;
use serde::Serialize;

/// 1回の送信で確定した領収書。構築後は変更しない。
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    /// 運転手名（フォームでは常に空）。
    pub driver_name: String,
    pub pickup_address: String,
    pub destination_address: String,
    /// 乗車日（YYYY-MM-DD）。
    pub trip_date: String,
    /// 乗車時刻（HH:MM）。
    pub trip_time: String,
    /// 距離（km）。
    pub distance: f64,
    /// 所要時間（分）。
    pub duration: i64,
    pub payment_method: String,
    /// カード下4桁。
    pub card_last_four: String,
    pub base_fare: f64,
    pub request_fee: f64,
    pub day_multiplier: f64,
    /// 料金計算器が返した合計。
    pub calculated_total: f64,
    /// 請求額（上書きがあればその値）。
    pub final_total: f64,
    pub receipt_number: String,
    /// 送信時刻（RFC 3339, UTC）。
    pub timestamp: String,
}

impl ReceiptRecord {
    /// 合計が手入力で上書きされたか。
    pub fn is_overridden(&self) -> bool {
        self.final_total != self.calculated_total
    }

    /// ログ出力用のJSON表現。
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
