//! Fare collaborators: day-of-week resolution, tariff pricing and receipt numbering.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TariffCfg;

/// Day of the week a trip took place on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl DayOfWeek {
    /// Display label used on the form and receipt.
    pub fn label(self) -> &'static str {
        match self {
            Self::Monday => "lunes",
            Self::Tuesday => "martes",
            Self::Wednesday => "miércoles",
            Self::Thursday => "jueves",
            Self::Friday => "viernes",
            Self::Saturday => "sábado",
            Self::Sunday => "domingo",
        }
    }
}

/// Resolve the weekday of an ISO calendar date (`YYYY-MM-DD`).
pub fn resolve_day_of_week(date_ymd: &str) -> Result<DayOfWeek> {
    let date = NaiveDate::parse_from_str(date_ymd.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid trip date '{date_ymd}' (expected YYYY-MM-DD)"))?;
    Ok(date.weekday().into())
}

/// Inputs handed to a fare calculator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FareRequest {
    /// Trip distance in kilometers.
    pub distance_km: f64,
    /// Trip duration in minutes.
    pub duration_min: f64,
    pub day_of_week: DayOfWeek,
    /// Per-km rate requested by the caller; zero defers to the calculator.
    pub base_fare_per_km: f64,
    /// Request fee requested by the caller; zero defers to the calculator.
    pub request_fee: f64,
}

/// Price breakdown returned by a fare calculator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareBreakdown {
    pub base_fare: f64,
    pub request_fee: f64,
    pub day_multiplier: f64,
    pub total: f64,
}

/// Pricing policy seam used by the receipt form.
pub trait FareCalculator {
    /// Price a trip. Must be pure.
    fn compute_fare(&self, req: &FareRequest) -> FareBreakdown;
}

/// Calculator driven by the `[tariff]` config section.
#[derive(Clone, Debug)]
pub struct TariffCalculator {
    tariff: TariffCfg,
}

impl TariffCalculator {
    pub fn new(tariff: TariffCfg) -> Self {
        Self { tariff }
    }
}

impl FareCalculator for TariffCalculator {
    fn compute_fare(&self, req: &FareRequest) -> FareBreakdown {
        let per_km = if req.base_fare_per_km > 0.0 {
            req.base_fare_per_km
        } else {
            self.tariff.per_km
        };
        let request_fee = if req.request_fee > 0.0 {
            req.request_fee
        } else {
            self.tariff.request_fee
        };

        let base_fare = round_cents(req.distance_km * per_km + req.duration_min * self.tariff.per_minute);
        let day_multiplier = self.tariff.day_multipliers.for_day(req.day_of_week);
        let total = ((base_fare + request_fee) * day_multiplier).max(self.tariff.minimum_total);

        FareBreakdown {
            base_fare,
            request_fee,
            day_multiplier,
            total: round_cents(total),
        }
    }
}

/// Round an amount to two decimals.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Source of receipt numbers. Implementations guarantee uniqueness.
pub trait ReceiptNumberGenerator {
    fn generate(&mut self) -> String;
}

/// Receipt numbers derived from random v4 UUIDs.
#[derive(Clone, Debug)]
pub struct UuidReceiptNumbers {
    prefix: String,
}

impl UuidReceiptNumbers {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ReceiptNumberGenerator for UuidReceiptNumbers {
    fn generate(&mut self) -> String {
        let id = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("{}-{}", self.prefix, &id[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn request(distance_km: f64, duration_min: f64, day_of_week: DayOfWeek) -> FareRequest {
        FareRequest {
            distance_km,
            duration_min,
            day_of_week,
            base_fare_per_km: 0.0,
            request_fee: 0.0,
        }
    }

    #[test]
    fn resolves_known_dates() {
        assert_eq!(resolve_day_of_week("2024-05-01").unwrap(), DayOfWeek::Wednesday);
        assert_eq!(resolve_day_of_week(" 2024-05-05 ").unwrap(), DayOfWeek::Sunday);
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(resolve_day_of_week("2024-13-01").is_err());
        assert!(resolve_day_of_week("01/05/2024").is_err());
        assert!(resolve_day_of_week("").is_err());
    }

    #[test]
    fn zero_rates_defer_to_tariff() {
        let calc = TariffCalculator::new(Config::default().tariff);
        let fare = calc.compute_fare(&request(10.0, 20.0, DayOfWeek::Wednesday));
        // 10 * 6.5 + 20 * 1.8
        assert_eq!(fare.base_fare, 101.0);
        assert_eq!(fare.request_fee, 10.0);
        assert_eq!(fare.day_multiplier, 1.0);
        assert_eq!(fare.total, 111.0);
    }

    #[test]
    fn explicit_rates_win_over_tariff() {
        let calc = TariffCalculator::new(Config::default().tariff);
        let mut req = request(10.0, 0.0, DayOfWeek::Monday);
        req.base_fare_per_km = 8.0;
        req.request_fee = 5.0;
        let fare = calc.compute_fare(&req);
        assert_eq!(fare.base_fare, 80.0);
        assert_eq!(fare.request_fee, 5.0);
        assert_eq!(fare.total, 85.0);
    }

    #[test]
    fn weekend_multiplier_applies() {
        let calc = TariffCalculator::new(Config::default().tariff);
        let fare = calc.compute_fare(&request(10.0, 20.0, DayOfWeek::Saturday));
        assert_eq!(fare.day_multiplier, 1.2);
        assert_eq!(fare.total, 133.2);
    }

    #[test]
    fn short_trips_hit_the_minimum() {
        let calc = TariffCalculator::new(Config::default().tariff);
        let fare = calc.compute_fare(&request(0.5, 2.0, DayOfWeek::Tuesday));
        assert_eq!(fare.total, 35.0);
    }

    #[test]
    fn receipt_numbers_are_prefixed_and_distinct() {
        let mut numbers = UuidReceiptNumbers::new("RCPT");
        let a = numbers.generate();
        let b = numbers.generate();
        assert!(a.starts_with("RCPT-"));
        assert_eq!(a.len(), "RCPT-".len() + 12);
        assert_ne!(a, b);
    }
}
