//! Config model and persistence helpers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::fare::DayOfWeek;

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pricing policy handed to the tariff calculator.
    pub tariff: TariffCfg,
    /// Receipt numbering and presentation.
    pub receipt: ReceiptCfg,
}

/// Rates applied by the tariff calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffCfg {
    /// Price per kilometer, used when the request carries no rate of its own.
    pub per_km: f64,
    /// Price per minute of trip duration.
    pub per_minute: f64,
    /// Flat request fee, used when the request carries none.
    pub request_fee: f64,
    /// Lower bound for the final calculated total.
    pub minimum_total: f64,
    /// Surcharge factor per day of the week.
    pub day_multipliers: DayMultipliers,
}

/// One multiplier per weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayMultipliers {
    pub monday: f64,
    pub tuesday: f64,
    pub wednesday: f64,
    pub thursday: f64,
    pub friday: f64,
    pub saturday: f64,
    pub sunday: f64,
}

impl DayMultipliers {
    /// Multiplier configured for the given day.
    pub fn for_day(&self, day: DayOfWeek) -> f64 {
        match day {
            DayOfWeek::Monday => self.monday,
            DayOfWeek::Tuesday => self.tuesday,
            DayOfWeek::Wednesday => self.wednesday,
            DayOfWeek::Thursday => self.thursday,
            DayOfWeek::Friday => self.friday,
            DayOfWeek::Saturday => self.saturday,
            DayOfWeek::Sunday => self.sunday,
        }
    }
}

/// Receipt related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptCfg {
    /// Prefix for generated receipt numbers.
    pub number_prefix: String,
    /// Symbol shown in front of amounts.
    pub currency_symbol: String,
    /// Clear the form once a receipt has been emitted.
    pub reset_after_submit: bool,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&s).with_context(|| format!("invalid config in {}", path.display()))
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl Default for Config {
    /// Weekend trips carry a surcharge; Friday a smaller one.
    fn default() -> Self {
        Self {
            tariff: TariffCfg {
                per_km: 6.5,
                per_minute: 1.8,
                request_fee: 10.0,
                minimum_total: 35.0,
                day_multipliers: DayMultipliers {
                    monday: 1.0,
                    tuesday: 1.0,
                    wednesday: 1.0,
                    thursday: 1.0,
                    friday: 1.1,
                    saturday: 1.2,
                    sunday: 1.2,
                },
            },
            receipt: ReceiptCfg {
                number_prefix: "RCPT".into(),
                currency_symbol: "$".into(),
                reset_after_submit: false,
            },
        }
    }
}
