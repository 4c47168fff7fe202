//! Trip receipt form: field state, validation and receipt emission.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use crate::{
    fare::{FareBreakdown, FareCalculator, FareRequest, ReceiptNumberGenerator, resolve_day_of_week},
    receipt::ReceiptRecord,
};

/// Editable fields, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    PickupAddress,
    DestinationAddress,
    TripDate,
    TripTime,
    Distance,
    Duration,
    PaymentMethod,
    CardLastFour,
    FinalTotal,
}

impl FormField {
    pub const ALL: [FormField; 9] = [
        FormField::PickupAddress,
        FormField::DestinationAddress,
        FormField::TripDate,
        FormField::TripTime,
        FormField::Distance,
        FormField::Duration,
        FormField::PaymentMethod,
        FormField::CardLastFour,
        FormField::FinalTotal,
    ];

    /// Stable identifier, matching the receipt's JSON keys.
    pub fn key(self) -> &'static str {
        match self {
            Self::PickupAddress => "pickupAddress",
            Self::DestinationAddress => "destinationAddress",
            Self::TripDate => "tripDate",
            Self::TripTime => "tripTime",
            Self::Distance => "distance",
            Self::Duration => "duration",
            Self::PaymentMethod => "paymentMethod",
            Self::CardLastFour => "cardLastFour",
            Self::FinalTotal => "finalTotal",
        }
    }

    /// Label shown next to the field.
    pub fn label(self) -> &'static str {
        match self {
            Self::PickupAddress => "Dirección de origen",
            Self::DestinationAddress => "Dirección de destino",
            Self::TripDate => "Fecha del viaje",
            Self::TripTime => "Hora del viaje",
            Self::Distance => "Distancia (km)",
            Self::Duration => "Duración (minutos)",
            Self::PaymentMethod => "Método de pago",
            Self::CardLastFour => "Últimos 4 dígitos de la tarjeta",
            Self::FinalTotal => "Monto total (puede modificar)",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    /// Next field, wrapping around.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous field, wrapping around.
    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Raw trip inputs as the user entered them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TripFields {
    pub pickup_address: String,
    pub destination_address: String,
    pub trip_date: String,
    pub trip_time: String,
    pub distance: Option<f64>,
    pub duration: Option<i64>,
    pub payment_method: String,
    pub card_last_four: String,
}

/// Validation messages keyed by field.
pub type FieldErrors = BTreeMap<FormField, String>;

/// Check every field and report all failures together.
pub fn validate(fields: &TripFields) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if fields.pickup_address.trim().is_empty() {
        errors.insert(FormField::PickupAddress, "La dirección de origen es requerida".into());
    }
    if fields.destination_address.trim().is_empty() {
        errors.insert(
            FormField::DestinationAddress,
            "La dirección de destino es requerida".into(),
        );
    }
    if fields.trip_date.is_empty() {
        errors.insert(FormField::TripDate, "La fecha del viaje es requerida".into());
    }
    if fields.trip_time.is_empty() {
        errors.insert(FormField::TripTime, "La hora del viaje es requerida".into());
    }
    if !fields.distance.is_some_and(|d| d > 0.0) {
        errors.insert(FormField::Distance, "La distancia debe ser un número positivo".into());
    }
    if !fields.duration.is_some_and(|d| d > 0) {
        errors.insert(FormField::Duration, "La duración debe ser un número positivo".into());
    }
    if fields.payment_method.trim().is_empty() {
        errors.insert(FormField::PaymentMethod, "El método de pago es requerido".into());
    }
    if fields.card_last_four.trim().is_empty() || fields.card_last_four.chars().count() != 4 {
        errors.insert(
            FormField::CardLastFour,
            "Los últimos 4 dígitos de la tarjeta son requeridos".into(),
        );
    }
    errors
}

/// Fare inputs an override was entered against.
#[derive(Clone, Debug, PartialEq)]
pub struct FareBasis {
    pub distance: Option<f64>,
    pub duration: Option<i64>,
    pub trip_date: String,
}

impl FareBasis {
    fn of(fields: &TripFields) -> Self {
        Self {
            distance: fields.distance,
            duration: fields.duration,
            trip_date: fields.trip_date.clone(),
        }
    }
}

/// Where the receipt's final total comes from.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TotalEntry {
    /// Use whatever the calculator returns.
    #[default]
    Calculated,
    /// User-entered amount.
    Overridden { amount: f64, basis: FareBasis },
}

impl TotalEntry {
    /// Final total given a freshly calculated one.
    pub fn resolve(&self, calculated: f64) -> f64 {
        match self {
            Self::Calculated => calculated,
            Self::Overridden { amount, .. } => *amount,
        }
    }
}

/// Whether the current inputs have already produced a receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmitPhase {
    #[default]
    Editing,
    Emitted { receipt_number: String },
}

/// Result of a submit attempt that did not fail outright.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// A receipt was handed to the submit handler.
    Submitted { receipt_number: String },
    /// Validation failed; nothing was emitted.
    Invalid { errors: usize },
    /// Inputs unchanged since the last emission; nothing was emitted.
    Duplicate { receipt_number: String },
}

/// Receives each emitted receipt.
pub type SubmitHandler = Box<dyn FnMut(ReceiptRecord)>;

/// Form state plus the collaborators needed to turn it into a receipt.
pub struct ReceiptForm {
    fields: TripFields,
    total: TotalEntry,
    errors: FieldErrors,
    phase: SubmitPhase,
    calculator: Box<dyn FareCalculator>,
    numbers: Box<dyn ReceiptNumberGenerator>,
    clock: fn() -> DateTime<Utc>,
    on_submit: SubmitHandler,
}

impl ReceiptForm {
    pub fn new(
        calculator: Box<dyn FareCalculator>,
        numbers: Box<dyn ReceiptNumberGenerator>,
        on_submit: SubmitHandler,
    ) -> Self {
        Self {
            fields: TripFields::default(),
            total: TotalEntry::Calculated,
            errors: FieldErrors::new(),
            phase: SubmitPhase::Editing,
            calculator,
            numbers,
            clock: Utc::now,
            on_submit,
        }
    }

    /// Replace the clock used for receipt timestamps.
    #[allow(dead_code)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn fields(&self) -> &TripFields {
        &self.fields
    }

    pub fn total(&self) -> &TotalEntry {
        &self.total
    }

    /// Errors from the last validation pass.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn phase(&self) -> &SubmitPhase {
        &self.phase
    }

    /// Apply raw input to a field. Numeric fields become unset when the
    /// input is empty or not a finite number.
    pub fn set_field(&mut self, field: FormField, raw: &str) {
        match field {
            FormField::PickupAddress => self.fields.pickup_address = raw.to_string(),
            FormField::DestinationAddress => self.fields.destination_address = raw.to_string(),
            FormField::TripDate => self.fields.trip_date = raw.trim().to_string(),
            FormField::TripTime => self.fields.trip_time = raw.trim().to_string(),
            FormField::Distance => self.fields.distance = parse_number(raw),
            FormField::Duration => self.fields.duration = raw.trim().parse().ok(),
            FormField::PaymentMethod => self.fields.payment_method = raw.to_string(),
            FormField::CardLastFour => self.fields.card_last_four = digits_only(raw, 4),
            FormField::FinalTotal => {
                self.total = match parse_number(raw) {
                    Some(amount) => TotalEntry::Overridden {
                        amount,
                        basis: FareBasis::of(&self.fields),
                    },
                    None => TotalEntry::Calculated,
                }
            }
        }
        self.phase = SubmitPhase::Editing;
    }

    /// Empty a single field.
    pub fn clear_field(&mut self, field: FormField) {
        self.set_field(field, "");
    }

    /// Current value of a field as text.
    pub fn field_value(&self, field: FormField) -> String {
        let f = &self.fields;
        match field {
            FormField::PickupAddress => f.pickup_address.clone(),
            FormField::DestinationAddress => f.destination_address.clone(),
            FormField::TripDate => f.trip_date.clone(),
            FormField::TripTime => f.trip_time.clone(),
            FormField::Distance => f.distance.map(|d| d.to_string()).unwrap_or_default(),
            FormField::Duration => f.duration.map(|d| d.to_string()).unwrap_or_default(),
            FormField::PaymentMethod => f.payment_method.clone(),
            FormField::CardLastFour => f.card_last_four.clone(),
            FormField::FinalTotal => match &self.total {
                TotalEntry::Calculated => String::new(),
                TotalEntry::Overridden { amount, .. } => amount.to_string(),
            },
        }
    }

    /// Clear every field, the override, errors and the submit phase.
    pub fn reset(&mut self) {
        self.fields = TripFields::default();
        self.total = TotalEntry::Calculated;
        self.errors.clear();
        self.phase = SubmitPhase::Editing;
    }

    /// True when an override was entered against different fare inputs.
    pub fn override_is_stale(&self) -> bool {
        match &self.total {
            TotalEntry::Calculated => false,
            TotalEntry::Overridden { basis, .. } => *basis != FareBasis::of(&self.fields),
        }
    }

    /// Fare for the current inputs, when they are complete enough to price.
    pub fn preview(&self) -> Option<FareBreakdown> {
        let distance = self.fields.distance.filter(|d| *d > 0.0)?;
        let duration = self.fields.duration.filter(|d| *d > 0)?;
        let request = self.fare_request(distance, duration).ok()?;
        Some(self.calculator.compute_fare(&request))
    }

    /// Validate, price and emit one receipt to the submit handler.
    ///
    /// Validation failures and duplicate submits are reported through
    /// [`SubmitOutcome`]; only a collaborator failure returns `Err`.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        if let SubmitPhase::Emitted { receipt_number } = &self.phase {
            tracing::warn!("duplicate submit ignored (receipt {receipt_number})");
            return Ok(SubmitOutcome::Duplicate {
                receipt_number: receipt_number.clone(),
            });
        }

        self.errors = validate(&self.fields);
        if !self.errors.is_empty() {
            let keys: Vec<&str> = self.errors.keys().map(|f| f.key()).collect();
            tracing::info!("validation failed: {}", keys.join(", "));
            return Ok(SubmitOutcome::Invalid {
                errors: self.errors.len(),
            });
        }

        let record = self.compose_receipt()?;
        let receipt_number = record.receipt_number.clone();
        tracing::info!(
            "receipt {} emitted: calculated={} final={}",
            receipt_number,
            record.calculated_total,
            record.final_total
        );
        if let Ok(json) = record.to_json() {
            tracing::debug!("receipt record: {json}");
        }

        self.phase = SubmitPhase::Emitted {
            receipt_number: receipt_number.clone(),
        };
        (self.on_submit)(record);
        Ok(SubmitOutcome::Submitted { receipt_number })
    }

    fn fare_request(&self, distance: f64, duration: i64) -> Result<FareRequest> {
        let day_of_week = resolve_day_of_week(&self.fields.trip_date)?;
        Ok(FareRequest {
            distance_km: distance,
            duration_min: duration as f64,
            day_of_week,
            base_fare_per_km: 0.0,
            request_fee: 0.0,
        })
    }

    /// Build the record from validated fields.
    fn compose_receipt(&mut self) -> Result<ReceiptRecord> {
        let f = &self.fields;
        let distance = f.distance.context("distance missing after validation")?;
        let duration = f.duration.context("duration missing after validation")?;

        let request = self
            .fare_request(distance, duration)
            .context("could not price the trip")?;
        let fare = self.calculator.compute_fare(&request);
        let receipt_number = self.numbers.generate();
        let timestamp = (self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true);

        let f = &self.fields;
        Ok(ReceiptRecord {
            driver_name: String::new(),
            pickup_address: f.pickup_address.clone(),
            destination_address: f.destination_address.clone(),
            trip_date: f.trip_date.clone(),
            trip_time: f.trip_time.clone(),
            distance,
            duration,
            payment_method: f.payment_method.clone(),
            card_last_four: f.card_last_four.clone(),
            base_fare: fare.base_fare,
            request_fee: fare.request_fee,
            day_multiplier: fare.day_multiplier,
            calculated_total: fare.total,
            final_total: self.total.resolve(fare.total),
            receipt_number,
            timestamp,
        })
    }
}

/// Number-input semantics: empty or non-finite input is unset.
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Keep ASCII digits only, up to `max` of them.
pub fn digits_only(raw: &str, max: usize) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fare::DayOfWeek;
    use chrono::TimeZone;
    use std::{cell::RefCell, rc::Rc};

    /// Calculator returning a fixed breakdown and recording what it was asked.
    struct FixedFare {
        total: f64,
        seen: Rc<RefCell<Vec<FareRequest>>>,
    }

    impl FareCalculator for FixedFare {
        fn compute_fare(&self, req: &FareRequest) -> FareBreakdown {
            self.seen.borrow_mut().push(*req);
            FareBreakdown {
                base_fare: req.distance_km * 2.0,
                request_fee: 3.0,
                day_multiplier: 1.5,
                total: self.total,
            }
        }
    }

    struct Counter(u32);

    impl ReceiptNumberGenerator for Counter {
        fn generate(&mut self) -> String {
            self.0 += 1;
            format!("T-{:04}", self.0)
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
    }

    struct Harness {
        form: ReceiptForm,
        emitted: Rc<RefCell<Vec<ReceiptRecord>>>,
        seen: Rc<RefCell<Vec<FareRequest>>>,
    }

    fn harness(total: f64) -> Harness {
        let emitted: Rc<RefCell<Vec<ReceiptRecord>>> = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = emitted.clone();
        let form = ReceiptForm::new(
            Box::new(FixedFare {
                total,
                seen: seen.clone(),
            }),
            Box::new(Counter(0)),
            Box::new(move |r: ReceiptRecord| sink.borrow_mut().push(r)),
        )
        .with_clock(fixed_now);
        Harness { form, emitted, seen }
    }

    fn fill_valid(form: &mut ReceiptForm) {
        form.set_field(FormField::PickupAddress, "Main St 1");
        form.set_field(FormField::DestinationAddress, "2nd Ave");
        form.set_field(FormField::TripDate, "2024-05-01");
        form.set_field(FormField::TripTime, "14:30");
        form.set_field(FormField::Distance, "10");
        form.set_field(FormField::Duration, "20");
        form.set_field(FormField::PaymentMethod, "Visa");
        form.set_field(FormField::CardLastFour, "1234");
    }

    #[test]
    fn empty_form_reports_every_field() {
        let errors = validate(&TripFields::default());
        assert_eq!(errors.len(), 8);
        assert!(!errors.contains_key(&FormField::FinalTotal));
        assert_eq!(
            errors[&FormField::Distance],
            "La distancia debe ser un número positivo"
        );
    }

    #[test]
    fn whitespace_only_text_is_missing() {
        let fields = TripFields {
            pickup_address: "   ".into(),
            destination_address: "\t".into(),
            payment_method: " ".into(),
            card_last_four: "    ".into(),
            ..TripFields::default()
        };
        let errors = validate(&fields);
        assert!(errors.contains_key(&FormField::PickupAddress));
        assert!(errors.contains_key(&FormField::DestinationAddress));
        assert!(errors.contains_key(&FormField::PaymentMethod));
        assert!(errors.contains_key(&FormField::CardLastFour));
    }

    #[test]
    fn non_positive_numbers_fail() {
        let fields = TripFields {
            distance: Some(0.0),
            duration: Some(-5),
            ..TripFields::default()
        };
        let errors = validate(&fields);
        assert!(errors.contains_key(&FormField::Distance));
        assert!(errors.contains_key(&FormField::Duration));
    }

    #[test]
    fn valid_submission_emits_once_with_calculated_total() {
        let mut h = harness(111.0);
        fill_valid(&mut h.form);

        let outcome = h.form.submit().unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Submitted {
                receipt_number: "T-0001".into()
            }
        );

        let emitted = h.emitted.borrow();
        assert_eq!(emitted.len(), 1);
        let r = &emitted[0];
        assert_eq!(r.calculated_total, 111.0);
        assert_eq!(r.final_total, 111.0);
        assert_eq!(r.driver_name, "");
        assert_eq!(r.distance, 10.0);
        assert_eq!(r.duration, 20);
        assert_eq!(r.card_last_four, "1234");
        assert_eq!(r.base_fare, 20.0);
        assert_eq!(r.request_fee, 3.0);
        assert_eq!(r.day_multiplier, 1.5);
        assert_eq!(r.timestamp, "2024-05-01T15:00:00.000Z");

        let seen = h.seen.borrow();
        assert_eq!(
            seen[0],
            FareRequest {
                distance_km: 10.0,
                duration_min: 20.0,
                day_of_week: DayOfWeek::Wednesday,
                base_fare_per_km: 0.0,
                request_fee: 0.0,
            }
        );
    }

    #[test]
    fn override_wins_over_calculated_total() {
        let mut h = harness(111.0);
        fill_valid(&mut h.form);
        h.form.set_field(FormField::FinalTotal, "99.99");

        h.form.submit().unwrap();
        let r = &h.emitted.borrow()[0];
        assert_eq!(r.final_total, 99.99);
        assert_eq!(r.calculated_total, 111.0);
    }

    #[test]
    fn clearing_override_falls_back_to_calculated() {
        let mut h = harness(42.0);
        fill_valid(&mut h.form);
        h.form.set_field(FormField::FinalTotal, "10");
        h.form.clear_field(FormField::FinalTotal);
        assert_eq!(h.form.total(), &TotalEntry::Calculated);

        h.form.submit().unwrap();
        assert_eq!(h.emitted.borrow()[0].final_total, 42.0);
    }

    #[test]
    fn missing_distance_blocks_submission() {
        let mut h = harness(111.0);
        fill_valid(&mut h.form);
        h.form.set_field(FormField::Distance, "");

        let outcome = h.form.submit().unwrap();
        assert_eq!(outcome, SubmitOutcome::Invalid { errors: 1 });
        assert_eq!(
            h.form.errors().get(&FormField::Distance).map(String::as_str),
            Some("La distancia debe ser un número positivo")
        );
        assert!(h.emitted.borrow().is_empty());
        assert!(h.seen.borrow().is_empty());
    }

    #[test]
    fn errors_are_recomputed_each_pass() {
        let mut h = harness(1.0);
        h.form.submit().unwrap();
        assert_eq!(h.form.errors().len(), 8);

        fill_valid(&mut h.form);
        h.form.set_field(FormField::TripTime, "");
        h.form.submit().unwrap();
        assert_eq!(h.form.errors().len(), 1);
        assert!(h.form.errors().contains_key(&FormField::TripTime));
    }

    #[test]
    fn card_input_keeps_four_digits() {
        let mut h = harness(1.0);
        h.form.set_field(FormField::CardLastFour, "12-3a4 56");
        assert_eq!(h.form.fields().card_last_four, "1234");

        h.form.set_field(FormField::CardLastFour, "x9y8");
        assert_eq!(h.form.fields().card_last_four, "98");
        assert!(validate(h.form.fields()).contains_key(&FormField::CardLastFour));
    }

    #[test]
    fn unparsable_numbers_become_unset() {
        let mut h = harness(1.0);
        h.form.set_field(FormField::Distance, "abc");
        h.form.set_field(FormField::Duration, "12.5");
        assert_eq!(h.form.fields().distance, None);
        assert_eq!(h.form.fields().duration, None);

        h.form.set_field(FormField::Distance, "NaN");
        assert_eq!(h.form.fields().distance, None);
    }

    #[test]
    fn repeated_submit_is_rejected_until_edited() {
        let mut h = harness(111.0);
        fill_valid(&mut h.form);

        h.form.submit().unwrap();
        let second = h.form.submit().unwrap();
        assert_eq!(
            second,
            SubmitOutcome::Duplicate {
                receipt_number: "T-0001".into()
            }
        );
        assert_eq!(h.emitted.borrow().len(), 1);

        h.form.set_field(FormField::TripTime, "14:35");
        h.form.submit().unwrap();
        let emitted = h.emitted.borrow();
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[1].receipt_number, "T-0002");
    }

    #[test]
    fn malformed_date_is_an_error_without_emission() {
        let mut h = harness(111.0);
        fill_valid(&mut h.form);
        h.form.set_field(FormField::TripDate, "01/05/2024");

        assert!(h.form.submit().is_err());
        assert!(h.emitted.borrow().is_empty());
        assert_eq!(h.form.phase(), &SubmitPhase::Editing);
    }

    #[test]
    fn stale_override_is_flagged_but_still_used() {
        let mut h = harness(111.0);
        fill_valid(&mut h.form);
        h.form.set_field(FormField::FinalTotal, "80");
        assert!(!h.form.override_is_stale());

        h.form.set_field(FormField::Distance, "12");
        assert!(h.form.override_is_stale());

        h.form.submit().unwrap();
        assert_eq!(h.emitted.borrow()[0].final_total, 80.0);
    }

    #[test]
    fn preview_needs_priceable_inputs() {
        let mut h = harness(50.0);
        assert!(h.form.preview().is_none());

        fill_valid(&mut h.form);
        assert_eq!(h.form.preview().map(|f| f.total), Some(50.0));

        h.form.set_field(FormField::TripDate, "not a date");
        assert!(h.form.preview().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut h = harness(1.0);
        fill_valid(&mut h.form);
        h.form.set_field(FormField::FinalTotal, "5");
        h.form.submit().unwrap();

        h.form.reset();
        assert_eq!(h.form.fields(), &TripFields::default());
        assert_eq!(h.form.total(), &TotalEntry::Calculated);
        assert!(h.form.errors().is_empty());
        assert_eq!(h.form.phase(), &SubmitPhase::Editing);
        assert_eq!(h.form.field_value(FormField::Distance), "");
    }

    #[test]
    fn field_navigation_wraps() {
        assert_eq!(FormField::FinalTotal.next(), FormField::PickupAddress);
        assert_eq!(FormField::PickupAddress.prev(), FormField::FinalTotal);
        assert_eq!(FormField::TripDate.next(), FormField::TripTime);
    }
}
