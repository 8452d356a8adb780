//! Access to the sensor/platform data service.
//!
//! Auto-captured variables read their value through [`DataService`] when a
//! cycle phase is submitted, and a few kinds write their value back after
//! the record is finalized. The service is best-effort: every read is
//! bounded by a timeout and a missing answer is reported as "unavailable"
//! rather than as an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Quantities the data service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    BodyMass,
    Height,
    HeartRate,
    BodyMassIndex,
    StepCount,
    ActiveEnergyBurned,
    ExerciseTime,
    DietaryEnergy,
    DietaryCarbohydrates,
    DietaryCaffeine,
    AmbientTemperature,
    RelativeHumidity,
}

impl QuantityKind {
    pub const ALL: [QuantityKind; 12] = [
        QuantityKind::BodyMass,
        QuantityKind::Height,
        QuantityKind::HeartRate,
        QuantityKind::BodyMassIndex,
        QuantityKind::StepCount,
        QuantityKind::ActiveEnergyBurned,
        QuantityKind::ExerciseTime,
        QuantityKind::DietaryEnergy,
        QuantityKind::DietaryCarbohydrates,
        QuantityKind::DietaryCaffeine,
        QuantityKind::AmbientTemperature,
        QuantityKind::RelativeHumidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityKind::BodyMass => "body_mass",
            QuantityKind::Height => "height",
            QuantityKind::HeartRate => "heart_rate",
            QuantityKind::BodyMassIndex => "body_mass_index",
            QuantityKind::StepCount => "step_count",
            QuantityKind::ActiveEnergyBurned => "active_energy_burned",
            QuantityKind::ExerciseTime => "exercise_time",
            QuantityKind::DietaryEnergy => "dietary_energy",
            QuantityKind::DietaryCarbohydrates => "dietary_carbohydrates",
            QuantityKind::DietaryCaffeine => "dietary_caffeine",
            QuantityKind::AmbientTemperature => "ambient_temperature",
            QuantityKind::RelativeHumidity => "relative_humidity",
        }
    }

    pub fn parse(s: &str) -> Option<QuantityKind> {
        Self::ALL.into_iter().find(|q| q.as_str() == s.trim())
    }
}

/// Units values are requested and written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Pound,
    Kilogram,
    Inch,
    Centimeter,
    BeatsPerMinute,
    Count,
    Kilocalorie,
    Kilojoule,
    Minute,
    Gram,
    Milligram,
    Fahrenheit,
    Celsius,
    Percent,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Pound => "lb",
            Unit::Kilogram => "kg",
            Unit::Inch => "in",
            Unit::Centimeter => "cm",
            Unit::BeatsPerMinute => "bpm",
            Unit::Count => "count",
            Unit::Kilocalorie => "kcal",
            Unit::Kilojoule => "kJ",
            Unit::Minute => "min",
            Unit::Gram => "g",
            Unit::Milligram => "mg",
            Unit::Fahrenheit => "degF",
            Unit::Celsius => "degC",
            Unit::Percent => "%",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Unit> {
        let all = [
            Unit::Pound,
            Unit::Kilogram,
            Unit::Inch,
            Unit::Centimeter,
            Unit::BeatsPerMinute,
            Unit::Count,
            Unit::Kilocalorie,
            Unit::Kilojoule,
            Unit::Minute,
            Unit::Gram,
            Unit::Milligram,
            Unit::Fahrenheit,
            Unit::Celsius,
            Unit::Percent,
        ];
        all.into_iter().find(|u| u.symbol() == symbol)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DataServiceError {
    #[error("data service refused write of {quantity:?}: {message}")]
    WriteRefused { quantity: QuantityKind, message: String },

    #[error("data service unavailable")]
    Unavailable,
}

/// Read/write capability of the platform data service.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Latest known value of `quantity` in `unit`, if there is one.
    async fn fetch_latest_value(&self, quantity: QuantityKind, unit: Unit) -> Option<f64>;

    async fn write_value(
        &self,
        quantity: QuantityKind,
        value: f64,
        unit: Unit,
    ) -> Result<(), DataServiceError>;
}

/// Fetch with a bounded wait. Timeouts degrade to `None`.
pub async fn fetch_with_timeout(
    service: &dyn DataService,
    quantity: QuantityKind,
    unit: Unit,
    timeout: Duration,
) -> Option<f64> {
    match tokio::time::timeout(timeout, service.fetch_latest_value(quantity, unit)).await {
        Ok(Some(v)) if v.is_finite() => Some(v),
        Ok(_) => None,
        Err(_) => {
            tracing::warn!(quantity = quantity.as_str(), "auto-capture timed out after {:?}", timeout);
            None
        }
    }
}

/// Data service that never has a value and refuses every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDataService;

#[async_trait]
impl DataService for NoDataService {
    async fn fetch_latest_value(&self, _quantity: QuantityKind, _unit: Unit) -> Option<f64> {
        None
    }

    async fn write_value(
        &self,
        _quantity: QuantityKind,
        _value: f64,
        _unit: Unit,
    ) -> Result<(), DataServiceError> {
        Err(DataServiceError::Unavailable)
    }
}

/// Data service backed by a fixed table of readings.
///
/// Readings are returned regardless of the requested unit. Writes are kept
/// so callers can inspect them.
#[derive(Debug, Default)]
pub struct StaticDataService {
    readings: HashMap<QuantityKind, f64>,
    writes: Mutex<Vec<(QuantityKind, f64, Unit)>>,
}

impl StaticDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reading(mut self, quantity: QuantityKind, value: f64) -> Self {
        self.readings.insert(quantity, value);
        self
    }

    pub fn set_reading(&mut self, quantity: QuantityKind, value: f64) {
        self.readings.insert(quantity, value);
    }

    pub fn writes(&self) -> Vec<(QuantityKind, f64, Unit)> {
        self.writes
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataService for StaticDataService {
    async fn fetch_latest_value(&self, quantity: QuantityKind, _unit: Unit) -> Option<f64> {
        self.readings.get(&quantity).copied()
    }

    async fn write_value(
        &self,
        quantity: QuantityKind,
        value: f64,
        unit: Unit,
    ) -> Result<(), DataServiceError> {
        let mut writes = self.writes.lock().map_err(|_| DataServiceError::Unavailable)?;
        writes.push((quantity, value, unit));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowService;

    #[async_trait]
    impl DataService for SlowService {
        async fn fetch_latest_value(&self, _q: QuantityKind, _u: Unit) -> Option<f64> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Some(1.0)
        }

        async fn write_value(&self, _q: QuantityKind, _v: f64, _u: Unit) -> Result<(), DataServiceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn timeout_degrades_to_unavailable() {
        let value = fetch_with_timeout(
            &SlowService,
            QuantityKind::StepCount,
            Unit::Count,
            Duration::from_millis(20),
        )
        .await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn static_service_returns_readings() {
        let service = StaticDataService::new().with_reading(QuantityKind::BodyMass, 180.0);
        let value = fetch_with_timeout(
            &service,
            QuantityKind::BodyMass,
            Unit::Pound,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(value, Some(180.0));
        assert!(service
            .fetch_latest_value(QuantityKind::Height, Unit::Inch)
            .await
            .is_none());
    }

    #[test]
    fn unit_symbols_round_trip() {
        assert_eq!(Unit::from_symbol("kg"), Some(Unit::Kilogram));
        assert_eq!(Unit::from_symbol("degC"), Some(Unit::Celsius));
        assert_eq!(Unit::from_symbol("furlong"), None);
    }
}
