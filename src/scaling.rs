//! Conversions between raw register codes and physical units.

use crate::config::{AdcRange, AlertOn, ConfigError};

/// Bus voltage LSB in volts.
pub const BUS_VOLTAGE_LSB: f32 = 0.0016;
/// Shunt voltage LSB in millivolts for the 81.92 mV range.
pub const SHUNT_VOLTAGE_LSB_81_92MV: f32 = 0.0025;
/// Shunt voltage LSB in millivolts for the 20.48 mV range.
pub const SHUNT_VOLTAGE_LSB_20_48MV: f32 = 0.000625;
/// Power LSB as a multiple of the current LSB.
pub const POWER_LSB_FACTOR: f32 = 32.0;
/// Internal fixed scaling of the calibration equation.
pub const CALIBRATION_SCALE: f32 = 0.00512;

const CURRENT_LSB_DIVISOR: f32 = (1u32 << 15) as f32;
const CALIBRATION_LIMIT: f32 = (1u32 << 15) as f32;

/// Smallest current LSB able to represent `max_expected_current` amperes.
///
/// # Errors
/// [`ConfigError::InvalidMaxCurrent`] unless the current is finite and positive.
pub fn current_lsb(max_expected_current: f32) -> Result<f32, ConfigError> {
    if !(max_expected_current.is_finite() && max_expected_current > 0.0) {
        return Err(ConfigError::InvalidMaxCurrent);
    }
    Ok(max_expected_current / CURRENT_LSB_DIVISOR)
}

/// Calibration register value, `0.00512 / (current_lsb * shunt_resistor)` truncated.
///
/// # Errors
/// [`ConfigError::InvalidShuntResistor`] for a non-positive shunt, and
/// [`ConfigError::CalibrationOutOfRange`] when the result is zero or needs
/// more than 15 bits.
pub fn calibration_value(current_lsb: f32, shunt_resistor: f32) -> Result<u16, ConfigError> {
    if !(shunt_resistor.is_finite() && shunt_resistor > 0.0) {
        return Err(ConfigError::InvalidShuntResistor);
    }
    let cal = CALIBRATION_SCALE / (current_lsb * shunt_resistor);
    if !(cal >= 1.0 && cal < CALIBRATION_LIMIT) {
        return Err(ConfigError::CalibrationOutOfRange);
    }
    Ok(cal as u16)
}

/// Shunt voltage LSB in millivolts for `range`.
pub const fn shunt_voltage_lsb(range: AdcRange) -> f32 {
    match range {
        AdcRange::Range81_92mV => SHUNT_VOLTAGE_LSB_81_92MV,
        AdcRange::Range20_48mV => SHUNT_VOLTAGE_LSB_20_48MV,
    }
}

/// Power LSB in watts.
pub fn power_lsb(current_lsb: f32) -> f32 {
    current_lsb * POWER_LSB_FACTOR
}

/// Shunt voltage in millivolts.
pub fn shunt_voltage_mv(raw: i16, range: AdcRange) -> f32 {
    f32::from(raw) * shunt_voltage_lsb(range)
}

/// Bus voltage in volts.
pub fn bus_voltage_v(raw: u16) -> f32 {
    f32::from(raw) * BUS_VOLTAGE_LSB
}

/// Current in amperes. Only meaningful once the calibration register is set.
pub fn current_a(raw: i16, current_lsb: f32) -> f32 {
    f32::from(raw) * current_lsb
}

/// Power in watts.
pub fn power_w(raw: u16, current_lsb: f32) -> f32 {
    f32::from(raw) * power_lsb(current_lsb)
}

/// Unit of the alert limit register for `source`: millivolts for shunt
/// alerts, volts for bus alerts, watts for power alerts.
pub fn alert_limit_lsb(source: AlertOn, range: AdcRange, current_lsb: f32) -> Option<f32> {
    match source {
        AlertOn::None => None,
        AlertOn::ShuntOverLimit | AlertOn::ShuntUnderLimit => Some(shunt_voltage_lsb(range)),
        AlertOn::BusOverLimit | AlertOn::BusUnderLimit => Some(BUS_VOLTAGE_LSB),
        AlertOn::PowerOverLimit => Some(power_lsb(current_lsb)),
    }
}

/// Converts a physical alert threshold to the alert limit register code.
///
/// # Errors
/// [`ConfigError::AlertLimitOutOfRange`] if the code does not fit in an `i16`.
pub fn encode_alert_limit(
    limit: f32,
    source: AlertOn,
    range: AdcRange,
    current_lsb: f32,
) -> Result<i16, ConfigError> {
    let Some(lsb) = alert_limit_lsb(source, range, current_lsb) else {
        return Ok(0);
    };
    let code = limit / lsb;
    if !(code >= f32::from(i16::MIN) && code <= f32::from(i16::MAX)) {
        return Err(ConfigError::AlertLimitOutOfRange);
    }
    Ok(code as i16)
}

/// Converts an alert limit register code back to a physical threshold.
pub fn decode_alert_limit(code: i16, source: AlertOn, range: AdcRange, current_lsb: f32) -> f32 {
    alert_limit_lsb(source, range, current_lsb).map_or(0.0, |lsb| f32::from(code) * lsb)
}
