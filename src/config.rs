//! Configuration values and the datasheet tables behind them.

use crate::scaling::{calibration_value, current_lsb};

/// Shunt voltage full-scale range (`ADCRANGE`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcRange {
    /// ±81.92 mV, 2.5 µV per LSB.
    #[default]
    Range81_92mV = 0,
    /// ±20.48 mV, 625 nV per LSB.
    Range20_48mV = 1,
}

impl AdcRange {
    pub(crate) const fn from_bits(bits: u16) -> Self {
        match bits & 0b1 {
            0 => Self::Range81_92mV,
            _ => Self::Range20_48mV,
        }
    }
}

/// Number of samples averaged per reported result (`AVG`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum NumSamples {
    #[default]
    N1 = 0b000,
    N4 = 0b001,
    N16 = 0b010,
    N64 = 0b011,
    N128 = 0b100,
    N256 = 0b101,
    N512 = 0b110,
    N1024 = 0b111,
}

/// `AVG` field value to averaging count.
const SAMPLE_COUNTS: [(NumSamples, u16); 8] = [
    (NumSamples::N1, 1),
    (NumSamples::N4, 4),
    (NumSamples::N16, 16),
    (NumSamples::N64, 64),
    (NumSamples::N128, 128),
    (NumSamples::N256, 256),
    (NumSamples::N512, 512),
    (NumSamples::N1024, 1024),
];

impl NumSamples {
    /// Number of samples averaged.
    pub const fn count(self) -> u16 {
        SAMPLE_COUNTS[self as usize].1
    }

    /// Looks up the setting for an averaging count.
    ///
    /// # Errors
    /// [`ConfigError::InvalidSampleCount`] if `count` is not one the chip supports.
    pub fn try_from_count(count: u16) -> Result<Self, ConfigError> {
        SAMPLE_COUNTS
            .iter()
            .find(|(_, c)| *c == count)
            .map(|(n, _)| *n)
            .ok_or(ConfigError::InvalidSampleCount)
    }

    pub(crate) const fn from_bits(bits: u16) -> Self {
        match bits & 0b111 {
            0b000 => Self::N1,
            0b001 => Self::N4,
            0b010 => Self::N16,
            0b011 => Self::N64,
            0b100 => Self::N128,
            0b101 => Self::N256,
            0b110 => Self::N512,
            _ => Self::N1024,
        }
    }
}

/// ADC conversion time, shared by the `VBUSCT` and `VSHCT` fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConversionTime {
    T140us = 0b000,
    T204us = 0b001,
    T332us = 0b010,
    T588us = 0b011,
    #[default]
    T1100us = 0b100,
    T2116us = 0b101,
    T4156us = 0b110,
    T8244us = 0b111,
}

/// Field value to conversion time in microseconds.
const CONVERSION_TIMES_US: [(ConversionTime, u32); 8] = [
    (ConversionTime::T140us, 140),
    (ConversionTime::T204us, 204),
    (ConversionTime::T332us, 332),
    (ConversionTime::T588us, 588),
    (ConversionTime::T1100us, 1100),
    (ConversionTime::T2116us, 2116),
    (ConversionTime::T4156us, 4156),
    (ConversionTime::T8244us, 8244),
];

impl ConversionTime {
    /// Conversion time in microseconds.
    pub const fn micros(self) -> u32 {
        CONVERSION_TIMES_US[self as usize].1
    }

    /// Looks up the setting for a conversion time in microseconds.
    ///
    /// # Errors
    /// [`ConfigError::InvalidConversionTime`] if `micros` is not a supported duration.
    pub fn try_from_micros(micros: u32) -> Result<Self, ConfigError> {
        CONVERSION_TIMES_US
            .iter()
            .find(|(_, us)| *us == micros)
            .map(|(t, _)| *t)
            .ok_or(ConfigError::InvalidConversionTime)
    }

    pub(crate) const fn from_bits(bits: u16) -> Self {
        match bits & 0b111 {
            0b000 => Self::T140us,
            0b001 => Self::T204us,
            0b010 => Self::T332us,
            0b011 => Self::T588us,
            0b100 => Self::T1100us,
            0b101 => Self::T2116us,
            0b110 => Self::T4156us,
            _ => Self::T8244us,
        }
    }
}

/// Operating mode (`MODE`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    Shutdown = 0b000,
    SingleShotShunt = 0b001,
    SingleShotBus = 0b010,
    SingleShotShuntBus = 0b011,
    /// Second encoding of shutdown.
    Shutdown2 = 0b100,
    ContinuousShunt = 0b101,
    ContinuousBus = 0b110,
    #[default]
    ContinuousShuntBus = 0b111,
}

impl Mode {
    pub(crate) const fn from_bits(bits: u16) -> Self {
        match bits & 0b111 {
            0b000 => Self::Shutdown,
            0b001 => Self::SingleShotShunt,
            0b010 => Self::SingleShotBus,
            0b011 => Self::SingleShotShuntBus,
            0b100 => Self::Shutdown2,
            0b101 => Self::ContinuousShunt,
            0b110 => Self::ContinuousBus,
            _ => Self::ContinuousShuntBus,
        }
    }

    /// Whether shunt voltage is converted in this mode.
    pub const fn measures_shunt(self) -> bool {
        self as u8 & 0b001 != 0
    }

    /// Whether bus voltage is converted in this mode.
    pub const fn measures_bus(self) -> bool {
        self as u8 & 0b010 != 0
    }

    pub const fn is_shutdown(self) -> bool {
        matches!(self, Self::Shutdown | Self::Shutdown2)
    }
}

/// Condition that drives the alert pin.
///
/// Only one limit function can be monitored at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertOn {
    #[default]
    None,
    ShuntOverLimit,
    ShuntUnderLimit,
    BusOverLimit,
    BusUnderLimit,
    PowerOverLimit,
}

/// Alert pin polarity (`APOL`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertPolarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

/// Alert latch behaviour (`LEN`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertLatch {
    /// The pin and flag follow the condition.
    #[default]
    Transparent,
    /// The pin and flag hold until the Mask/Enable register is read.
    Latched,
}

/// Alert pin configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlertConfig {
    pub source: AlertOn,
    pub polarity: AlertPolarity,
    pub latch: AlertLatch,
    /// Also assert the pin when a conversion completes (`CNVR`).
    pub conversion_ready: bool,
    /// Threshold in millivolts (shunt alerts), volts (bus alerts) or watts
    /// (power alerts). Ignored for [`AlertOn::None`].
    pub limit: f32,
}

/// Rejections raised while encoding a configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Shunt resistor must be finite and greater than zero.
    InvalidShuntResistor,
    /// Maximum expected current must be finite and greater than zero.
    InvalidMaxCurrent,
    /// Calibration value is zero or does not fit in 15 bits.
    CalibrationOutOfRange,
    /// Alert threshold does not fit the signed 16-bit limit register.
    AlertLimitOutOfRange,
    InvalidSampleCount,
    InvalidConversionTime,
}

/// Device configuration.
///
/// Everything except `shunt_resistor` and `max_expected_current` is written
/// to the configuration register. Those two only feed the calibration and
/// scaling arithmetic.
///
/// ```
/// use ina236::{Config, Mode, NumSamples};
/// let config = Config {
///     num_samples: NumSamples::N64,
///     mode: Mode::ContinuousBus,
///     ..Config::new(0.01)
/// };
/// assert_eq!(config.calibration(), Ok(3355));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub adc_range: AdcRange,
    pub num_samples: NumSamples,
    pub vbus_conversion_time: ConversionTime,
    pub vshunt_conversion_time: ConversionTime,
    pub mode: Mode,
    /// Shunt resistor in ohms.
    pub shunt_resistor: f32,
    /// Largest current expected through the shunt, in amperes.
    pub max_expected_current: f32,
}

/// Maximum expected current used when none is given.
pub const DEFAULT_MAX_EXPECTED_CURRENT: f32 = 5.0;

impl Config {
    /// Power-on register defaults with the given shunt resistor (ohms).
    pub const fn new(shunt_resistor: f32) -> Self {
        Self {
            adc_range: AdcRange::Range81_92mV,
            num_samples: NumSamples::N1,
            vbus_conversion_time: ConversionTime::T1100us,
            vshunt_conversion_time: ConversionTime::T1100us,
            mode: Mode::ContinuousShuntBus,
            shunt_resistor,
            max_expected_current: DEFAULT_MAX_EXPECTED_CURRENT,
        }
    }

    /// Current LSB in amperes.
    ///
    /// # Errors
    /// [`ConfigError::InvalidMaxCurrent`] for a non-positive maximum current.
    pub fn current_lsb(&self) -> Result<f32, ConfigError> {
        current_lsb(self.max_expected_current)
    }

    /// Calibration register value for this shunt and current LSB.
    ///
    /// # Errors
    /// See [`calibration_value`].
    pub fn calibration(&self) -> Result<u16, ConfigError> {
        calibration_value(self.current_lsb()?, self.shunt_resistor)
    }

    /// Length of one full conversion cycle in microseconds, including averaging.
    pub const fn conversion_period_us(&self) -> u32 {
        let mut per_sample = 0;
        if self.mode.measures_shunt() {
            per_sample += self.vshunt_conversion_time.micros();
        }
        if self.mode.measures_bus() {
            per_sample += self.vbus_conversion_time.micros();
        }
        per_sample * self.num_samples.count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_lookup() {
        assert_eq!(NumSamples::N1.count(), 1);
        assert_eq!(NumSamples::N128.count(), 128);
        assert_eq!(NumSamples::N1024.count(), 1024);
        assert_eq!(NumSamples::try_from_count(256), Ok(NumSamples::N256));
        assert_eq!(
            NumSamples::try_from_count(32),
            Err(ConfigError::InvalidSampleCount)
        );
    }

    #[test]
    fn conversion_time_lookup() {
        assert_eq!(ConversionTime::T140us.micros(), 140);
        assert_eq!(ConversionTime::T8244us.micros(), 8244);
        assert_eq!(
            ConversionTime::try_from_micros(2116),
            Ok(ConversionTime::T2116us)
        );
        assert_eq!(
            ConversionTime::try_from_micros(1000),
            Err(ConfigError::InvalidConversionTime)
        );
    }

    #[test]
    fn mode_channels() {
        assert!(Mode::ContinuousShuntBus.measures_shunt());
        assert!(Mode::ContinuousShuntBus.measures_bus());
        assert!(Mode::SingleShotShunt.measures_shunt());
        assert!(!Mode::SingleShotShunt.measures_bus());
        assert!(!Mode::Shutdown2.measures_shunt());
        assert!(!Mode::Shutdown2.measures_bus());
        assert!(Mode::Shutdown2.is_shutdown());
    }

    #[test]
    fn conversion_period() {
        let config = Config {
            num_samples: NumSamples::N4,
            vbus_conversion_time: ConversionTime::T588us,
            vshunt_conversion_time: ConversionTime::T140us,
            ..Config::new(0.01)
        };
        assert_eq!(config.conversion_period_us(), (588 + 140) * 4);

        let bus_only = Config {
            mode: Mode::ContinuousBus,
            ..config
        };
        assert_eq!(bus_only.conversion_period_us(), 588 * 4);

        let off = Config {
            mode: Mode::Shutdown,
            ..config
        };
        assert_eq!(off.conversion_period_us(), 0);
    }

    #[test]
    fn default_calibration() {
        let config = Config::new(0.01);
        assert_eq!(config.calibration(), Ok(3355));
    }
}
