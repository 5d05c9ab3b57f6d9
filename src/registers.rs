#![allow(clippy::upper_case_acronyms)]

//! Register map and the bit layouts of the INA236.

use crate::config::{
    AdcRange, AlertConfig, AlertLatch, AlertOn, AlertPolarity, ConfigError, ConversionTime, Mode,
    NumSamples,
};

/// Represents the register addresses in the INA236. All registers are 16 bits wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub(crate) enum Register {
    /// Configuration Register
    Configuration = 0x00,
    /// Shunt Voltage (signed)
    ShuntVoltage = 0x01,
    /// Bus Voltage (15 bits)
    BusVoltage = 0x02,
    /// Power (unsigned)
    Power = 0x03,
    /// Current (signed)
    Current = 0x04,
    /// Calibration (15 bits)
    Calibration = 0x05,
    /// Alert enables and status flags
    MaskEnable = 0x06,
    /// Alert Limit (signed)
    AlertLimit = 0x07,
    /// Manufacturer ID (read-only)
    ManufacturerId = 0x3E,
    /// Die ID and revision (read-only)
    DeviceId = 0x3F,
}

/// Trait for register bit manipulation.
pub(crate) trait RegisterBit {
    fn mask(&self) -> u16;
}

/// A multi-bit field of a register.
#[derive(Clone, Copy)]
pub(crate) struct Field {
    shift: u8,
    width: u8,
}

impl Field {
    const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    pub(crate) const fn mask(self) -> u16 {
        (((1u32 << self.width) - 1) as u16) << self.shift
    }

    pub(crate) const fn get(self, word: u16) -> u16 {
        (word & self.mask()) >> self.shift
    }

    /// Replaces the field in `word`, leaving every other bit untouched.
    pub(crate) const fn set(self, word: u16, value: u16) -> u16 {
        (word & !self.mask()) | ((value << self.shift) & self.mask())
    }
}

/// Field layout of the `Configuration` register.
pub(crate) mod configuration {
    use super::Field;

    pub(crate) const MODE: Field = Field::new(0, 3);
    pub(crate) const VSHCT: Field = Field::new(3, 3);
    pub(crate) const VBUSCT: Field = Field::new(6, 3);
    pub(crate) const AVG: Field = Field::new(9, 3);
    pub(crate) const ADCRANGE: Field = Field::new(12, 1);
    /// Writing 1 resets every register to its power-on value.
    pub(crate) const RST: Field = Field::new(15, 1);
}

/// Usable bits of the `BusVoltage` register.
pub(crate) const BUS_VOLTAGE: Field = Field::new(0, 15);
/// Usable bits of the `Calibration` register.
pub(crate) const SHUNT_CAL: Field = Field::new(0, 15);
/// Die ID bits of the `DeviceId` register.
pub(crate) const DIE_ID: Field = Field::new(4, 12);
/// Revision bits of the `DeviceId` register.
pub(crate) const REV_ID: Field = Field::new(0, 4);

/// Bit definitions for the `MaskEnable` register.
#[derive(Clone, Copy)]
#[repr(u8)]
pub(crate) enum MaskEnable {
    /// Alert latch enable.
    LEN = 0,
    /// Alert polarity, 1 = active high.
    APOL,
    /// Math overflow (Read-Only).
    OVF,
    /// Conversion ready flag (Read-Only).
    CVRF,
    /// Alert function flag (Read-Only).
    AFF,
    /// Memory checksum error (Read-Only).
    MemError,
    /// Assert alert on conversion ready.
    CNVR = 10,
    /// Power over limit.
    POL,
    /// Bus voltage under limit.
    BUL,
    /// Bus voltage over limit.
    BOL,
    /// Shunt voltage under limit.
    SUL,
    /// Shunt voltage over limit.
    SOL,
}

impl RegisterBit for MaskEnable {
    fn mask(&self) -> u16 {
        1 << *self as u8
    }
}

/// Configuration register fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigWord {
    pub adc_range: AdcRange,
    pub num_samples: NumSamples,
    pub vbus_conversion_time: ConversionTime,
    pub vshunt_conversion_time: ConversionTime,
    pub mode: Mode,
}

impl ConfigWord {
    /// Packs the fields. Reserved bits and the reset bit are zero.
    pub const fn encode(&self) -> u16 {
        use configuration::*;
        let mut word = 0;
        word = MODE.set(word, self.mode as u16);
        word = VSHCT.set(word, self.vshunt_conversion_time as u16);
        word = VBUSCT.set(word, self.vbus_conversion_time as u16);
        word = AVG.set(word, self.num_samples as u16);
        ADCRANGE.set(word, self.adc_range as u16)
    }

    /// Unpacks the fields, ignoring reserved and reset bits.
    pub const fn decode(word: u16) -> Self {
        use configuration::*;
        Self {
            adc_range: AdcRange::from_bits(ADCRANGE.get(word)),
            num_samples: NumSamples::from_bits(AVG.get(word)),
            vbus_conversion_time: ConversionTime::from_bits(VBUSCT.get(word)),
            vshunt_conversion_time: ConversionTime::from_bits(VSHCT.get(word)),
            mode: Mode::from_bits(MODE.get(word)),
        }
    }
}

/// Configuration register word that only sets the reset bit.
pub(crate) const RESET_WORD: u16 = configuration::RST.mask();

pub(crate) fn with_adc_range(word: u16, range: AdcRange) -> u16 {
    configuration::ADCRANGE.set(word, range as u16)
}

pub(crate) fn with_num_samples(word: u16, samples: NumSamples) -> u16 {
    configuration::AVG.set(word, samples as u16)
}

pub(crate) fn with_vbus_conversion_time(word: u16, time: ConversionTime) -> u16 {
    configuration::VBUSCT.set(word, time as u16)
}

pub(crate) fn with_vshunt_conversion_time(word: u16, time: ConversionTime) -> u16 {
    configuration::VSHCT.set(word, time as u16)
}

pub(crate) fn with_mode(word: u16, mode: Mode) -> u16 {
    configuration::MODE.set(word, mode as u16)
}

/// Encodes a calibration value.
///
/// # Errors
/// [`ConfigError::CalibrationOutOfRange`] if `value` needs more than 15 bits.
pub fn encode_calibration(value: u16) -> Result<u16, ConfigError> {
    encode_unsigned_masked(value, SHUNT_CAL.width).ok_or(ConfigError::CalibrationOutOfRange)
}

pub fn decode_calibration(word: u16) -> u16 {
    SHUNT_CAL.get(word)
}

/// Two's-complement view of a signed register (shunt voltage, current, alert limit).
pub const fn encode_signed(value: i16) -> u16 {
    value as u16
}

pub const fn decode_signed(word: u16) -> i16 {
    word as i16
}

/// Encodes `value` into the low `width` bits. Returns `None` if it would
/// spill into the reserved bits above them.
pub fn encode_unsigned_masked(value: u16, width: u8) -> Option<u16> {
    let field = Field::new(0, width);
    (value & !field.mask() == 0).then_some(value)
}

/// Bus voltage raw code, with the reserved top bit dropped.
pub const fn decode_bus_voltage(word: u16) -> u16 {
    BUS_VOLTAGE.get(word)
}

/// Every bit of the Mask/Enable register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MaskEnableFlags {
    pub latch_enable: bool,
    pub alert_active_high: bool,
    pub math_overflow: bool,
    pub conversion_ready: bool,
    pub alert_function: bool,
    pub memory_error: bool,
    pub conversion_ready_alert: bool,
    pub power_over_limit: bool,
    pub bus_under_limit: bool,
    pub bus_over_limit: bool,
    pub shunt_under_limit: bool,
    pub shunt_over_limit: bool,
}

impl MaskEnableFlags {
    pub fn decode(word: u16) -> Self {
        let bit = |b: MaskEnable| word & b.mask() != 0;
        Self {
            latch_enable: bit(MaskEnable::LEN),
            alert_active_high: bit(MaskEnable::APOL),
            math_overflow: bit(MaskEnable::OVF),
            conversion_ready: bit(MaskEnable::CVRF),
            alert_function: bit(MaskEnable::AFF),
            memory_error: bit(MaskEnable::MemError),
            conversion_ready_alert: bit(MaskEnable::CNVR),
            power_over_limit: bit(MaskEnable::POL),
            bus_under_limit: bit(MaskEnable::BUL),
            bus_over_limit: bit(MaskEnable::BOL),
            shunt_under_limit: bit(MaskEnable::SUL),
            shunt_over_limit: bit(MaskEnable::SOL),
        }
    }

    /// Which limit function, if any, is enabled. The highest enabled bit wins,
    /// matching the chip's own priority.
    pub fn alert_on(&self) -> AlertOn {
        if self.shunt_over_limit {
            AlertOn::ShuntOverLimit
        } else if self.shunt_under_limit {
            AlertOn::ShuntUnderLimit
        } else if self.bus_over_limit {
            AlertOn::BusOverLimit
        } else if self.bus_under_limit {
            AlertOn::BusUnderLimit
        } else if self.power_over_limit {
            AlertOn::PowerOverLimit
        } else {
            AlertOn::None
        }
    }

    pub fn alert_source(&self) -> AlertSource {
        if self.alert_function {
            AlertSource::LimitReached
        } else {
            AlertSource::DataReady
        }
    }

    pub fn errors(&self) -> DeviceErrors {
        match (self.memory_error, self.math_overflow) {
            (false, false) => DeviceErrors::None,
            (true, false) => DeviceErrors::Memory,
            (false, true) => DeviceErrors::MathOverflow,
            (true, true) => DeviceErrors::Both,
        }
    }
}

/// Encodes the writable half of the Mask/Enable register.
pub fn encode_mask_enable(alert: &AlertConfig) -> u16 {
    let mut word = match alert.source {
        AlertOn::None => 0,
        AlertOn::ShuntOverLimit => MaskEnable::SOL.mask(),
        AlertOn::ShuntUnderLimit => MaskEnable::SUL.mask(),
        AlertOn::BusOverLimit => MaskEnable::BOL.mask(),
        AlertOn::BusUnderLimit => MaskEnable::BUL.mask(),
        AlertOn::PowerOverLimit => MaskEnable::POL.mask(),
    };
    if alert.conversion_ready {
        word |= MaskEnable::CNVR.mask();
    }
    if alert.polarity == AlertPolarity::ActiveHigh {
        word |= MaskEnable::APOL.mask();
    }
    if alert.latch == AlertLatch::Latched {
        word |= MaskEnable::LEN.mask();
    }
    word
}

/// What the alert pin is reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertSource {
    DataReady,
    LimitReached,
}

/// Errors flagged by the chip in the Mask/Enable register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceErrors {
    None,
    /// Trim memory checksum failed.
    Memory,
    /// Current or power arithmetic overflowed.
    MathOverflow,
    Both,
}

/// Contents of the Device ID register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId {
    pub die_id: u16,
    pub revision: u8,
}

impl DeviceId {
    pub const fn decode(word: u16) -> Self {
        Self {
            die_id: DIE_ID.get(word),
            revision: REV_ID.get(word) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGES: [AdcRange; 2] = [AdcRange::Range81_92mV, AdcRange::Range20_48mV];
    const SAMPLES: [NumSamples; 8] = [
        NumSamples::N1,
        NumSamples::N4,
        NumSamples::N16,
        NumSamples::N64,
        NumSamples::N128,
        NumSamples::N256,
        NumSamples::N512,
        NumSamples::N1024,
    ];
    const TIMES: [ConversionTime; 8] = [
        ConversionTime::T140us,
        ConversionTime::T204us,
        ConversionTime::T332us,
        ConversionTime::T588us,
        ConversionTime::T1100us,
        ConversionTime::T2116us,
        ConversionTime::T4156us,
        ConversionTime::T8244us,
    ];
    const MODES: [Mode; 8] = [
        Mode::Shutdown,
        Mode::SingleShotShunt,
        Mode::SingleShotBus,
        Mode::SingleShotShuntBus,
        Mode::Shutdown2,
        Mode::ContinuousShunt,
        Mode::ContinuousBus,
        Mode::ContinuousShuntBus,
    ];

    fn base() -> ConfigWord {
        ConfigWord::decode(0)
    }

    #[test]
    fn config_word_layout() {
        // Power-on defaults without the reserved bit.
        let word = ConfigWord {
            adc_range: AdcRange::Range81_92mV,
            num_samples: NumSamples::N1,
            vbus_conversion_time: ConversionTime::T1100us,
            vshunt_conversion_time: ConversionTime::T1100us,
            mode: Mode::ContinuousShuntBus,
        };
        assert_eq!(word.encode(), 0x0127);

        let word = ConfigWord {
            adc_range: AdcRange::Range20_48mV,
            num_samples: NumSamples::N1024,
            vbus_conversion_time: ConversionTime::T140us,
            vshunt_conversion_time: ConversionTime::T8244us,
            mode: Mode::Shutdown,
        };
        assert_eq!(word.encode(), 0b0001_1110_0011_1000);
    }

    #[test]
    fn config_fields_round_trip() {
        for adc_range in RANGES {
            let w = ConfigWord { adc_range, ..base() };
            assert_eq!(ConfigWord::decode(w.encode()), w);
        }
        for num_samples in SAMPLES {
            let w = ConfigWord {
                num_samples,
                ..base()
            };
            assert_eq!(ConfigWord::decode(w.encode()), w);
        }
        for t in TIMES {
            let w = ConfigWord {
                vbus_conversion_time: t,
                vshunt_conversion_time: t,
                ..base()
            };
            assert_eq!(ConfigWord::decode(w.encode()), w);
        }
        for mode in MODES {
            let w = ConfigWord { mode, ..base() };
            assert_eq!(ConfigWord::decode(w.encode()), w);
        }
    }

    #[test]
    fn decode_ignores_reserved_and_reset_bits() {
        assert_eq!(ConfigWord::decode(0xE127), ConfigWord::decode(0x0127));
    }

    #[test]
    fn field_update_preserves_other_bits() {
        let base = 0b1110_1010_1010_1010;
        assert_eq!(with_mode(base, Mode::ContinuousShuntBus), 0b1110_1010_1010_1111);
        assert_eq!(
            with_vshunt_conversion_time(base, ConversionTime::T140us),
            0b1110_1010_1000_0010
        );
        assert_eq!(
            with_vbus_conversion_time(base, ConversionTime::T8244us),
            0b1110_1011_1110_1010
        );
        assert_eq!(
            with_num_samples(base, NumSamples::N1),
            0b1110_0000_1010_1010
        );
        assert_eq!(
            with_adc_range(base, AdcRange::Range81_92mV),
            0b1110_1010_1010_1010
        );
        assert_eq!(
            with_adc_range(base, AdcRange::Range20_48mV),
            0b1111_1010_1010_1010
        );
        for mode in MODES {
            let word = with_mode(base, mode);
            assert_eq!(word & !configuration::MODE.mask(), base & !configuration::MODE.mask());
            assert_eq!(ConfigWord::decode(word).mode, mode);
        }
    }

    #[test]
    fn reset_word() {
        assert_eq!(RESET_WORD, 0x8000);
    }

    #[test]
    fn calibration_codec() {
        assert_eq!(encode_calibration(3355), Ok(3355));
        assert_eq!(encode_calibration(0x7FFF), Ok(0x7FFF));
        assert_eq!(
            encode_calibration(0x8000),
            Err(ConfigError::CalibrationOutOfRange)
        );
        assert_eq!(decode_calibration(0x8D1B), 0x0D1B);
    }

    #[test]
    fn signed_codec() {
        assert_eq!(encode_signed(-1), 0xFFFF);
        assert_eq!(encode_signed(i16::MIN), 0x8000);
        assert_eq!(decode_signed(0xFC18), -1000);
        assert_eq!(decode_signed(0x7FFF), i16::MAX);
    }

    #[test]
    fn unsigned_masked() {
        assert_eq!(encode_unsigned_masked(0x7FFF, 15), Some(0x7FFF));
        assert_eq!(encode_unsigned_masked(0x8000, 15), None);
        assert_eq!(decode_bus_voltage(0x9D4C), 0x1D4C);
    }

    #[test]
    fn mask_enable_bit_positions() {
        let flags = MaskEnableFlags::decode(0b1000_0000_0000_0000);
        assert!(flags.shunt_over_limit);
        assert_eq!(flags.alert_on(), AlertOn::ShuntOverLimit);

        let flags = MaskEnableFlags::decode(1 << 14 | 1 << 5 | 1 << 2);
        assert!(flags.shunt_under_limit);
        assert!(flags.memory_error);
        assert!(flags.math_overflow);
        assert!(!flags.conversion_ready);

        let flags = MaskEnableFlags::decode(1 << 13 | 1 << 10 | 1 << 3);
        assert!(flags.bus_over_limit);
        assert!(flags.conversion_ready_alert);
        assert!(flags.conversion_ready);

        let flags = MaskEnableFlags::decode(1 << 12 | 1 << 4 | 1 << 1 | 1);
        assert!(flags.bus_under_limit);
        assert!(flags.alert_function);
        assert!(flags.alert_active_high);
        assert!(flags.latch_enable);

        assert_eq!(
            MaskEnableFlags::decode(1 << 11).alert_on(),
            AlertOn::PowerOverLimit
        );
        // Reserved bits 6..=9 decode to nothing.
        assert_eq!(MaskEnableFlags::decode(0b11_1100_0000), MaskEnableFlags::default());
    }

    #[test]
    fn error_classification() {
        assert_eq!(MaskEnableFlags::decode(0).errors(), DeviceErrors::None);
        assert_eq!(MaskEnableFlags::decode(1 << 5).errors(), DeviceErrors::Memory);
        assert_eq!(
            MaskEnableFlags::decode(1 << 2).errors(),
            DeviceErrors::MathOverflow
        );
        assert_eq!(
            MaskEnableFlags::decode(1 << 5 | 1 << 2).errors(),
            DeviceErrors::Both
        );
    }

    #[test]
    fn alert_source_classification() {
        assert_eq!(
            MaskEnableFlags::decode(1 << 4).alert_source(),
            AlertSource::LimitReached
        );
        assert_eq!(
            MaskEnableFlags::decode(1 << 3).alert_source(),
            AlertSource::DataReady
        );
    }

    #[test]
    fn mask_enable_encoding() {
        let alert = AlertConfig {
            source: AlertOn::BusUnderLimit,
            polarity: AlertPolarity::ActiveHigh,
            latch: AlertLatch::Latched,
            conversion_ready: true,
            limit: 0.0,
        };
        assert_eq!(encode_mask_enable(&alert), 1 << 12 | 1 << 10 | 1 << 1 | 1);
        assert_eq!(encode_mask_enable(&AlertConfig::default()), 0);

        let decoded = MaskEnableFlags::decode(encode_mask_enable(&alert));
        assert_eq!(decoded.alert_on(), AlertOn::BusUnderLimit);
    }

    #[test]
    fn device_id() {
        assert_eq!(
            DeviceId::decode(0xA081),
            DeviceId {
                die_id: 0xA08,
                revision: 1
            }
        );
    }
}
