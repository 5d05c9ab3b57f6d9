//! # Texas Instruments INA236 Driver
//!
//! Blocking `embedded-hal` driver for the INA236 current, voltage and power
//! monitor. [`Ina236::try_new`] programs the configuration and calibration
//! registers; [`Ina236::read_all`] refreshes a cached [`Measurements`]
//! snapshot that the plain getters return without touching the bus.

#![cfg_attr(not(test), no_std)]

use crate::registers::*;
use crate::scaling::*;
use byteorder::{BigEndian, ByteOrder};
use core::result::Result;
use embedded_hal::i2c;

mod config;
mod registers;
pub mod scaling;

pub use crate::config::{
    AdcRange, AlertConfig, AlertLatch, AlertOn, AlertPolarity, Config, ConfigError,
    ConversionTime, Mode, NumSamples, DEFAULT_MAX_EXPECTED_CURRENT,
};
pub use crate::registers::{
    decode_bus_voltage, decode_calibration, decode_signed, encode_calibration, encode_mask_enable,
    encode_signed, encode_unsigned_masked, AlertSource, ConfigWord, DeviceErrors, DeviceId,
    MaskEnableFlags,
};

/// Default I2C device address (A1 and A0 tied to GND on the INA236A).
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x40;

/// Manufacturer ID reported by Texas Instruments parts ("TI").
pub const TI_MANUFACTURER_ID: u16 = 0x5449;

/// Errors that can occur when using the INA236 driver.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<I2cErr> {
    /// A bus transaction did not complete.
    I2c(I2cErr),
    /// A value could not be encoded into its register.
    InvalidConfig(ConfigError),
}

impl<I2cErr> From<ConfigError> for Error<I2cErr> {
    fn from(err: ConfigError) -> Self {
        Error::InvalidConfig(err)
    }
}

/// Physical values from the most recent [`Ina236::read_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    /// Millivolts.
    pub shunt_voltage: f32,
    /// Volts.
    pub bus_voltage: f32,
    /// Amperes.
    pub current: f32,
    /// Watts.
    pub power: f32,
}

/// INA236 driver.
///
/// Owns the bus handle along with cached copies of the configuration,
/// calibration, alert setup and last measurements. Cached values only change
/// when a bus operation succeeds.
pub struct Ina236<I2C> {
    i2c: I2C,
    address: u8,
    config: Config,
    current_lsb: f32,
    calibration: u16,
    alert: Option<AlertConfig>,
    measurements: Measurements,
}

impl<I2C, I2cErr> Ina236<I2C>
where
    I2C: i2c::I2c<Error = I2cErr>,
{
    /// Creates a new INA236 driver instance and programs the device.
    ///
    /// # Arguments
    /// i2c: The I2C bus.
    /// address: The device address, see [`DEFAULT_DEVICE_ADDRESS`].
    /// config: ADC settings, shunt resistor and maximum expected current.
    ///
    /// The configuration is validated before any bus traffic. The
    /// configuration register is written first, then the calibration register.
    pub fn try_new(i2c: I2C, address: u8, config: Config) -> Result<Self, Error<I2cErr>> {
        let current_lsb = config.current_lsb()?;
        let calibration =
            encode_calibration(calibration_value(current_lsb, config.shunt_resistor)?)?;

        let mut ina = Self {
            i2c,
            address,
            config,
            current_lsb,
            calibration,
            alert: None,
            measurements: Measurements::default(),
        };

        let word = ConfigWord {
            adc_range: config.adc_range,
            num_samples: config.num_samples,
            vbus_conversion_time: config.vbus_conversion_time,
            vshunt_conversion_time: config.vshunt_conversion_time,
            mode: config.mode,
        };
        ina.write_register(Register::Configuration, word.encode())?;
        ina.write_register(Register::Calibration, calibration)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ina236 {=u8:#x}: configured, calibration {=u16}",
            address,
            calibration
        );

        Ok(ina)
    }

    /// Configures the alert pin and writes its limit.
    ///
    /// The limit is converted with the LSB of the monitored quantity, see
    /// [`AlertConfig::limit`].
    pub fn init_alert(&mut self, alert: AlertConfig) -> Result<(), Error<I2cErr>> {
        let limit = encode_alert_limit(
            alert.limit,
            alert.source,
            self.config.adc_range,
            self.current_lsb,
        )?;
        self.write_register(Register::MaskEnable, encode_mask_enable(&alert))?;
        self.write_register(Register::AlertLimit, encode_signed(limit))?;
        self.alert = Some(alert);
        Ok(())
    }

    /// Reads the alert limit register back as a physical threshold.
    ///
    /// Uses the source set by [`Ina236::init_alert`]; without one the limit
    /// has no unit and `0.0` is returned.
    pub fn read_alert_limit(&mut self) -> Result<f32, Error<I2cErr>> {
        let code = decode_signed(self.read_register(Register::AlertLimit)?);
        let source = self.alert.map_or(AlertOn::None, |a| a.source);
        Ok(decode_alert_limit(
            code,
            source,
            self.config.adc_range,
            self.current_lsb,
        ))
    }

    pub fn set_adc_range(&mut self, adc_range: AdcRange) -> Result<(), Error<I2cErr>> {
        self.modify_config(|word| with_adc_range(word, adc_range))
    }

    pub fn set_num_samples(&mut self, num_samples: NumSamples) -> Result<(), Error<I2cErr>> {
        self.modify_config(|word| with_num_samples(word, num_samples))
    }

    pub fn set_vbus_conversion_time(
        &mut self,
        conversion_time: ConversionTime,
    ) -> Result<(), Error<I2cErr>> {
        self.modify_config(|word| with_vbus_conversion_time(word, conversion_time))
    }

    pub fn set_vshunt_conversion_time(
        &mut self,
        conversion_time: ConversionTime,
    ) -> Result<(), Error<I2cErr>> {
        self.modify_config(|word| with_vshunt_conversion_time(word, conversion_time))
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error<I2cErr>> {
        self.modify_config(|word| with_mode(word, mode))
    }

    /// Resets every register to its power-on value.
    ///
    /// The cached configuration is left as it was; call
    /// [`Ina236::try_new`] again to bring the device back in line with it.
    pub fn soft_reset(&mut self) -> Result<(), Error<I2cErr>> {
        self.write_register(Register::Configuration, RESET_WORD)
    }

    /// Reads shunt voltage, bus voltage, power and current, in that order.
    ///
    /// Each cached value is replaced as soon as its register is read, so a
    /// failure part way through leaves the earlier values refreshed.
    pub fn read_all(&mut self) -> Result<Measurements, Error<I2cErr>> {
        let raw = decode_signed(self.read_register(Register::ShuntVoltage)?);
        self.measurements.shunt_voltage = shunt_voltage_mv(raw, self.config.adc_range);

        let raw = decode_bus_voltage(self.read_register(Register::BusVoltage)?);
        self.measurements.bus_voltage = bus_voltage_v(raw);

        let raw = self.read_register(Register::Power)?;
        self.measurements.power = power_w(raw, self.current_lsb);

        let raw = decode_signed(self.read_register(Register::Current)?);
        self.measurements.current = current_a(raw, self.current_lsb);

        Ok(self.measurements)
    }

    /// Whether a conversion has completed since the flag was last cleared.
    pub fn is_data_ready(&mut self) -> Result<bool, Error<I2cErr>> {
        Ok(self.mask_enable()?.conversion_ready)
    }

    /// Whether the alert pin was driven by a limit or by conversion ready.
    pub fn alert_source(&mut self) -> Result<AlertSource, Error<I2cErr>> {
        let source = self.mask_enable()?.alert_source();
        #[cfg(feature = "defmt")]
        defmt::debug!("ina236 {=u8:#x}: alert source {}", self.address, source);
        Ok(source)
    }

    pub fn errors(&mut self) -> Result<DeviceErrors, Error<I2cErr>> {
        let errors = self.mask_enable()?.errors();
        #[cfg(feature = "defmt")]
        if errors != DeviceErrors::None {
            defmt::warn!("ina236 {=u8:#x}: device reports {}", self.address, errors);
        }
        Ok(errors)
    }

    /// Clears a latched alert. Reading Mask/Enable is what clears it.
    pub fn reset_alert(&mut self) -> Result<(), Error<I2cErr>> {
        self.read_register(Register::MaskEnable).map(|_| ())
    }

    /// Reads and decodes the Mask/Enable register.
    ///
    /// Note that this also clears a latched alert.
    pub fn mask_enable(&mut self) -> Result<MaskEnableFlags, Error<I2cErr>> {
        Ok(MaskEnableFlags::decode(
            self.read_register(Register::MaskEnable)?,
        ))
    }

    /// Reads the manufacturer ID, [`TI_MANUFACTURER_ID`] on genuine parts.
    pub fn manufacturer_id(&mut self) -> Result<u16, Error<I2cErr>> {
        self.read_register(Register::ManufacturerId)
    }

    pub fn device_id(&mut self) -> Result<DeviceId, Error<I2cErr>> {
        Ok(DeviceId::decode(self.read_register(Register::DeviceId)?))
    }

    /// Shunt voltage in millivolts from the last [`Ina236::read_all`].
    pub fn shunt_voltage(&self) -> f32 {
        self.measurements.shunt_voltage
    }

    /// Bus voltage in volts from the last [`Ina236::read_all`].
    pub fn bus_voltage(&self) -> f32 {
        self.measurements.bus_voltage
    }

    /// Current in amperes from the last [`Ina236::read_all`].
    pub fn current(&self) -> f32 {
        self.measurements.current
    }

    /// Power in watts from the last [`Ina236::read_all`].
    pub fn power(&self) -> f32 {
        self.measurements.power
    }

    pub fn measurements(&self) -> Measurements {
        self.measurements
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn adc_range(&self) -> AdcRange {
        self.config.adc_range
    }

    pub fn num_samples(&self) -> NumSamples {
        self.config.num_samples
    }

    pub fn vbus_conversion_time(&self) -> ConversionTime {
        self.config.vbus_conversion_time
    }

    pub fn vshunt_conversion_time(&self) -> ConversionTime {
        self.config.vshunt_conversion_time
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Alert setup from the last successful [`Ina236::init_alert`].
    pub fn alert_config(&self) -> Option<AlertConfig> {
        self.alert
    }

    pub fn calibration(&self) -> u16 {
        self.calibration
    }

    /// Current LSB in amperes.
    pub fn current_lsb(&self) -> f32 {
        self.current_lsb
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Destroys the driver and returns the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Read-modify-write of the configuration register.
    ///
    /// Only the field touched by `update` changes on the device. The cached
    /// configuration is refreshed from the written word, picking up any
    /// changes made behind the driver's back.
    fn modify_config(&mut self, update: impl FnOnce(u16) -> u16) -> Result<(), Error<I2cErr>> {
        let word = update(self.read_register(Register::Configuration)?);
        self.write_register(Register::Configuration, word)?;

        let fields = ConfigWord::decode(word);
        self.config = Config {
            adc_range: fields.adc_range,
            num_samples: fields.num_samples,
            vbus_conversion_time: fields.vbus_conversion_time,
            vshunt_conversion_time: fields.vshunt_conversion_time,
            mode: fields.mode,
            ..self.config
        };
        Ok(())
    }

    /// Reads a single register from the INA236.
    fn read_register(&mut self, reg: Register) -> Result<u16, Error<I2cErr>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg as u8], &mut buf)
            .map_err(Error::I2c)?;
        let value = BigEndian::read_u16(&buf);

        #[cfg(feature = "defmt")]
        defmt::trace!("ina236 {=u8:#x}: read {} = {=u16:#x}", self.address, reg, value);

        Ok(value)
    }

    /// Writes a value to a single register.
    fn write_register(&mut self, reg: Register, value: u16) -> Result<(), Error<I2cErr>> {
        let mut buf = [reg as u8, 0, 0];
        BigEndian::write_u16(&mut buf[1..], value);

        #[cfg(feature = "defmt")]
        defmt::trace!("ina236 {=u8:#x}: write {} = {=u16:#x}", self.address, reg, value);

        self.i2c.write(self.address, &buf).map_err(Error::I2c)
    }
}
