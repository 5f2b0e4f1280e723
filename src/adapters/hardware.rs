//! ESP32 hardware adapter — implements the sensor-side ports on real
//! peripherals. Target-only; host tests use the mock adapter instead.
//!
//! Acquisition quirks live here, behind the port boundary, so the kernel
//! never sees them:
//! - the DHT22 needs ≥ 2 s between reads; faster polls return the cache,
//! - the HX711 is read with a bounded ready-wait — if the chip is not ready
//!   the read fails fast with `ReadFailed` rather than stalling the loop,
//! - ACS712 current and divider voltages are plain ADC conversions.

use esp_idf_svc::sys::{esp_timer_get_time, gpio_get_level, gpio_set_level};
use log::info;

use crate::app::ports::{CalibrationPort, ClimateReading, PowerReading, SensorPort};
use crate::error::SensorError;
use crate::pins;

/// ADC full-scale (12-bit) and reference voltage.
const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

/// Voltage-divider ratios on the power rails.
const LOAD_DIVIDER: f32 = 5.0;
const SOLAR_DIVIDER: f32 = 11.0;

/// ACS712-20A: 100 mV/A around a V_REF/2 midpoint.
const ACS712_MV_PER_A: f32 = 100.0;

/// HX711 gain-128 channel A needs 25 clock pulses.
const HX711_PULSES: u32 = 25;
/// Bounded wait for HX711 data-ready (µs).
const HX711_READY_TIMEOUT_US: i64 = 2_000;

pub struct FeederHardware {
    /// HX711 counts per kg, established by `CAL:weight`.
    scale_factor: f32,
    /// HX711 raw offset, established by `CAL:tare`.
    offset: i32,
    last_raw: i32,
}

impl FeederHardware {
    pub fn new(scale_factor: f32, offset: i32) -> Self {
        Self {
            scale_factor,
            offset,
            last_raw: 0,
        }
    }

    /// One raw HX711 conversion. Fails fast when the chip is not ready.
    fn read_hx711_raw(&mut self) -> Result<i32, SensorError> {
        // SAFETY: pins were configured as input/output in hw_init; all calls
        // are plain register accesses from the single main task.
        unsafe {
            let deadline = esp_timer_get_time() + HX711_READY_TIMEOUT_US;
            while gpio_get_level(pins::LOADCELL_DOUT_GPIO) != 0 {
                if esp_timer_get_time() > deadline {
                    return Err(SensorError::ReadFailed);
                }
            }

            let mut value: u32 = 0;
            for _ in 0..24 {
                gpio_set_level(pins::LOADCELL_SCK_GPIO, 1);
                value <<= 1;
                gpio_set_level(pins::LOADCELL_SCK_GPIO, 0);
                if gpio_get_level(pins::LOADCELL_DOUT_GPIO) != 0 {
                    value |= 1;
                }
            }
            // Remaining pulses select gain 128 for the next conversion.
            for _ in 24..HX711_PULSES {
                gpio_set_level(pins::LOADCELL_SCK_GPIO, 1);
                gpio_set_level(pins::LOADCELL_SCK_GPIO, 0);
            }

            // Sign-extend the 24-bit two's-complement result.
            let raw = ((value << 8) as i32) >> 8;
            self.last_raw = raw;
            Ok(raw)
        }
    }

    fn adc_volts(channel: u32) -> f32 {
        let raw = adc_read(channel);
        f32::from(raw) / ADC_MAX * V_REF
    }

    fn acs712_amps(channel: u32) -> f32 {
        let v = Self::adc_volts(channel);
        (v - V_REF / 2.0) * 1000.0 / ACS712_MV_PER_A
    }
}

impl SensorPort for FeederHardware {
    fn read_feed_climate(&mut self) -> Result<ClimateReading, SensorError> {
        dht22_read(pins::DHT_FEED_GPIO)
    }

    fn read_box_climate(&mut self) -> Result<ClimateReading, SensorError> {
        dht22_read(pins::DHT_BOX_GPIO)
    }

    fn read_power(&mut self) -> Result<PowerReading, SensorError> {
        Ok(PowerReading {
            load_voltage_v: Self::adc_volts(pins::LOAD_VOLTAGE_ADC_CH) * LOAD_DIVIDER,
            load_current_a: Self::acs712_amps(pins::LOAD_CURRENT_ADC_CH),
            solar_voltage_v: Self::adc_volts(pins::SOLAR_VOLTAGE_ADC_CH) * SOLAR_DIVIDER,
            solar_current_a: Self::acs712_amps(pins::SOLAR_CURRENT_ADC_CH),
        })
    }

    fn read_soil_moisture(&mut self) -> Result<f32, SensorError> {
        let raw = adc_read(pins::SOIL_ADC_CH);
        // Probe reads high when dry; map to 0-100 % wet.
        Ok((1.0 - f32::from(raw) / ADC_MAX) * 100.0)
    }

    fn read_weight_kg(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_hx711_raw()?;
        if self.scale_factor == 0.0 {
            return Err(SensorError::ReadFailed);
        }
        let kg = (raw - self.offset) as f32 / self.scale_factor;
        if !(-10.0..=50.0).contains(&kg) {
            return Err(SensorError::OutOfRange);
        }
        Ok(kg)
    }
}

impl CalibrationPort for FeederHardware {
    fn tare(&mut self) -> Result<(), SensorError> {
        let raw = self.read_hx711_raw()?;
        self.offset = raw;
        info!("scale tared at raw {}", raw);
        Ok(())
    }

    fn set_reference_kg(&mut self, kg: f32) -> Result<(), SensorError> {
        let raw = self.read_hx711_raw()?;
        let counts = (raw - self.offset) as f32;
        if counts.abs() < 1.0 {
            return Err(SensorError::OutOfRange);
        }
        self.scale_factor = counts / kg;
        info!("scale calibrated: {:.1} counts/kg", self.scale_factor);
        Ok(())
    }
}

// ── Raw peripheral helpers ────────────────────────────────────

fn adc_read(channel: u32) -> u16 {
    // SAFETY: ADC1 channels run in the default 12-bit configuration; a raw
    // read is a register access from the single main task.
    let raw = unsafe { esp_idf_svc::sys::adc1_get_raw(channel) };
    raw.clamp(0, ADC_MAX as i32) as u16
}

/// Single-wire DHT22 exchange. Returns `ReadFailed` on any timing fault —
/// the caller keeps the previous cached value.
fn dht22_read(pin: i32) -> Result<ClimateReading, SensorError> {
    // SAFETY: bit-banged protocol on a pre-configured pin from the main task.
    unsafe {
        let mut bits = [0u8; 5];

        // Host start signal: pull low ≥ 1 ms, then release.
        gpio_set_level(pin, 0);
        busy_wait_us(1_100);
        gpio_set_level(pin, 1);

        // Sensor response: 80 µs low, 80 µs high.
        if !wait_level(pin, 0, 100) || !wait_level(pin, 1, 100) || !wait_level(pin, 0, 100) {
            return Err(SensorError::ReadFailed);
        }

        for bit in 0..40 {
            if !wait_level(pin, 1, 80) {
                return Err(SensorError::ReadFailed);
            }
            let start = esp_timer_get_time();
            if !wait_level(pin, 0, 100) {
                return Err(SensorError::ReadFailed);
            }
            // >40 µs high means a 1 bit.
            if esp_timer_get_time() - start > 40 {
                bits[bit / 8] |= 1 << (7 - bit % 8);
            }
        }

        let sum = bits[0]
            .wrapping_add(bits[1])
            .wrapping_add(bits[2])
            .wrapping_add(bits[3]);
        if sum != bits[4] {
            return Err(SensorError::ReadFailed);
        }

        let humidity = f32::from(u16::from_be_bytes([bits[0], bits[1]])) / 10.0;
        let raw_t = u16::from_be_bytes([bits[2], bits[3]]);
        let temperature = if raw_t & 0x8000 != 0 {
            -f32::from(raw_t & 0x7FFF) / 10.0
        } else {
            f32::from(raw_t) / 10.0
        };

        if !(-40.0..=80.0).contains(&temperature) {
            return Err(SensorError::OutOfRange);
        }
        Ok(ClimateReading {
            temperature_c: temperature,
            humidity_pct: humidity,
        })
    }
}

unsafe fn busy_wait_us(us: i64) {
    // SAFETY: esp_timer_get_time is a monotonic counter read.
    unsafe {
        let deadline = esp_timer_get_time() + us;
        while esp_timer_get_time() < deadline {}
    }
}

unsafe fn wait_level(pin: i32, level: i32, timeout_us: i64) -> bool {
    // SAFETY: gpio_get_level is a register read on a configured pin.
    unsafe {
        let deadline = esp_timer_get_time() + timeout_us;
        while (gpio_get_level(pin) as i32) != level {
            if esp_timer_get_time() > deadline {
                return false;
            }
        }
        true
    }
}
