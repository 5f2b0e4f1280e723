//! One-shot hardware peripheral initialisation and raw pin-write shims.
//!
//! On the target: configures GPIO directions and LEDC timers/channels using
//! raw ESP-IDF sys calls, called once from `main()` before the poll loop.
//! On the host: every write lands in an in-memory pin image so driver tests
//! can assert on the exact levels and duties that would reach the board.

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed,
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed => write!(f, "LEDC timer/channel config failed"),
        }
    }
}

// ── Target implementation ─────────────────────────────────────

#[cfg(feature = "espidf")]
mod hw {
    use super::HwInitError;
    use crate::pins;
    use esp_idf_svc::sys::*;
    use log::info;

    pub const LEDC_CH_AUGER: u32 = 0;
    pub const LEDC_CH_BLOWER_R: u32 = 1;
    pub const LEDC_CH_BLOWER_L: u32 = 2;
    pub const LEDC_CH_GATE: u32 = 3;

    /// Map a PWM-capable pin to its LEDC channel.
    fn ledc_channel_for(pin: i32) -> Option<u32> {
        match pin {
            pins::AUGER_ENA_GPIO => Some(LEDC_CH_AUGER),
            pins::BLOWER_RPWM_GPIO => Some(LEDC_CH_BLOWER_R),
            pins::BLOWER_LPWM_GPIO => Some(LEDC_CH_BLOWER_L),
            pins::GATE_ENA_GPIO => Some(LEDC_CH_GATE),
            _ => None,
        }
    }

    pub fn init_peripherals() -> Result<(), HwInitError> {
        // SAFETY: called once from main() before the poll loop; single-threaded.
        unsafe {
            init_gpio()?;
            init_ledc();
        }
        info!("hw_init: all peripherals configured");
        Ok(())
    }

    unsafe fn init_gpio() -> Result<(), HwInitError> {
        let output_pins = [
            pins::RELAY_LED_GPIO,
            pins::RELAY_FAN_GPIO,
            pins::AUGER_IN1_GPIO,
            pins::AUGER_IN2_GPIO,
            pins::GATE_IN1_GPIO,
            pins::GATE_IN2_GPIO,
            pins::LOADCELL_SCK_GPIO,
        ];

        for &pin in &output_pins {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pin,
                mode: gpio_mode_t_GPIO_MODE_OUTPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            };
            let ret = unsafe { gpio_config(&cfg) };
            if ret != ESP_OK as i32 {
                return Err(HwInitError::GpioConfigFailed(ret));
            }
        }

        // Relays are active LOW: park them HIGH (de-energised) immediately;
        // motor direction pins park LOW.
        unsafe {
            gpio_set_level(pins::RELAY_LED_GPIO, 1);
            gpio_set_level(pins::RELAY_FAN_GPIO, 1);
            gpio_set_level(pins::AUGER_IN1_GPIO, 0);
            gpio_set_level(pins::AUGER_IN2_GPIO, 0);
            gpio_set_level(pins::GATE_IN1_GPIO, 0);
            gpio_set_level(pins::GATE_IN2_GPIO, 0);
        }

        let din_cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pins::LOADCELL_DOUT_GPIO,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&din_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }

        info!("hw_init: GPIO configured, all motors parked");
        Ok(())
    }

    unsafe fn init_ledc() {
        // One shared 20 kHz / 8-bit timer for every motor channel.
        let timer0 = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num: ledc_timer_t_LEDC_TIMER_0,
            duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
            freq_hz: pins::MOTOR_PWM_FREQ_HZ,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        unsafe {
            ledc_timer_config(&timer0);
        }

        let channels = [
            (LEDC_CH_AUGER, pins::AUGER_ENA_GPIO),
            (LEDC_CH_BLOWER_R, pins::BLOWER_RPWM_GPIO),
            (LEDC_CH_BLOWER_L, pins::BLOWER_LPWM_GPIO),
            (LEDC_CH_GATE, pins::GATE_ENA_GPIO),
        ];
        for (ch, gpio) in channels {
            unsafe {
                ledc_channel_config(&ledc_channel_config_t {
                    speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                    channel: ch,
                    timer_sel: ledc_timer_t_LEDC_TIMER_0,
                    gpio_num: gpio,
                    duty: 0,
                    hpoint: 0,
                    ..Default::default()
                });
            }
        }

        info!("hw_init: LEDC configured (auger=CH0, blower=CH1/2, gate=CH3)");
    }

    pub fn gpio_write(pin: i32, high: bool) {
        // SAFETY: writes to an already-configured output pin; main-loop only.
        unsafe {
            gpio_set_level(pin, u32::from(high));
        }
    }

    pub fn pwm_write(pin: i32, duty: u8) {
        let Some(channel) = ledc_channel_for(pin) else {
            log::error!("pwm_write: pin {} has no LEDC channel", pin);
            return;
        };
        // SAFETY: LEDC channels configured in init_ledc(); main-loop only.
        unsafe {
            ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
            ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
        }
    }
}

// ── Host simulation ───────────────────────────────────────────
//
// Mirrors the target API onto an in-memory pin image, addressed by pin
// number. The image is shared process-wide (like the real pins), so a test
// that asserts on raw levels uses pins no other test drives and keeps the
// write and the assert in one test function.

#[cfg(not(feature = "espidf"))]
mod hw {
    use super::HwInitError;
    use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

    /// One bit per GPIO (pins 0-63).
    static SIM_GPIO_LEVELS: AtomicU64 = AtomicU64::new(0);
    /// Duty per pin (pins 0-63).
    static SIM_PWM_DUTY: [AtomicU8; 64] = [const { AtomicU8::new(0) }; 64];

    pub fn init_peripherals() -> Result<(), HwInitError> {
        log::info!("hw_init(sim): peripheral init skipped");
        Ok(())
    }

    pub fn gpio_write(pin: i32, high: bool) {
        let mask = 1u64 << (pin as u64 & 63);
        if high {
            SIM_GPIO_LEVELS.fetch_or(mask, Ordering::Relaxed);
        } else {
            SIM_GPIO_LEVELS.fetch_and(!mask, Ordering::Relaxed);
        }
    }

    pub fn pwm_write(pin: i32, duty: u8) {
        SIM_PWM_DUTY[pin as usize & 63].store(duty, Ordering::Relaxed);
    }

    /// Test accessor: current simulated level of a GPIO.
    pub fn sim_gpio_level(pin: i32) -> bool {
        SIM_GPIO_LEVELS.load(Ordering::Relaxed) & (1u64 << (pin as u64 & 63)) != 0
    }

    /// Test accessor: current simulated duty of a PWM pin.
    pub fn sim_pwm_duty(pin: i32) -> u8 {
        SIM_PWM_DUTY[pin as usize & 63].load(Ordering::Relaxed)
    }
}

pub use hw::{gpio_write, init_peripherals, pwm_write};

#[cfg(not(feature = "espidf"))]
pub use hw::{sim_gpio_level, sim_pwm_duty};
