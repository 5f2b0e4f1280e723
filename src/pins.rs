//! GPIO / peripheral pin assignments for the FishFeeder control board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers. Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Relay module (2-channel, active LOW)
// ---------------------------------------------------------------------------

/// Relay channel 1: pond LED light. Driving the pin LOW energises the relay.
pub const RELAY_LED_GPIO: i32 = 50;
/// Relay channel 2: control-box cooling fan. Active LOW.
pub const RELAY_FAN_GPIO: i32 = 52;

// ---------------------------------------------------------------------------
// Auger motor (L298N H-bridge)
// ---------------------------------------------------------------------------

/// PWM enable input (speed).
pub const AUGER_ENA_GPIO: i32 = 8;
/// Direction input 1.
pub const AUGER_IN1_GPIO: i32 = 9;
/// Direction input 2.
pub const AUGER_IN2_GPIO: i32 = 10;

// ---------------------------------------------------------------------------
// Blower motor (BTS7960, dual-PWM half bridges)
// ---------------------------------------------------------------------------

/// Right-side PWM — drives the blower in its normal direction.
pub const BLOWER_RPWM_GPIO: i32 = 5;
/// Left-side PWM — reverse; unused in normal operation but wired.
pub const BLOWER_LPWM_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Feed-gate linear actuator (L298N H-bridge, second channel)
// ---------------------------------------------------------------------------

/// PWM enable input.
pub const GATE_ENA_GPIO: i32 = 11;
/// Direction input 1 (extend = gate open).
pub const GATE_IN1_GPIO: i32 = 12;
/// Direction input 2 (retract = gate closed).
pub const GATE_IN2_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT22 in the feed hopper.
pub const DHT_FEED_GPIO: i32 = 46;
/// DHT22 in the control box.
pub const DHT_BOX_GPIO: i32 = 48;
/// HX711 load-cell data out.
pub const LOADCELL_DOUT_GPIO: i32 = 28;
/// HX711 load-cell clock.
pub const LOADCELL_SCK_GPIO: i32 = 26;

/// Load (battery) voltage divider — ADC channel.
pub const LOAD_VOLTAGE_ADC_CH: u32 = 1;
/// Load current (ACS712 hall sensor) — ADC channel.
pub const LOAD_CURRENT_ADC_CH: u32 = 0;
/// Solar voltage divider — ADC channel.
pub const SOLAR_VOLTAGE_ADC_CH: u32 = 3;
/// Solar current (ACS712 hall sensor) — ADC channel.
pub const SOLAR_CURRENT_ADC_CH: u32 = 4;
/// Soil-moisture probe — ADC channel.
pub const SOIL_ADC_CH: u32 = 2;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC base frequency for the motor drivers (20 kHz — inaudible).
pub const MOTOR_PWM_FREQ_HZ: u32 = 20_000;
