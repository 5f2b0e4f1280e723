//! Inbound command tokens and their parser.
//!
//! The upstream bridge decodes its pub/sub envelopes into short text tokens
//! of the form `<Category>:<Code>[:<Arg>]`; this module turns a token into a
//! typed [`Command`]. Parsing is a fixed category → code lookup over closed
//! enums — unknown categories and codes are rejected in O(1), there is no
//! chain of free-form string comparisons to scan.
//!
//! Range validation that depends on live configuration (e.g. the `FEED`
//! ceiling) happens in the dispatcher; everything structural is rejected
//! here.

use crate::error::CommandError;

/// A validated command, ready for dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `R:<code>` — relay combinations.
    Relay(RelayCommand),
    /// `G:<code>[:<secs>]` — auger motor.
    Auger(MotorCommand),
    /// `B:0` / `B:1:<pwm>` — blower.
    Blower(BlowerCommand),
    /// `A:<code>[:<secs>]` — feed-gate actuator.
    Gate(MotorCommand),
    /// `FEED:<grams>` — start a feeding session.
    Feed { grams: f32 },
    /// `CAL:tare` / `CAL:weight:<kg>` — calibration pass-through.
    Calibrate(CalCommand),
    /// `CFG:<PARAM>:<value>` — runtime configuration update.
    SetParam(ConfigParam, f32),
    /// `STATUS` — immediate status emission.
    Status,
    /// `STOP` — emergency stop: every motor off, feeding forced idle.
    EmergencyStop,
}

/// Relay codes `R:0..5` (two-channel module: fan on IN1, LED on IN2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    AllOff,
    FanOn,
    FanOff,
    LedOn,
    LedOff,
    AllOn,
}

/// Auger / gate motion. `run_secs` overrides the configured auto-stop
/// duration; `Some(0.0)` means run until told otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    Stop,
    Forward { run_secs: Option<f32> },
    Reverse { run_secs: Option<f32> },
    /// Auger only: short fixed-duration test run at half speed.
    SpeedTest,
}

/// Blower on/off. `pwm: None` means run at the configured speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlowerCommand {
    Off,
    On { pwm: Option<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalCommand {
    Tare,
    SetReference { kg: f32 },
}

/// Parameters adjustable at runtime through `CFG:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigParam {
    AugerSpeed,
    BlowerSpeed,
    GateSpeed,
    AugerRunSecs,
    FanOnTempC,
}

impl Command {
    /// Parse one token. Structural failures are typed so the dispatcher can
    /// log what it dropped; none of them ever mutate state.
    pub fn parse(token: &str) -> Result<Self, CommandError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CommandError::Malformed);
        }

        let mut parts = token.splitn(3, ':');
        let category = parts.next().unwrap_or("");
        let code = parts.next();
        let arg = parts.next();

        match category {
            "R" => {
                if arg.is_some() {
                    return Err(CommandError::Malformed);
                }
                parse_relay(code.ok_or(CommandError::Malformed)?)
            }
            "G" => parse_motor(code.ok_or(CommandError::Malformed)?, arg, true).map(Self::Auger),
            "B" => parse_blower(code.ok_or(CommandError::Malformed)?, arg),
            "A" => parse_motor(code.ok_or(CommandError::Malformed)?, arg, false).map(Self::Gate),
            "FEED" => {
                if arg.is_some() {
                    return Err(CommandError::Malformed);
                }
                parse_feed(code.ok_or(CommandError::Malformed)?)
            }
            "CAL" => parse_cal(code.ok_or(CommandError::Malformed)?, arg),
            "CFG" => parse_cfg(code.ok_or(CommandError::Malformed)?, arg),
            "STATUS" if code.is_none() => Ok(Self::Status),
            "STOP" if code.is_none() => Ok(Self::EmergencyStop),
            _ => Err(CommandError::Malformed),
        }
    }
}

fn parse_relay(code: &str) -> Result<Command, CommandError> {
    let cmd = match code {
        "0" => RelayCommand::AllOff,
        "1" => RelayCommand::FanOn,
        "2" => RelayCommand::FanOff,
        "3" => RelayCommand::LedOn,
        "4" => RelayCommand::LedOff,
        "5" => RelayCommand::AllOn,
        _ => return Err(CommandError::UnknownCode),
    };
    Ok(Command::Relay(cmd))
}

fn parse_motor(
    code: &str,
    arg: Option<&str>,
    allow_speed_test: bool,
) -> Result<MotorCommand, CommandError> {
    let run_secs = match arg {
        None => None,
        Some(s) => Some(parse_secs(s)?),
    };
    match code {
        "0" => {
            if arg.is_some() {
                return Err(CommandError::Malformed);
            }
            Ok(MotorCommand::Stop)
        }
        "1" => Ok(MotorCommand::Forward { run_secs }),
        "2" => Ok(MotorCommand::Reverse { run_secs }),
        "3" if allow_speed_test => {
            if arg.is_some() {
                return Err(CommandError::Malformed);
            }
            Ok(MotorCommand::SpeedTest)
        }
        _ => Err(CommandError::UnknownCode),
    }
}

fn parse_blower(code: &str, arg: Option<&str>) -> Result<Command, CommandError> {
    match (code, arg) {
        ("0", None) => Ok(Command::Blower(BlowerCommand::Off)),
        ("1", Some(pwm)) => {
            let pwm: u16 = pwm.parse().map_err(|_| CommandError::Malformed)?;
            if pwm > 255 {
                return Err(CommandError::OutOfRange);
            }
            Ok(Command::Blower(BlowerCommand::On {
                pwm: Some(pwm as u8),
            }))
        }
        // `B:1` without a PWM argument runs at the configured speed.
        ("1", None) => Ok(Command::Blower(BlowerCommand::On { pwm: None })),
        _ => Err(CommandError::UnknownCode),
    }
}

fn parse_feed(grams: &str) -> Result<Command, CommandError> {
    let grams: f32 = grams.parse().map_err(|_| CommandError::Malformed)?;
    if !grams.is_finite() || grams <= 0.0 {
        return Err(CommandError::OutOfRange);
    }
    Ok(Command::Feed { grams })
}

fn parse_cal(code: &str, arg: Option<&str>) -> Result<Command, CommandError> {
    match (code, arg) {
        ("tare", None) => Ok(Command::Calibrate(CalCommand::Tare)),
        ("weight", Some(kg)) => {
            let kg: f32 = kg.parse().map_err(|_| CommandError::Malformed)?;
            if !kg.is_finite() || kg <= 0.0 {
                return Err(CommandError::OutOfRange);
            }
            Ok(Command::Calibrate(CalCommand::SetReference { kg }))
        }
        _ => Err(CommandError::UnknownCode),
    }
}

fn parse_cfg(param: &str, value: Option<&str>) -> Result<Command, CommandError> {
    let param = match param {
        "AUGER_SPEED" => ConfigParam::AugerSpeed,
        "BLOWER_SPEED" => ConfigParam::BlowerSpeed,
        "GATE_SPEED" => ConfigParam::GateSpeed,
        "AUGER_RUN_SECS" => ConfigParam::AugerRunSecs,
        "FAN_ON_TEMP" => ConfigParam::FanOnTempC,
        _ => return Err(CommandError::UnknownCode),
    };
    let value: f32 = value
        .ok_or(CommandError::Malformed)?
        .parse()
        .map_err(|_| CommandError::Malformed)?;
    if !value.is_finite() {
        return Err(CommandError::OutOfRange);
    }
    Ok(Command::SetParam(param, value))
}

fn parse_secs(s: &str) -> Result<f32, CommandError> {
    let secs: f32 = s.parse().map_err(|_| CommandError::Malformed)?;
    if !secs.is_finite() || secs < 0.0 || secs > 120.0 {
        return Err(CommandError::OutOfRange);
    }
    Ok(secs)
}
