//! Event sink that renders kernel events onto the serial log.
//!
//! The Pi bridge reads the tagged lines (`[DATA]`, `[FEED]`, `[INFO]`) off
//! the same UART the log goes to; the tags and the status-line format are
//! the external contract, the rest is free-form logging.

use log::{info, warn};

use crate::app::events::FeederEvent;
use crate::app::ports::EventSink;

pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &FeederEvent) {
        match event {
            FeederEvent::Started => info!("[INFO] Feeder_Ready"),
            FeederEvent::FeedStarted {
                target_grams,
                start_weight_kg,
            } => info!(
                "[FEED] Started target={:.0}g initial={:.2}kg",
                target_grams, start_weight_kg
            ),
            FeederEvent::FeedProgress {
                dispensed_grams,
                target_grams,
                elapsed_ms,
            } => info!(
                "[FEED_PROGRESS] {{\"dispensed\":{:.1},\"target\":{:.1},\"t\":{}}}",
                dispensed_grams, target_grams, elapsed_ms
            ),
            FeederEvent::FeedEnded {
                outcome,
                dispensed_grams,
                elapsed_ms,
            } => info!(
                "[FEED] Ended {:?} dispensed={:.1}g elapsed={}ms",
                outcome, dispensed_grams, elapsed_ms
            ),
            FeederEvent::AutoStopped(id) => info!("[INFO] {}_Auto_Stopped", id.name()),
            FeederEvent::EmergencyStop => warn!("[INFO] Emergency_Stop"),
            FeederEvent::Status(snapshot) => info!("[DATA] {}", snapshot),
        }
    }
}
