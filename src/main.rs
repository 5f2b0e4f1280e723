//! FishFeeder firmware — main entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                  │
//! │                                                           │
//! │  FeederHardware    LogEventSink     NvsConfigStore        │
//! │  (Sensor+Cal)      (EventSink)      (ConfigPort)          │
//! │                                                           │
//! │  ───────────────── Port Trait Boundary ────────────────   │
//! │                                                           │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │            FeederService (control kernel)           │  │
//! │  │  Dispatch · Feeding · SafetyTimeouts · Sampler      │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! One cooperative poll loop: drain the UART, dispatch, tick the kernel,
//! flush dirty config. No threads, no async, no blocking waits.

#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use fishfeeder::adapters::config_store::{InMemoryConfigStore, NvsConfigStore};
use fishfeeder::adapters::hardware::FeederHardware;
use fishfeeder::adapters::log_sink::LogEventSink;
use fishfeeder::app::ports::ConfigPort;
use fishfeeder::app::service::FeederService;
use fishfeeder::config::FeederConfig;
use fishfeeder::drivers::hw_init;

/// Poll-loop pacing. 10 ms keeps worst-case command latency well under the
/// bridge's expectations while leaving the CPU mostly idle.
const LOOP_DELAY_MS: u32 = 10;

const UART_NUM: esp_idf_svc::sys::uart_port_t = 0;
const LINE_MAX: usize = 256;

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("FishFeeder v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt; the watchdog
        // resets us after its timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // Config: NVS when available, defaults + in-memory store otherwise.
    let mut nvs_store = match NvsConfigStore::new() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("NVS init failed ({}), config will not persist", e);
            None
        }
    };
    let mut fallback_store = InMemoryConfigStore::new();

    let config = nvs_store
        .as_ref()
        .map(|s| s.load())
        .unwrap_or(Err(fishfeeder::app::ports::ConfigError::NotFound))
        .unwrap_or_else(|e| {
            info!("using default config ({})", e);
            FeederConfig::default()
        });

    let mut hardware = FeederHardware::new(1.0, 0);
    let mut sink = LogEventSink::new();
    let mut service = FeederService::new(config);
    service.start(&mut sink);

    let mut line_buf = heapless::Vec::<u8, LINE_MAX>::new();

    loop {
        let now = now_ms();

        // 1. Drain the UART without blocking; dispatch complete lines.
        while let Some(byte) = uart_read_byte() {
            match byte {
                b'\n' | b'\r' => {
                    if !line_buf.is_empty() {
                        if let Ok(line) = core::str::from_utf8(&line_buf) {
                            service.handle_line(line, now, &mut hardware, &mut sink);
                        }
                        line_buf.clear();
                    }
                }
                _ => {
                    if line_buf.push(byte).is_err() {
                        warn!("command line overflow, dropped");
                        line_buf.clear();
                    }
                }
            }
        }

        // 2. Kernel cycle.
        service.tick(now, &mut hardware, &mut sink);

        // 3. Debounced config persistence.
        if let Some(store) = nvs_store.as_mut() {
            let _ = service.auto_save_if_needed(now, store);
        } else {
            let _ = service.auto_save_if_needed(now, &mut fallback_store);
        }

        // 4. Yield to the idle task (feeds the task watchdog).
        unsafe {
            esp_idf_svc::sys::vTaskDelay(LOOP_DELAY_MS / portTICK_PERIOD_MS());
        }
    }
}

fn now_ms() -> u64 {
    // SAFETY: esp_timer_get_time is a monotonic counter read.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1_000) as u64
}

fn uart_read_byte() -> Option<u8> {
    let mut byte = 0u8;
    // SAFETY: zero-timeout read on the console UART; returns immediately.
    let read = unsafe {
        esp_idf_svc::sys::uart_read_bytes(
            UART_NUM,
            core::ptr::addr_of_mut!(byte).cast(),
            1,
            0,
        )
    };
    (read == 1).then_some(byte)
}

#[allow(non_snake_case)]
fn portTICK_PERIOD_MS() -> u32 {
    1_000 / esp_idf_svc::sys::configTICK_RATE_HZ
}
