//! SensorNode Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleAdapter     FileRecordStore  FileNameStore   RtcClock      │
//! │  (RadioPort)    (RecordFile)     (NameStore)     (ClockPort)   │
//! │  SensorHub      LogEventSink     NvsAdapter                    │
//! │  (SensorPort)   (EventSink)      (ConfigPort)                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              NodeService (pure logic)                  │    │
//! │  │  Session · Tracker · Scheduler · Transfer              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  GATT callbacks ──▶ RADIO_EVENTS ──▶ tick()                    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{info, warn};

use sensornode::adapters::ble::BleAdapter;
use sensornode::adapters::device_id;
use sensornode::adapters::fs_store::{FileNameStore, FileRecordStore, SPIFFS_ROOT};
use sensornode::adapters::log_sink::LogEventSink;
use sensornode::adapters::nvs::{self, NvsAdapter};
use sensornode::adapters::time::RtcClock;
use sensornode::app::service::NodeService;
use sensornode::error::SensorError;
use sensornode::events::{dropped_events, RADIO_EVENTS};
use sensornode::pins;
use sensornode::sensors::cpu_temp::widen_12_bit;
use sensornode::sensors::SensorHub;

/// Register the SPIFFS data partition under [`SPIFFS_ROOT`].
fn mount_spiffs() -> Result<()> {
    use esp_idf_svc::sys::*;
    let conf = esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })?;
    info!("SPIFFS mounted at {}", SPIFFS_ROOT);
    Ok(())
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SensorNode v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new() {
        Ok(store) => nvs::load_or_default(&store),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            Default::default()
        }
    };

    // ── 3. Storage ────────────────────────────────────────────
    mount_spiffs()?;
    let records = FileRecordStore::new(SPIFFS_ROOT);
    let names = FileNameStore::new(SPIFFS_ROOT);

    // ── 4. Sensors ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio20,
        peripherals.pins.gpio21,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let adc = AdcDriver::new(peripherals.adc1)?;
    let mut probe_channel =
        AdcChannelDriver::new(&adc, peripherals.pins.gpio5, &AdcChannelConfig::default())?;
    let adc_ref = &adc;
    let probe = move || {
        adc_ref
            .read_raw(&mut probe_channel)
            .map(widen_12_bit)
            .map_err(|_| SensorError::Adc)
    };
    let sensors = SensorHub::new(i2c, FreeRtos, probe);

    // ── 5. Radio ──────────────────────────────────────────────
    let mut ble = BleAdapter::new(config.advertise_interval_us);
    ble.init()?;
    let default_name = device_id::default_device_name(&config.name_prefix, &device_id::read_mac());

    // ── 6. Application service ────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut service = NodeService::new(
        config,
        &default_name,
        ble,
        records,
        names,
        RtcClock::new(),
        sensors,
    );
    service.start(&mut sink);

    // ── 7. Main loop ──────────────────────────────────────────
    let tick_ms = service.config().tick_interval_ms;
    let mut events = &RADIO_EVENTS;
    let mut delay = FreeRtos;
    let mut dropped = 0;
    loop {
        service.tick(&mut events, &mut delay, &mut sink);

        let now_dropped = dropped_events();
        if now_dropped != dropped {
            warn!("radio events dropped: {} total", now_dropped);
            dropped = now_dropped;
        }

        FreeRtos::delay_ms(tick_ms);
    }
}
