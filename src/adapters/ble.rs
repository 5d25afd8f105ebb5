//! BLE peripheral adapter.
//!
//! Implements [`RadioPort`]: a single GATT service with one notify
//! characteristic (device → central) and one write characteristic
//! (central → device).  Inbound traffic never goes through this type;
//! the stack callbacks push [`RadioEvent`](crate::events::RadioEvent)s
//! into [`RADIO_EVENTS`](crate::events::RADIO_EVENTS) and the service
//! drains them on its tick.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via `esp_idf_svc::sys`.
//! - **all other targets**: an in-memory simulation that records what the
//!   device would have sent.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                    | Props                 |
//! |----------------|-----------------------------------------|-----------------------|
//! | Service        | `5f97247b-4474-424c-a826-f8ec299b6937`  |                       |
//! | TX             | `5f97247b-…-f8ec299b6939`               | Read + Notify         |
//! | RX             | `5f97247b-…-f8ec299b6938`               | Write + Write-no-rsp  |

use log::{info, warn};

use super::ble_transport;
use super::utils::is_printable_ascii;
use crate::app::ports::{ConnHandle, RadioPort};
use crate::error::RadioError;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x5f97247b_4474_424c_a826_f8ec299b6937;
pub const CHAR_TX: u128 = 0x5f97247b_4474_424c_a826_f8ec299b6939;
pub const CHAR_RX: u128 = 0x5f97247b_4474_424c_a826_f8ec299b6938;

/// Advertising interval unit (0.625 ms) in microseconds.
const ADV_UNIT_US: u32 = 625;
const ADV_INTERVAL_MIN: u16 = 0x0020;
const ADV_INTERVAL_MAX: u16 = 0x4000;

/// Convert an advertising interval in µs to controller units, clamped to
/// the range the controller accepts.
pub fn adv_interval_units(interval_us: u32) -> u16 {
    let units = interval_us / ADV_UNIT_US;
    u16::try_from(units)
        .unwrap_or(ADV_INTERVAL_MAX)
        .clamp(ADV_INTERVAL_MIN, ADV_INTERVAL_MAX)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF Bluedroid glue
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These atomics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_TX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_RX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    esp_ble_gatts_add_char(
        svc_handle,
        &mut char_uuid,
        perm as esp_gatt_perm_t,
        prop as esp_gatt_char_prop_t,
        core::ptr::null_mut(),
        core::ptr::null_mut(),
    );
}

/// Client characteristic configuration descriptor for the TX char.
#[cfg(target_os = "espidf")]
unsafe fn add_cccd(svc_handle: u16) {
    use esp_idf_svc::sys::*;
    let mut uuid: esp_bt_uuid_t = core::mem::zeroed();
    uuid.len = 2;
    uuid.uuid.uuid16 = ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16;
    esp_ble_gatts_add_char_descr(
        svc_handle,
        &mut uuid,
        (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
        core::ptr::null_mut(),
        core::ptr::null_mut(),
    );
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            let status = (*param).adv_start_cmpl.status;
            if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                log::info!("BLE GAP: advertising started");
            } else {
                log::warn!("BLE GAP: advertising start failed (status={})", status);
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use crate::events::{push_radio_event, RadioEvent};
    use esp_idf_svc::sys::*;

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            // service + 2 chars (decl + value) + CCCD
            esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8);
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = (*param).create.service_handle;
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            esp_ble_gatts_start_service(svc_handle);
            BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            add_gatt_char(
                svc_handle,
                CHAR_TX,
                ESP_GATT_PERM_READ,
                ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
            );
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = (*param).add_char.attr_handle;
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_TX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: TX char (handle={})", handle);
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    add_cccd(svc_handle);
                }
                3 => {
                    BLE_RX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(4, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: RX char (handle={}), service ready", handle);
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            if BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) == 2 {
                let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
                BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                add_gatt_char(
                    svc_handle,
                    CHAR_RX,
                    ESP_GATT_PERM_WRITE,
                    ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let conn = (*param).connect.conn_id;
            log::info!("BLE GATTS: central connected (conn_id={})", conn);
            if !push_radio_event(RadioEvent::Connected(conn)) {
                log::warn!("BLE GATTS: event queue full, connect dropped");
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let conn = (*param).disconnect.conn_id;
            log::info!("BLE GATTS: central disconnected (conn_id={})", conn);
            ble_transport::reset_mtu();
            if !push_radio_event(RadioEvent::Disconnected(conn)) {
                log::warn!("BLE GATTS: event queue full, disconnect dropped");
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
            ble_transport::set_mtu((*param).mtu.mtu);
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = &(*param).write;
            if u32::from(p.handle) != BLE_RX_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                return;
            }
            let data = core::slice::from_raw_parts(p.value, p.len as usize);
            match RadioEvent::write(p.conn_id, data) {
                Some(ev) => {
                    if !push_radio_event(ev) {
                        log::warn!("BLE GATTS: event queue full, {} bytes dropped", data.len());
                    }
                }
                None => log::warn!("BLE GATTS: oversized write ({} bytes) dropped", data.len()),
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Failed,
}

/// Everything the simulated radio would have put on the air.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimAir {
    /// `(conn, fragment)` per notification.
    pub notifications: Vec<(ConnHandle, Vec<u8>)>,
    pub adverts: u32,
    /// Fail every notify while set.
    pub fail_notify: bool,
}

pub struct BleAdapter {
    state: BleState,
    device_name: String,
    adv_interval_us: u32,
    #[cfg(not(target_os = "espidf"))]
    air: SimAir,
}

impl BleAdapter {
    pub fn new(adv_interval_us: u32) -> Self {
        Self {
            state: BleState::Idle,
            device_name: String::new(),
            adv_interval_us,
            #[cfg(not(target_os = "espidf"))]
            air: SimAir::default(),
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Bring up the controller and register the GATT service.
    pub fn init(&mut self) -> Result<(), RadioError> {
        self.platform_init().inspect_err(|_| self.state = BleState::Failed)?;
        info!("BLE: stack ready (service {:032x})", SERVICE_UUID);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn air(&self) -> &SimAir {
        &self.air
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn air_mut(&mut self) -> &mut SimAir {
        &mut self.air
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // BLE-only mode frees the classic BT controller memory.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return Err(RadioError::AdvertiseFailed);
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return Err(RadioError::AdvertiseFailed);
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return Err(RadioError::AdvertiseFailed);
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return Err(RadioError::AdvertiseFailed);
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);
            esp_ble_gatt_set_local_mtu(ble_transport::MAX_MTU);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> Result<(), RadioError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_set_name(&mut self, name: &str) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        let c_name = std::ffi::CString::new(name).map_err(|_| RadioError::IdentityFailed)?;
        let mut svc_uuid = SERVICE_UUID.to_le_bytes();
        unsafe {
            if esp_ble_gap_set_device_name(c_name.as_ptr()) != ESP_OK as i32 {
                return Err(RadioError::IdentityFailed);
            }
            let mut adv_data: esp_ble_adv_data_t = core::mem::zeroed();
            adv_data.set_scan_rsp = false;
            adv_data.include_name = true;
            adv_data.flag = (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8;
            if esp_ble_gap_config_adv_data(&mut adv_data) != ESP_OK as i32 {
                return Err(RadioError::IdentityFailed);
            }
            // Service UUID goes in the scan response; it does not fit next to the name.
            let mut scan_rsp: esp_ble_adv_data_t = core::mem::zeroed();
            scan_rsp.set_scan_rsp = true;
            scan_rsp.service_uuid_len = svc_uuid.len() as u16;
            scan_rsp.p_service_uuid = svc_uuid.as_mut_ptr();
            if esp_ble_gap_config_adv_data(&mut scan_rsp) != ESP_OK as i32 {
                return Err(RadioError::IdentityFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set_name(&mut self, name: &str) -> Result<(), RadioError> {
        info!("BLE(sim): identity '{}'", name);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_advertise(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        let interval = adv_interval_units(self.adv_interval_us);
        unsafe {
            let mut adv_params = esp_ble_adv_params_t {
                adv_int_min: interval,
                adv_int_max: interval,
                adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..core::mem::zeroed()
            };
            if esp_ble_gap_start_advertising(&mut adv_params) != ESP_OK as i32 {
                return Err(RadioError::AdvertiseFailed);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_advertise(&mut self) -> Result<(), RadioError> {
        self.air.adverts += 1;
        info!(
            "BLE(sim): advertising '{}' every {} units",
            self.device_name,
            adv_interval_units(self.adv_interval_us)
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, conn: ConnHandle, fragment: &[u8]) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        let handle = BLE_TX_CHAR_HANDLE.load(AtomicOrdering::Relaxed);
        if handle == 0 {
            return Err(RadioError::NotConnected);
        }
        let gatts_if = BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as esp_gatt_if_t;
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                gatts_if,
                conn,
                handle as u16,
                fragment.len() as u16,
                fragment.as_ptr() as *mut u8,
                false,
            )
        };
        if ret != ESP_OK as i32 {
            return Err(RadioError::NotifyFailed);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, conn: ConnHandle, fragment: &[u8]) -> Result<(), RadioError> {
        if self.air.fail_notify {
            return Err(RadioError::NotifyFailed);
        }
        self.air.notifications.push((conn, fragment.to_vec()));
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// RadioPort implementation
// ───────────────────────────────────────────────────────────────

impl RadioPort for BleAdapter {
    fn notify(&mut self, conn: ConnHandle, payload: &[u8]) -> Result<(), RadioError> {
        let mtu = ble_transport::current_mtu();
        let sent = ble_transport::send_fragmented(payload, mtu, |frag| {
            self.platform_notify(conn, frag)
        })
        .inspect_err(|e| warn!("BLE: notify to conn {} failed: {}", conn, e))?;
        log::debug!("BLE: {} bytes to conn {} in {} notifications", payload.len(), conn, sent);
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), RadioError> {
        match self.platform_advertise() {
            Ok(()) => {
                self.state = BleState::Advertising;
                Ok(())
            }
            Err(e) => {
                warn!("BLE: advertising failed: {}", e);
                self.state = BleState::Failed;
                Err(e)
            }
        }
    }

    fn set_identity(&mut self, name: &str) -> Result<(), RadioError> {
        if name.is_empty() || !is_printable_ascii(name) {
            return Err(RadioError::IdentityFailed);
        }
        self.platform_set_name(name)?;
        self.device_name = name.to_string();
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
