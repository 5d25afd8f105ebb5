//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements    | Connects to                  |
//! |-----------------|---------------|------------------------------|
//! | `ble`           | RadioPort     | Bluedroid GATT server        |
//! | `ble_transport` |               | MTU fragmentation helper     |
//! | `device_id`     |               | eFuse MAC → default name     |
//! | `fs_store`      | RecordFile    | SPIFFS sensor log            |
//! |                 | NameStore     | SPIFFS name file             |
//! | `log_sink`      | EventSink     | Serial log output            |
//! | `nvs`           | ConfigPort    | NVS / in-memory store        |
//! | `time`          | ClockPort     | ESP32 RTC + system timer     |

pub mod ble;
pub mod ble_transport;
pub mod device_id;
pub mod fs_store;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub(crate) mod utils;
