//! Laptop Record Model
//!
//! The catalog entity and its nested specification messages (`catalog.v1`).
//! Every type is an owned protobuf message, so `Clone` produces a fully
//! independent copy including the nested `gpus`/`storages` lists. Stores
//! rely on that to hand out copies that never alias their own state.
//!
//! # Wire Tags
//!
//! | Field | Tag |
//! |-------|-----|
//! | `id` | 1 |
//! | `brand`, `name` | 2, 3 |
//! | `cpu`, `ram` | 4, 5 |
//! | `gpus`, `storages` | 6, 7 |
//! | `screen`, `keyboard` | 8, 9 |
//! | `weight_kg` / `weight_lb` | 10 / 11 (oneof) |
//! | `price_usd`, `release_year`, `updated_at` | 12, 13, 14 |

use serde::{Deserialize, Serialize};

// =============================================================================
// Enumerations
// =============================================================================

/// Unit of a [`Memory`] quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MemoryUnit {
    /// Unspecified; normalises to zero bits.
    Unknown = 0,
    /// Bits.
    Bit = 1,
    /// Bytes (8 bits).
    Byte = 2,
    /// Kilobytes (2^10 bytes).
    Kilobyte = 3,
    /// Megabytes (2^20 bytes).
    Megabyte = 4,
    /// Gigabytes (2^30 bytes).
    Gigabyte = 5,
    /// Terabytes (2^40 bytes).
    Terabyte = 6,
}

impl MemoryUnit {
    /// Left shift converting one unit of `self` into bits.
    #[must_use]
    pub const fn bit_shift(self) -> Option<u32> {
        match self {
            Self::Unknown => None,
            Self::Bit => Some(0),
            Self::Byte => Some(3),
            Self::Kilobyte => Some(13),
            Self::Megabyte => Some(23),
            Self::Gigabyte => Some(33),
            Self::Terabyte => Some(43),
        }
    }
}

/// Storage driver technology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StorageDriver {
    /// Unspecified.
    Unknown = 0,
    /// Spinning disk.
    Hdd = 1,
    /// Solid state.
    Ssd = 2,
}

/// Screen panel technology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ScreenPanel {
    /// Unspecified.
    Unknown = 0,
    /// In-plane switching.
    Ips = 1,
    /// Organic LED.
    Oled = 2,
}

/// Keyboard layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum KeyboardLayout {
    /// Unspecified.
    Unknown = 0,
    /// QWERTY.
    Qwerty = 1,
    /// QWERTZ.
    Qwertz = 2,
    /// AZERTY.
    Azerty = 3,
}

// =============================================================================
// Specification Messages
// =============================================================================

/// An amount of memory with its unit.
#[derive(Clone, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Memory {
    /// Amount in `unit`s.
    #[prost(uint64, tag = "1")]
    pub value: u64,
    /// [`MemoryUnit`] as its wire value.
    #[prost(enumeration = "MemoryUnit", tag = "2")]
    pub unit: i32,
}

impl Memory {
    /// Create a memory quantity.
    #[must_use]
    pub fn new(value: u64, unit: MemoryUnit) -> Self {
        Self {
            value,
            unit: unit as i32,
        }
    }

    /// Normalise to bits, saturating at `u64::MAX`.
    ///
    /// An unknown unit normalises to zero.
    #[must_use]
    pub fn to_bits(&self) -> u64 {
        self.unit()
            .bit_shift()
            .map_or(0, |shift| self.value.saturating_mul(1_u64 << shift))
    }
}

/// Central processor.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cpu {
    /// Manufacturer, e.g. "Intel".
    #[prost(string, tag = "1")]
    pub brand: String,
    /// Model name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Physical cores.
    #[prost(uint32, tag = "3")]
    pub number_cores: u32,
    /// Hardware threads.
    #[prost(uint32, tag = "4")]
    pub number_threads: u32,
    /// Base clock in GHz.
    #[prost(double, tag = "5")]
    pub min_ghz: f64,
    /// Boost clock in GHz.
    #[prost(double, tag = "6")]
    pub max_ghz: f64,
}

/// Graphics processor.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gpu {
    /// Manufacturer.
    #[prost(string, tag = "1")]
    pub brand: String,
    /// Model name.
    #[prost(string, tag = "2")]
    pub name: String,
    /// Base clock in GHz.
    #[prost(double, tag = "3")]
    pub min_ghz: f64,
    /// Boost clock in GHz.
    #[prost(double, tag = "4")]
    pub max_ghz: f64,
    /// Dedicated memory.
    #[prost(message, optional, tag = "5")]
    pub memory: Option<Memory>,
}

/// A storage device.
#[derive(Clone, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Storage {
    /// [`StorageDriver`] as its wire value.
    #[prost(enumeration = "StorageDriver", tag = "1")]
    pub driver: i32,
    /// Capacity.
    #[prost(message, optional, tag = "2")]
    pub memory: Option<Memory>,
}

/// Pixel dimensions of a screen.
#[derive(Clone, Copy, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenResolution {
    /// Horizontal pixels.
    #[prost(uint32, tag = "1")]
    pub width: u32,
    /// Vertical pixels.
    #[prost(uint32, tag = "2")]
    pub height: u32,
}

/// Display panel.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Screen {
    /// Diagonal in inches.
    #[prost(float, tag = "1")]
    pub size_inch: f32,
    /// Pixel dimensions.
    #[prost(message, optional, tag = "2")]
    pub resolution: Option<ScreenResolution>,
    /// [`ScreenPanel`] as its wire value.
    #[prost(enumeration = "ScreenPanel", tag = "3")]
    pub panel: i32,
    /// Touch input support.
    #[prost(bool, tag = "4")]
    pub multitouch: bool,
}

/// Keyboard.
#[derive(Clone, Copy, PartialEq, Eq, Hash, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Keyboard {
    /// [`KeyboardLayout`] as its wire value.
    #[prost(enumeration = "KeyboardLayout", tag = "1")]
    pub layout: i32,
    /// Backlight present.
    #[prost(bool, tag = "2")]
    pub backlit: bool,
}

/// Weight of a laptop, in one of two units.
#[derive(Clone, Copy, PartialEq, prost::Oneof, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Weight {
    /// Kilograms.
    #[prost(double, tag = "10")]
    WeightKg(f64),
    /// Pounds.
    #[prost(double, tag = "11")]
    WeightLb(f64),
}

// =============================================================================
// Laptop
// =============================================================================

/// A catalog record.
///
/// `id` is a UUID string; once a laptop is stored its id never changes.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Laptop {
    /// UUID identifier.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Manufacturer.
    #[prost(string, tag = "2")]
    pub brand: String,
    /// Model name.
    #[prost(string, tag = "3")]
    pub name: String,
    /// Processor.
    #[prost(message, optional, tag = "4")]
    pub cpu: Option<Cpu>,
    /// Main memory.
    #[prost(message, optional, tag = "5")]
    pub ram: Option<Memory>,
    /// Graphics processors.
    #[prost(message, repeated, tag = "6")]
    pub gpus: Vec<Gpu>,
    /// Storage devices.
    #[prost(message, repeated, tag = "7")]
    pub storages: Vec<Storage>,
    /// Display.
    #[prost(message, optional, tag = "8")]
    pub screen: Option<Screen>,
    /// Keyboard.
    #[prost(message, optional, tag = "9")]
    pub keyboard: Option<Keyboard>,
    /// Weight, in kilograms or pounds.
    #[prost(oneof = "Weight", tags = "10, 11")]
    #[serde(flatten)]
    pub weight: Option<Weight>,
    /// List price in US dollars.
    #[prost(double, tag = "12")]
    pub price_usd: f64,
    /// Year of release.
    #[prost(uint32, tag = "13")]
    pub release_year: u32,
    /// Last modification time.
    #[prost(message, optional, tag = "14")]
    #[serde(with = "timestamp_rfc3339")]
    pub updated_at: Option<prost_types::Timestamp>,
}

impl Laptop {
    /// Processor core count, zero when the CPU is absent.
    #[must_use]
    pub fn cpu_cores(&self) -> u32 {
        self.cpu.as_ref().map_or(0, |cpu| cpu.number_cores)
    }

    /// Processor boost clock, zero when the CPU is absent.
    #[must_use]
    pub fn cpu_max_ghz(&self) -> f64 {
        self.cpu.as_ref().map_or(0.0, |cpu| cpu.max_ghz)
    }

    /// Main memory in bits, zero when RAM is absent.
    #[must_use]
    pub fn ram_bits(&self) -> u64 {
        self.ram.as_ref().map_or(0, Memory::to_bits)
    }
}

/// RFC 3339 (de)serialisation for optional protobuf timestamps.
pub mod timestamp_rfc3339 {
    use chrono::{DateTime, Utc};
    use prost_types::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Convert a protobuf timestamp to UTC time.
    #[must_use]
    pub fn to_datetime(ts: &Timestamp) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(ts.nanos).ok()?;
        DateTime::from_timestamp(ts.seconds, nanos)
    }

    /// Convert UTC time to a protobuf timestamp.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Timestamp {
        Timestamp {
            seconds: dt.timestamp(),
            nanos: i32::try_from(dt.timestamp_subsec_nanos()).unwrap_or(0),
        }
    }

    /// Serialize as an RFC 3339 string, or `null`.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
        match value.as_ref().and_then(to_datetime) {
            Some(dt) => s.serialize_some(&dt.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    /// Deserialize from an RFC 3339 string or `null`.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| from_datetime(dt.with_timezone(&Utc)))
                .map_err(D::Error::custom)
        })
        .transpose()
    }
}
