//! Search Filter
//!
//! A filter lives for one search call only. [`matches`] is the predicate the
//! catalog store evaluates against every candidate during a scan; it is pure
//! and safe to call from any number of concurrent scans.

use serde::{Deserialize, Serialize};

use super::laptop::{Laptop, Memory};

/// Minimum requirements a laptop must meet to appear in search results.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filter {
    /// Highest acceptable price in US dollars.
    #[prost(double, tag = "1")]
    pub max_price_usd: f64,
    /// Fewest acceptable CPU cores.
    #[prost(uint32, tag = "2")]
    pub min_cpu_cores: u32,
    /// Lowest acceptable CPU boost clock in GHz.
    #[prost(double, tag = "3")]
    pub min_cpu_ghz: f64,
    /// Smallest acceptable main memory.
    #[prost(message, optional, tag = "4")]
    pub min_ram: Option<Memory>,
}

impl Filter {
    /// Minimum RAM in bits, zero when unset.
    #[must_use]
    pub fn min_ram_bits(&self) -> u64 {
        self.min_ram.as_ref().map_or(0, Memory::to_bits)
    }
}

/// Whether `laptop` satisfies every bound of `filter`.
///
/// Price is an upper bound; cores, boost clock and normalised RAM are lower
/// bounds. All bounds are inclusive.
#[must_use]
pub fn matches(filter: &Filter, laptop: &Laptop) -> bool {
    laptop.price_usd <= filter.max_price_usd
        && laptop.cpu_cores() >= filter.min_cpu_cores
        && laptop.cpu_max_ghz() >= filter.min_cpu_ghz
        && laptop.ram_bits() >= filter.min_ram_bits()
}
