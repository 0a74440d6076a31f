//! Random Sample Records
//!
//! Generators for plausible laptops and their components, used by the demo
//! client and by tests that need a populated catalog.

use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::domain::laptop::{
    Cpu, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Screen, ScreenPanel,
    ScreenResolution, Storage, StorageDriver, Weight, timestamp_rfc3339,
};

fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[&'static str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

/// Random keyboard.
#[must_use]
pub fn new_keyboard() -> Keyboard {
    let mut rng = rand::rng();
    let layout = [
        KeyboardLayout::Qwerty,
        KeyboardLayout::Qwertz,
        KeyboardLayout::Azerty,
    ]
    .choose(&mut rng)
    .copied()
    .unwrap_or(KeyboardLayout::Qwerty);

    Keyboard {
        layout: layout as i32,
        backlit: rng.random_bool(0.5),
    }
}

/// Random CPU with 2-8 cores and a 2.0-5.0 GHz clock range.
#[must_use]
pub fn new_cpu() -> Cpu {
    let mut rng = rand::rng();
    let brand = pick(&mut rng, &["Intel", "AMD"]);
    let name = if brand == "Intel" {
        pick(
            &mut rng,
            &["Xeon E-2286M", "Core i9", "Core i7", "Core i5", "Core i3"],
        )
    } else {
        pick(&mut rng, &["Ryzen 7 PRO", "Ryzen 5 PRO", "Ryzen 3 PRO"])
    };

    let number_cores = rng.random_range(2..=8);
    let number_threads = rng.random_range(number_cores..=12);
    let min_ghz = rng.random_range(2.0..3.5);
    let max_ghz = rng.random_range(min_ghz..5.0);

    Cpu {
        brand,
        name,
        number_cores,
        number_threads,
        min_ghz,
        max_ghz,
    }
}

/// Random GPU with 2-6 GB of memory.
#[must_use]
pub fn new_gpu() -> Gpu {
    let mut rng = rand::rng();
    let brand = pick(&mut rng, &["NVIDIA", "AMD"]);
    let name = if brand == "NVIDIA" {
        pick(
            &mut rng,
            &["RTX 2060", "RTX 2070", "GTX 1660-Ti", "GTX 1070"],
        )
    } else {
        pick(&mut rng, &["RX 590", "RX 580", "RX 5700-XT"])
    };

    let min_ghz = rng.random_range(1.0..1.5);
    let max_ghz = rng.random_range(min_ghz..2.0);

    Gpu {
        brand,
        name,
        min_ghz,
        max_ghz,
        memory: Some(Memory::new(rng.random_range(2..=6), MemoryUnit::Gigabyte)),
    }
}

/// Random RAM size between 4 and 64 GB.
#[must_use]
pub fn new_ram() -> Memory {
    Memory::new(rand::rng().random_range(4..=64), MemoryUnit::Gigabyte)
}

/// Random SSD between 128 and 1024 GB.
#[must_use]
pub fn new_ssd() -> Storage {
    Storage {
        driver: StorageDriver::Ssd as i32,
        memory: Some(Memory::new(
            rand::rng().random_range(128..=1024),
            MemoryUnit::Gigabyte,
        )),
    }
}

/// Random HDD between 1 and 6 TB.
#[must_use]
pub fn new_hdd() -> Storage {
    Storage {
        driver: StorageDriver::Hdd as i32,
        memory: Some(Memory::new(
            rand::rng().random_range(1..=6),
            MemoryUnit::Terabyte,
        )),
    }
}

/// Random 16:9 screen of 13-17 inches.
#[must_use]
pub fn new_screen() -> Screen {
    let mut rng = rand::rng();
    let height = rng.random_range(1080..=4320);
    let panel = if rng.random_bool(0.5) {
        ScreenPanel::Ips
    } else {
        ScreenPanel::Oled
    };

    Screen {
        size_inch: rng.random_range(13.0..17.0),
        resolution: Some(ScreenResolution {
            width: height * 16 / 9,
            height,
        }),
        panel: panel as i32,
        multitouch: rng.random_bool(0.5),
    }
}

/// Random laptop with a fresh UUID, updated now.
#[must_use]
pub fn new_laptop() -> Laptop {
    let mut rng = rand::rng();
    let brand = pick(&mut rng, &["Apple", "Dell", "Lenovo"]);
    let name = match brand.as_str() {
        "Apple" => pick(&mut rng, &["Macbook Air", "Macbook Pro"]),
        "Dell" => pick(&mut rng, &["Latitude", "Vostro", "XPS", "Alienware"]),
        _ => pick(&mut rng, &["Thinkpad X1", "Thinkpad P1", "Thinkpad P53"]),
    };

    Laptop {
        id: Uuid::new_v4().to_string(),
        brand,
        name,
        cpu: Some(new_cpu()),
        ram: Some(new_ram()),
        gpus: vec![new_gpu()],
        storages: vec![new_ssd(), new_hdd()],
        screen: Some(new_screen()),
        keyboard: Some(new_keyboard()),
        weight: Some(Weight::WeightKg(rng.random_range(1.0..3.0))),
        price_usd: rng.random_range(1500.0..3000.0),
        release_year: rng.random_range(2015..=2019),
        updated_at: Some(timestamp_rfc3339::from_datetime(Utc::now())),
    }
}

/// Random score between 1 and 10.
#[must_use]
pub fn random_laptop_score() -> f64 {
    f64::from(rand::rng().random_range(1_u8..=10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laptop_fields_within_ranges() {
        for _ in 0..50 {
            let laptop = new_laptop();
            assert!(Uuid::parse_str(&laptop.id).is_ok());
            assert!((1500.0..3000.0).contains(&laptop.price_usd));
            assert!((2015..=2019).contains(&laptop.release_year));

            let cpu = laptop.cpu.as_ref().unwrap();
            assert!((2..=8).contains(&cpu.number_cores));
            assert!(cpu.number_threads >= cpu.number_cores && cpu.number_threads <= 12);
            assert!(cpu.min_ghz >= 2.0 && cpu.min_ghz <= cpu.max_ghz && cpu.max_ghz <= 5.0);

            let ram = laptop.ram.as_ref().unwrap();
            assert_eq!(ram.unit(), MemoryUnit::Gigabyte);
            assert!((4..=64).contains(&ram.value));

            assert!(laptop.updated_at.is_some());
        }
    }

    #[test]
    fn screen_is_sixteen_by_nine() {
        let screen = new_screen();
        let resolution = screen.resolution.unwrap();
        assert!((1080..=4320).contains(&resolution.height));
        assert_eq!(resolution.width, resolution.height * 16 / 9);
        assert!((13.0..17.0).contains(&screen.size_inch));
    }

    #[test]
    fn storages_have_expected_drivers() {
        assert_eq!(new_ssd().driver(), StorageDriver::Ssd);
        assert_eq!(new_hdd().driver(), StorageDriver::Hdd);
        assert_eq!(new_hdd().memory.unwrap().unit(), MemoryUnit::Terabyte);
    }

    #[test]
    fn keyboard_layout_is_known() {
        assert_ne!(new_keyboard().layout(), KeyboardLayout::Unknown);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_laptop().id, new_laptop().id);
    }

    #[test]
    fn score_between_one_and_ten() {
        for _ in 0..100 {
            let score = random_laptop_score();
            assert!((1.0..=10.0).contains(&score));
            assert!((score - score.round()).abs() < f64::EPSILON);
        }
    }
}
