use std::fs;
use std::path::{Path, PathBuf};

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    Ok,
    /// The OS reports no battery at all
    NoBattery,
    /// A battery exists but could not be read this time
    QueryFailed,
}

/// One battery poll result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    pub percent: u8,
    pub plugged_in: bool,
    pub status: SensorStatus,
}

impl BatteryReading {
    pub fn new(percent: u8, plugged_in: bool) -> Self {
        Self {
            percent: percent.min(100),
            plugged_in,
            status: SensorStatus::Ok,
        }
    }

    pub fn no_battery() -> Self {
        Self {
            percent: 0,
            plugged_in: false,
            status: SensorStatus::NoBattery,
        }
    }

    pub fn query_failed() -> Self {
        Self {
            percent: 0,
            plugged_in: false,
            status: SensorStatus::QueryFailed,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == SensorStatus::Ok
    }
}

/// Source of battery readings. Implementations must never panic or block for long.
pub trait BatteryReader: Send + Sync {
    fn read(&self) -> BatteryReading;
}

/// Reads the composite battery state from the Linux power_supply class
pub struct SysfsBattery {
    root: PathBuf,
}

impl SysfsBattery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn supplies(&self) -> Option<Vec<PathBuf>> {
        let mut entries: Vec<_> = fs::read_dir(&self.root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        // BAT0 before BAT1
        entries.sort();
        Some(entries)
    }
}

impl Default for SysfsBattery {
    fn default() -> Self {
        Self::new(POWER_SUPPLY_DIR)
    }
}

impl BatteryReader for SysfsBattery {
    fn read(&self) -> BatteryReading {
        let Some(supplies) = self.supplies() else {
            return BatteryReading::no_battery();
        };

        let Some(battery) = supplies.iter().find(|path| is_battery(path)) else {
            return BatteryReading::no_battery();
        };

        let Some(percent) = read_attr(battery, "capacity").and_then(|s| s.parse::<u8>().ok())
        else {
            tracing::debug!("Could not read capacity from {:?}", battery);
            return BatteryReading::query_failed();
        };

        let adapters: Vec<_> = supplies.iter().filter(|path| is_adapter(path)).collect();

        let plugged_in = if adapters.is_empty() {
            let status = read_attr(battery, "status").unwrap_or_default();
            matches!(status.as_str(), "Charging" | "Full" | "Not charging")
        } else {
            adapters
                .iter()
                .any(|path| read_attr(path, "online").as_deref() == Some("1"))
        };

        BatteryReading::new(percent, plugged_in)
    }
}

/// The system battery, not a peripheral's (wireless mice report `scope=Device`)
fn is_battery(path: &Path) -> bool {
    if is_device_scoped(path) {
        return false;
    }

    match read_attr(path, "type") {
        Some(kind) => kind == "Battery",
        None => path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("BAT")),
    }
}

fn is_adapter(path: &Path) -> bool {
    !is_device_scoped(path)
        && matches!(
            read_attr(path, "type").as_deref(),
            Some("Mains") | Some("USB")
        )
}

fn is_device_scoped(path: &Path) -> bool {
    read_attr(path, "scope").as_deref() == Some("Device")
}

fn read_attr(path: &Path, attr: &str) -> Option<String> {
    fs::read_to_string(path.join(attr))
        .ok()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supply(root: &Path, name: &str, attrs: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (attr, value) in attrs {
            fs::write(dir.join(attr), format!("{}\n", value)).unwrap();
        }
    }

    #[test]
    fn test_missing_power_supply_dir_is_no_battery() {
        let dir = tempfile::tempdir().unwrap();
        let reader = SysfsBattery::new(dir.path().join("absent"));

        assert_eq!(reader.read().status, SensorStatus::NoBattery);
        assert!(!reader.read().is_valid());
    }

    #[test]
    fn test_desktop_without_battery() {
        let dir = tempfile::tempdir().unwrap();
        supply(dir.path(), "AC", &[("type", "Mains"), ("online", "1")]);

        assert_eq!(
            SysfsBattery::new(dir.path()).read(),
            BatteryReading::no_battery()
        );
    }

    #[test]
    fn test_plugged_in_from_adapter() {
        let dir = tempfile::tempdir().unwrap();
        supply(
            dir.path(),
            "BAT0",
            &[("type", "Battery"), ("capacity", "95"), ("status", "Charging")],
        );
        supply(dir.path(), "AC", &[("type", "Mains"), ("online", "1")]);

        assert_eq!(
            SysfsBattery::new(dir.path()).read(),
            BatteryReading::new(95, true)
        );
    }

    #[test]
    fn test_adapter_offline_means_unplugged() {
        let dir = tempfile::tempdir().unwrap();
        supply(
            dir.path(),
            "BAT0",
            &[("type", "Battery"), ("capacity", "97"), ("status", "Full")],
        );
        supply(dir.path(), "AC", &[("type", "Mains"), ("online", "0")]);

        assert_eq!(
            SysfsBattery::new(dir.path()).read(),
            BatteryReading::new(97, false)
        );
    }

    #[test]
    fn test_status_fallback_without_adapter() {
        let dir = tempfile::tempdir().unwrap();
        supply(dir.path(), "BAT1", &[("capacity", "40"), ("status", "Discharging")]);
        assert_eq!(
            SysfsBattery::new(dir.path()).read(),
            BatteryReading::new(40, false)
        );

        supply(dir.path(), "BAT1", &[("status", "Not charging")]);
        assert!(SysfsBattery::new(dir.path()).read().plugged_in);
    }

    #[test]
    fn test_peripheral_battery_is_not_the_system_battery() {
        let dir = tempfile::tempdir().unwrap();
        supply(
            dir.path(),
            "hidpp_battery_0",
            &[
                ("type", "Battery"),
                ("scope", "Device"),
                ("capacity", "100"),
                ("status", "Charging"),
            ],
        );

        assert_eq!(
            SysfsBattery::new(dir.path()).read(),
            BatteryReading::no_battery()
        );
    }

    #[test]
    fn test_laptop_battery_next_to_peripheral() {
        let dir = tempfile::tempdir().unwrap();
        supply(
            dir.path(),
            "BAT0",
            &[("type", "Battery"), ("scope", "System"), ("capacity", "92"), ("status", "Discharging")],
        );
        supply(
            dir.path(),
            "hidpp_battery_0",
            &[("type", "Battery"), ("scope", "Device"), ("capacity", "100"), ("status", "Charging")],
        );
        supply(
            dir.path(),
            "ucsi-source-psy-mouse",
            &[("type", "USB"), ("scope", "Device"), ("online", "1")],
        );
        supply(dir.path(), "AC", &[("type", "Mains"), ("online", "0")]);

        assert_eq!(
            SysfsBattery::new(dir.path()).read(),
            BatteryReading::new(92, false)
        );
    }

    #[test]
    fn test_zero_percent_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        supply(dir.path(), "BAT0", &[("capacity", "0"), ("status", "Discharging")]);

        let reading = SysfsBattery::new(dir.path()).read();
        assert!(reading.is_valid());
        assert_eq!(reading.percent, 0);
    }

    #[test]
    fn test_unreadable_capacity_is_query_failure() {
        let dir = tempfile::tempdir().unwrap();
        supply(dir.path(), "BAT0", &[("capacity", "garbage")]);

        assert_eq!(
            SysfsBattery::new(dir.path()).read().status,
            SensorStatus::QueryFailed
        );
    }
}
