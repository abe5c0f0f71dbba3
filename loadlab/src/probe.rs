//! Host resource snapshots
use loadlab_core::{ResourceSnapshot, DEFAULT_PROBE_INTERVAL};
use std::path::Path;
use std::time::Duration;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Source of [`ResourceSnapshot`]s.
///
/// `snapshot` is allowed to block; the load driver calls it on the blocking pool.
pub trait ResourceProbe: Send + Sync {
    fn snapshot(&self) -> ResourceSnapshot;
}

/// A fixed snapshot. Useful where the host counters are irrelevant.
impl ResourceProbe for ResourceSnapshot {
    fn snapshot(&self) -> ResourceSnapshot {
        *self
    }
}

/// Reads CPU, memory and disk utilization of the local host.
///
/// CPU usage is a rate, so each snapshot blocks for `interval` between two readings.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    interval: Duration,
}

impl SystemProbe {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_INTERVAL)
    }
}

impl ResourceProbe for SystemProbe {
    fn snapshot(&self) -> ResourceSnapshot {
        let mut system = System::new();

        system.refresh_cpu_usage();
        std::thread::sleep(self.interval.max(MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu_usage();
        let cpu_percent = f64::from(system.global_cpu_usage());

        system.refresh_memory();
        let total = system.total_memory();
        let available = system.available_memory();
        let memory_percent = percent_used(total, available);

        let snapshot = ResourceSnapshot {
            cpu_percent,
            memory_percent,
            memory_available_bytes: available,
            disk_percent: disk_percent(),
        };
        trace!("Resource snapshot: {snapshot:?}");

        snapshot
    }
}

/// Usage of the root filesystem, or of the first disk when `/` is not mounted.
fn disk_percent() -> f64 {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());

    match disk {
        Some(disk) => percent_used(disk.total_space(), disk.available_space()),
        None => {
            debug!("No disks reported; disk usage recorded as 0.");
            0.
        }
    }
}

fn percent_used(total: u64, available: u64) -> f64 {
    if total == 0 {
        return 0.;
    }
    let used = total.saturating_sub(available);
    used as f64 / total as f64 * 100.
}
