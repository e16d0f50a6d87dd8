//! Local OS resource sampling
//!
//! Each resource is read by its own probe so that one failing probe does not
//! prevent the others from reporting.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{Disks, ProcessesToUpdate, System};
use thiserror::Error;
use tracing::warn;

use super::SystemStatsSnapshot;

/// Bytes per gigabyte (1024³)
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Window over which CPU utilization is measured
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Errors reported by an individual resource probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The platform has no implementation for this resource
    #[error("{0} sampling is not supported on this platform")]
    Unsupported(&'static str),

    /// No filesystem is mounted at the requested path
    #[error("no filesystem mounted at {}", .0.display())]
    MountNotFound(PathBuf),

    /// The probe ran but produced nothing usable
    #[error("{0} probe returned no data")]
    NoData(&'static str),
}

/// Used and total byte counts for a resource
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl Usage {
    /// Used share of the total, 0-100
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Reads host resources
///
/// Methods may block; callers run them off the async executor.
pub trait SystemProbe: Send + Sync {
    /// Aggregate CPU utilization across all cores, 0-100
    fn cpu_percent(&self) -> Result<f64, ProbeError>;
    /// Virtual memory usage
    fn memory(&self) -> Result<Usage, ProbeError>;
    /// Usage of the filesystem mounted at `mount_point`
    fn disk(&self, mount_point: &Path) -> Result<Usage, ProbeError>;
    /// Seconds since boot
    fn uptime_seconds(&self) -> Result<u64, ProbeError>;
    /// Number of live processes
    fn process_count(&self) -> Result<usize, ProbeError>;
}

/// `SystemProbe` backed by the `sysinfo` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoProbe;

impl SysinfoProbe {
    fn ensure_supported(resource: &'static str) -> Result<(), ProbeError> {
        if sysinfo::IS_SUPPORTED_SYSTEM {
            Ok(())
        } else {
            Err(ProbeError::Unsupported(resource))
        }
    }
}

impl SystemProbe for SysinfoProbe {
    fn cpu_percent(&self) -> Result<f64, ProbeError> {
        Self::ensure_supported("cpu")?;
        let mut system = System::new();
        system.refresh_cpu_usage();
        std::thread::sleep(CPU_SAMPLE_INTERVAL.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu_usage();
        if system.cpus().is_empty() {
            return Err(ProbeError::NoData("cpu"));
        }
        Ok(f64::from(system.global_cpu_usage()))
    }

    fn memory(&self) -> Result<Usage, ProbeError> {
        Self::ensure_supported("memory")?;
        let mut system = System::new();
        system.refresh_memory();
        let total_bytes = system.total_memory();
        if total_bytes == 0 {
            return Err(ProbeError::NoData("memory"));
        }
        Ok(Usage {
            used_bytes: system.used_memory(),
            total_bytes,
        })
    }

    fn disk(&self, mount_point: &Path) -> Result<Usage, ProbeError> {
        Self::ensure_supported("disk")?;
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == mount_point)
            .ok_or_else(|| ProbeError::MountNotFound(mount_point.to_path_buf()))?;
        let total_bytes = disk.total_space();
        Ok(Usage {
            used_bytes: total_bytes.saturating_sub(disk.available_space()),
            total_bytes,
        })
    }

    fn uptime_seconds(&self) -> Result<u64, ProbeError> {
        Self::ensure_supported("uptime")?;
        match System::uptime() {
            0 => Err(ProbeError::NoData("uptime")),
            seconds => Ok(seconds),
        }
    }

    fn process_count(&self) -> Result<usize, ProbeError> {
        Self::ensure_supported("process")?;
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        Ok(system.processes().len())
    }
}

/// Convert a byte count to gigabytes (1024³)
pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// Samples every resource through `probe` into one snapshot
///
/// A failing probe is logged and leaves its fields at zero. Load average is
/// not sampled and stays `[0, 0, 0]`.
pub fn sample_system_stats(
    probe: &dyn SystemProbe,
    root: &Path,
    now: DateTime<Utc>,
) -> SystemStatsSnapshot {
    let mut stats = SystemStatsSnapshot {
        last_updated: now,
        ..SystemStatsSnapshot::default()
    };

    match probe.cpu_percent() {
        Ok(percent) => stats.cpu_percent = percent,
        Err(e) => warn!(error = %e, "failed to get CPU percentage"),
    }

    match probe.memory() {
        Ok(memory) => {
            stats.memory_percent = memory.used_percent();
            stats.memory_used_gb = bytes_to_gb(memory.used_bytes);
            stats.memory_total_gb = bytes_to_gb(memory.total_bytes);
        }
        Err(e) => warn!(error = %e, "failed to get memory info"),
    }

    match probe.disk(root) {
        Ok(disk) => {
            stats.disk_percent = disk.used_percent();
            stats.disk_used_gb = bytes_to_gb(disk.used_bytes);
            stats.disk_total_gb = bytes_to_gb(disk.total_bytes);
        }
        Err(e) => warn!(error = %e, mount = %root.display(), "failed to get disk info"),
    }

    match probe.uptime_seconds() {
        Ok(seconds) => stats.uptime_seconds = seconds,
        Err(e) => warn!(error = %e, "failed to get uptime"),
    }

    match probe.process_count() {
        Ok(count) => stats.process_count = count,
        Err(e) => warn!(error = %e, "failed to get process count"),
    }

    stats
}
