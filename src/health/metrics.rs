//! Host resource sampling

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use sysinfo::{Disks, System};
use tracing::{debug, warn};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One resource sample. Percentages are 0..=100, sizes in GiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostUsage {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub memory_total_gb: f64,
    pub memory_available_gb: f64,
    pub disk_usage: f64,
    pub disk_total_gb: f64,
    pub disk_free_gb: f64,
}

#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn sample(&self) -> HostUsage;
}

/// Samples the local host through sysinfo
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoMetrics;

#[async_trait]
impl MetricsSource for SysinfoMetrics {
    async fn sample(&self) -> HostUsage {
        match tokio::task::spawn_blocking(sample_host).await {
            Ok(usage) => usage,
            Err(err) => {
                warn!("System metrics collection failed: {}", err);
                HostUsage::default()
            }
        }
    }
}

fn sample_host() -> HostUsage {
    let mut sys = System::new();

    // CPU usage is a delta between two refreshes
    sys.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();
    let cpu_usage = f64::from(sys.global_cpu_usage());

    sys.refresh_memory();
    let memory_total = sys.total_memory() as f64;
    let memory_available = sys.available_memory() as f64;

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().first());
    let (disk_total, disk_free) = disk
        .map(|d| (d.total_space() as f64, d.available_space() as f64))
        .unwrap_or((0.0, 0.0));

    let usage = HostUsage {
        cpu_usage,
        memory_usage: percent_used(memory_total, memory_available),
        memory_total_gb: memory_total / GIB,
        memory_available_gb: memory_available / GIB,
        disk_usage: percent_used(disk_total, disk_free),
        disk_total_gb: disk_total / GIB,
        disk_free_gb: disk_free / GIB,
    };
    debug!(
        "System metrics - CPU: {:.1}%, Memory: {:.1}%, Disk: {:.1}%",
        usage.cpu_usage, usage.memory_usage, usage.disk_usage
    );
    usage
}

fn percent_used(total: f64, free: f64) -> f64 {
    if total > 0.0 {
        (total - free) / total * 100.0
    } else {
        0.0
    }
}

/// Always reports the same sample
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMetrics(pub HostUsage);

#[async_trait]
impl MetricsSource for FixedMetrics {
    async fn sample(&self) -> HostUsage {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_used() {
        assert_eq!(percent_used(200.0, 50.0), 75.0);
        assert_eq!(percent_used(0.0, 0.0), 0.0);
    }

    #[tokio::test]
    async fn test_sysinfo_sample_is_in_range() {
        let usage = SysinfoMetrics.sample().await;
        assert!((0.0..=100.0).contains(&usage.memory_usage));
        assert!((0.0..=100.0).contains(&usage.disk_usage));
        assert!(usage.cpu_usage >= 0.0);
    }
}
