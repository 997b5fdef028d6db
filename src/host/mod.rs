//! Host-level observation probes.
//!
//! Each reading is best-effort: a failing probe yields an error that the
//! collector downgrades to a zero reading, never aborting the cycle.

use crate::error::{MeshwatchError, Result};
use sysinfo::{Networks, ProcessesToUpdate, System};

/// Source of host-level readings. Every method is individually
/// fallible; the collector substitutes zero on failure.
pub trait HostProbe: Send {
    /// Overall CPU utilization, percent.
    fn cpu_percent(&mut self) -> Result<f64>;

    /// Memory utilization, percent of total.
    fn mem_percent(&mut self) -> Result<f64>;

    /// Cumulative network throughput across interfaces, megabytes.
    fn net_throughput_mb(&mut self) -> Result<f64>;

    /// One-minute load average.
    fn load_average(&mut self) -> Result<f64>;

    /// Number of running processes.
    fn process_count(&mut self) -> Result<usize>;
}

/// [`HostProbe`] backed by the sysinfo crate.
pub struct SysinfoProbe {
    system: System,
    networks: Networks,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        // First CPU refresh establishes the baseline for usage deltas.
        system.refresh_cpu_all();

        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl HostProbe for SysinfoProbe {
    fn cpu_percent(&mut self) -> Result<f64> {
        self.system.refresh_cpu_all();
        let usage = self.system.global_cpu_usage() as f64;
        if usage.is_nan() {
            return Err(MeshwatchError::CollectionError(
                "cpu usage unavailable".to_string(),
            ));
        }
        Ok(usage)
    }

    fn mem_percent(&mut self) -> Result<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(MeshwatchError::CollectionError(
                "total memory reported as zero".to_string(),
            ));
        }
        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn net_throughput_mb(&mut self) -> Result<f64> {
        self.networks.refresh();
        let bytes: u64 = self
            .networks
            .iter()
            .map(|(_, data)| data.total_received() + data.total_transmitted())
            .sum();
        Ok(bytes as f64 / (1024.0 * 1024.0))
    }

    fn load_average(&mut self) -> Result<f64> {
        let load = System::load_average();
        if load.one < 0.0 {
            return Err(MeshwatchError::CollectionError(
                "load average unavailable".to_string(),
            ));
        }
        Ok(load.one)
    }

    fn process_count(&mut self) -> Result<usize> {
        self.system.refresh_processes(ProcessesToUpdate::All);
        Ok(self.system.processes().len())
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysinfo_probe_readings_are_sane() {
        let mut probe = SysinfoProbe::new();

        let mem = probe.mem_percent().expect("memory reading");
        assert!((0.0..=100.0).contains(&mem));

        let procs = probe.process_count().expect("process count");
        assert!(procs > 0);

        assert!(probe.net_throughput_mb().expect("net reading") >= 0.0);
    }
}
