use std::fmt;

use serde::{Deserialize, Serialize};

pub mod cpu;

pub use cpu::{Averaging, CpuTimeSample, CpuUsage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub host: SystemStatus,
    pub sample_time: u64,
    pub temperature: Reading<TemperatureStatus>,
    pub cpu: Reading<CpuUsage>,
    pub memory: Reading<MemoryStatus>,
    pub disk: Reading<DiskStatus>,
    pub alerts: Vec<Alert>,
}

impl Report {
    /// Metrics whose retrieval failed, in report order.
    pub fn failed(&self) -> Vec<Metric> {
        [
            (Metric::Temperature, self.temperature.is_failed()),
            (Metric::Cpu, self.cpu.is_failed()),
            (Metric::Memory, self.memory.is_failed()),
            (Metric::Disk, self.disk.is_failed()),
        ]
        .into_iter()
        .filter_map(|(metric, failed)| failed.then_some(metric))
        .collect()
    }
}

/// Outcome of one independent metric retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reading<T> {
    Ok { value: T },
    Failed { error: String },
}

impl<T> Reading<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Ok { value } => Some(value),
            Reading::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Reading::Failed { .. })
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for Reading<T> {
    fn from(res: Result<T, E>) -> Self {
        match res {
            Ok(value) => Reading::Ok { value },
            Err(e) => Reading::Failed {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStatus {
    pub celsius: f64,
}

/// Memory figures in MiB, as reported by `free -m`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatus {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

impl MemoryStatus {
    pub fn usage_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used as f64 / self.total as f64 * 100.0
    }
}

/// One `df -h` row. Sizes stay in their human-readable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStatus {
    pub filesystem: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub usage_percent: f64,
    pub mount_point: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub system_name: Option<String>,
    pub kernel_version: Option<String>,
    pub os_version: Option<String>,
    pub host_name: Option<String>,
    pub cpu_arch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Cpu,
    Memory,
    Disk,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Temperature => "CPU temperature",
            Metric::Cpu => "CPU usage",
            Metric::Memory => "memory usage",
            Metric::Disk => "disk usage",
        })
    }
}

/// A metric at or above its configured limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric: Metric,
    pub value: f64,
    pub limit: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reading_from_result() {
        let ok: Reading<u32> = Ok::<_, String>(7).into();
        assert_eq!(ok.value(), Some(&7));

        let failed: Reading<u32> = Err::<u32, _>("no sensor").into();
        assert!(failed.is_failed());
        assert_eq!(
            failed,
            Reading::Failed {
                error: "no sensor".to_owned()
            }
        );
    }

    #[test]
    fn test_memory_usage_percent() {
        let mem = MemoryStatus {
            total: 4000,
            used: 1000,
            available: 2800,
        };
        assert_eq!(mem.usage_percent(), 25.0);

        let empty = MemoryStatus {
            total: 0,
            used: 0,
            available: 0,
        };
        assert_eq!(empty.usage_percent(), 0.0);
    }
}
