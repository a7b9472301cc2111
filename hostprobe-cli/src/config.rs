use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use confique::Config;
use hostprobe_proto::Averaging;

#[derive(Config, Debug)]
pub struct Conf {
    #[config(nested)]
    pub sampler: SamplerConf,

    #[config(nested)]
    pub thresholds: ThresholdConf,

    #[config(nested)]
    pub disk: DiskConf,
}

#[derive(Config, Debug)]
pub struct SamplerConf {
    /// Number of two-capture rounds averaged into the CPU usage figure
    #[config(default = 5, env = "HOSTPROBE_SAMPLES")]
    pub samples: u32,

    /// Pause between the two captures of a round, in milliseconds
    #[config(default = 1000, env = "HOSTPROBE_INTERVAL_MS")]
    pub interval_ms: u64,

    /// `contributing` or `nominal`
    #[config(default = "contributing", env = "HOSTPROBE_AVERAGING")]
    pub averaging: Averaging,

    /// Kernel CPU accounting table
    #[config(default = "/proc/stat", env = "HOSTPROBE_STAT_PATH")]
    pub stat_path: PathBuf,
}

impl SamplerConf {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Config, Debug)]
pub struct ThresholdConf {
    /// CPU usage limit in percent
    #[config(default = 80.0, env = "HOSTPROBE_CPU_LIMIT")]
    pub cpu_percent: f64,

    /// CPU temperature limit in °C
    #[config(default = 70.0, env = "HOSTPROBE_TEMPERATURE_LIMIT")]
    pub temperature_c: f64,

    /// Memory usage limit in percent
    #[config(default = 80.0, env = "HOSTPROBE_MEMORY_LIMIT")]
    pub memory_percent: f64,

    /// Disk usage limit in percent
    #[config(default = 90.0, env = "HOSTPROBE_DISK_LIMIT")]
    pub disk_percent: f64,
}

#[derive(Config, Debug)]
pub struct DiskConf {
    /// Mount point passed to `df`
    #[config(default = "/", env = "HOSTPROBE_DISK_MOUNT")]
    pub mount: String,
}

/// Environment first, then the file (a missing file is skipped), then defaults.
pub fn load(path: &Path) -> anyhow::Result<Conf> {
    Conf::builder()
        .env()
        .file(path)
        .load()
        .map_err(|e| e.into())
}

impl Conf {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sampler.samples == 0 {
            anyhow::bail!("sampler.samples must be at least 1");
        }
        for (name, pct) in [
            ("thresholds.cpu_percent", self.thresholds.cpu_percent),
            ("thresholds.memory_percent", self.thresholds.memory_percent),
            ("thresholds.disk_percent", self.thresholds.disk_percent),
        ] {
            if !(pct > 0.0 && pct <= 100.0) {
                anyhow::bail!("{name} must be within (0, 100], got {pct}");
            }
        }
        if !self.thresholds.temperature_c.is_finite() {
            anyhow::bail!("thresholds.temperature_c must be a finite number");
        }
        Ok(())
    }
}
