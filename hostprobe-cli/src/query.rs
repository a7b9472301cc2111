use hostprobe_proto::{DiskStatus, MemoryStatus, SystemStatus, TemperatureStatus};
use itertools::Itertools;

use crate::source::{CommandRunner, ProbeError};

const VCGENCMD: &str = "vcgencmd";
const FREE: &str = "free";
const DF: &str = "df";

#[derive(Debug)]
pub struct MetricsQuerent<R> {
    runner: R,
    disk_mount: String,
}

impl<R: CommandRunner> MetricsQuerent<R> {
    pub fn new(runner: R, disk_mount: impl Into<String>) -> Self {
        Self {
            runner,
            disk_mount: disk_mount.into(),
        }
    }

    pub fn query_temperature(&self) -> Result<TemperatureStatus, ProbeError> {
        let out = self.runner.run(VCGENCMD, &["measure_temp"])?;
        parse_temperature(&out)
    }

    pub fn query_memory(&self) -> Result<MemoryStatus, ProbeError> {
        let out = self.runner.run(FREE, &["-m"])?;
        parse_memory(&out)
    }

    pub fn query_disk(&self) -> Result<DiskStatus, ProbeError> {
        let out = self.runner.run(DF, &["-P", "-h", &self.disk_mount])?;
        parse_disk(&out)
    }
}

pub fn query_static() -> SystemStatus {
    SystemStatus {
        system_name: sysinfo::System::name(),
        kernel_version: sysinfo::System::kernel_version(),
        os_version: sysinfo::System::os_version(),
        host_name: sysinfo::System::host_name(),
        cpu_arch: sysinfo::System::cpu_arch(),
    }
}

/// `temp=48.3'C`
fn parse_temperature(out: &str) -> Result<TemperatureStatus, ProbeError> {
    let malformed = || {
        ProbeError::malformed(
            VCGENCMD,
            format!("expected temp=<value>'C, got {:?}", out.trim()),
        )
    };

    let celsius = out
        .trim()
        .strip_prefix("temp=")
        .and_then(|rest| rest.strip_suffix("'C"))
        .ok_or_else(malformed)?
        .parse::<f64>()
        .map_err(|_| malformed())?;

    Ok(TemperatureStatus { celsius })
}

/// Columns are looked up by header name, so both the `available` and the older
/// `buffers cached` layouts of `free` work.
fn parse_memory(out: &str) -> Result<MemoryStatus, ProbeError> {
    let mut lines = out.lines();
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| ProbeError::malformed(FREE, "empty output"))?
        .split_whitespace()
        .collect();
    let row: Vec<&str> = lines
        .find_map(|line| line.strip_prefix("Mem:"))
        .ok_or_else(|| ProbeError::malformed(FREE, "no `Mem:` row"))?
        .split_whitespace()
        .collect();

    let column = |name: &str| -> Result<Option<u64>, ProbeError> {
        let Some(idx) = header.iter().position(|h| *h == name) else {
            return Ok(None);
        };
        let value = row
            .get(idx)
            .ok_or_else(|| ProbeError::malformed(FREE, format!("`Mem:` row has no {name} value")))?;
        value
            .parse()
            .map(Some)
            .map_err(|e| ProbeError::malformed(FREE, format!("{name} {value:?}: {e}")))
    };
    let required = |name: &str| {
        column(name)?.ok_or_else(|| ProbeError::malformed(FREE, format!("no `{name}` column")))
    };

    let total = required("total")?;
    let used = required("used")?;
    let available = match column("available")? {
        Some(available) => available,
        None => required("free")?,
    };

    Ok(MemoryStatus {
        total,
        used,
        available,
    })
}

/// POSIX `df -P` layout: header, then `filesystem size used avail capacity mountpoint`.
fn parse_disk(out: &str) -> Result<DiskStatus, ProbeError> {
    let mut fields = out.lines().skip(1).flat_map(str::split_whitespace);

    let (filesystem, size, used, available, capacity) = fields
        .by_ref()
        .take(5)
        .collect_tuple()
        .ok_or_else(|| ProbeError::malformed(DF, "expected a filesystem row after the header"))?;
    let mount_point = fields.join(" ");
    if mount_point.is_empty() {
        return Err(ProbeError::malformed(DF, "row has no mount point"));
    }

    let usage_percent = capacity
        .strip_suffix('%')
        .and_then(|pct| pct.parse::<f64>().ok())
        .ok_or_else(|| ProbeError::malformed(DF, format!("capacity {capacity:?}")))?;

    Ok(DiskStatus {
        filesystem: filesystem.to_owned(),
        size: size.to_owned(),
        used: used.to_owned(),
        available: available.to_owned(),
        usage_percent,
        mount_point,
    })
}
