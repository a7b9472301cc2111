use std::fmt;

use hostprobe_proto::{Alert, Metric, Reading, Report};
use log::warn;
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use crate::{
    config::ThresholdConf,
    query::{self, MetricsQuerent},
    sampler::Sampler,
    source::{CommandRunner, CounterSource, ProbeError},
};

/// Every metric is attempted even when an earlier one failed.
pub fn collect<R: CommandRunner, S: CounterSource>(
    querent: &MetricsQuerent<R>,
    sampler: &mut Sampler<S>,
    thresholds: &ThresholdConf,
) -> Report {
    let temperature = read(Metric::Temperature, querent.query_temperature());
    let cpu = read(Metric::Cpu, sampler.compute_utilization());
    let memory = read(Metric::Memory, querent.query_memory());
    let disk = read(Metric::Disk, querent.query_disk());

    let mut report = Report {
        host: query::query_static(),
        sample_time: OffsetDateTime::now_utc().unix_timestamp().max(0) as u64,
        temperature,
        cpu,
        memory,
        disk,
        alerts: Vec::new(),
    };
    report.alerts = check_thresholds(&report, thresholds);
    report
}

fn read<T>(metric: Metric, res: Result<T, ProbeError>) -> Reading<T> {
    if let Err(e) = &res {
        warn!("{metric} unavailable: {e}");
    }
    res.into()
}

/// Reaching a limit counts as exceeding it.
pub fn check_thresholds(report: &Report, thresholds: &ThresholdConf) -> Vec<Alert> {
    [
        (
            Metric::Temperature,
            report.temperature.value().map(|t| t.celsius),
            thresholds.temperature_c,
        ),
        (
            Metric::Cpu,
            report.cpu.value().map(|c| c.percent),
            thresholds.cpu_percent,
        ),
        (
            Metric::Memory,
            report.memory.value().map(|m| m.usage_percent()),
            thresholds.memory_percent,
        ),
        (
            Metric::Disk,
            report.disk.value().map(|d| d.usage_percent),
            thresholds.disk_percent,
        ),
    ]
    .into_iter()
    .filter_map(|(metric, value, limit)| {
        value
            .filter(|value| *value >= limit)
            .map(|value| Alert {
                metric,
                value,
                limit,
            })
    })
    .collect()
}

/// Human-readable rendering of a [`Report`].
pub struct TextReport<'a>(pub &'a Report);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let host = &report.host;
        let unknown = || "unknown".to_owned();

        writeln!(
            f,
            "Host: {} ({} {}, kernel {}, {})",
            host.host_name.clone().unwrap_or_else(unknown),
            host.system_name.clone().unwrap_or_else(unknown),
            host.os_version.clone().unwrap_or_default(),
            host.kernel_version.clone().unwrap_or_else(unknown),
            host.cpu_arch,
        )?;

        let sampled_at = OffsetDateTime::from_unix_timestamp(report.sample_time as i64)
            .map_err(|_| fmt::Error)?
            .to_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .map_err(|_| fmt::Error)?;
        writeln!(f, "Sampled at: {sampled_at}")?;

        line(f, Metric::Temperature, &report.temperature, |t| {
            format!("{:.1} °C", t.celsius)
        })?;
        line(f, Metric::Cpu, &report.cpu, |c| {
            format!(
                "{:.2} % ({} rounds, {} skipped)",
                c.percent, c.rounds, c.skipped
            )
        })?;
        line(f, Metric::Memory, &report.memory, |m| {
            format!(
                "{:.2} % ({} of {} MiB used, {} MiB available)",
                m.usage_percent(),
                m.used,
                m.total,
                m.available
            )
        })?;
        line(f, Metric::Disk, &report.disk, |d| {
            format!(
                "{:.0} % on {} ({} of {} used, {} available)",
                d.usage_percent, d.mount_point, d.used, d.size, d.available
            )
        })?;

        for alert in &report.alerts {
            let unit = match alert.metric {
                Metric::Temperature => " °C",
                _ => " %",
            };
            writeln!(
                f,
                "WARNING: {} is {:.1}{unit}, limit {:.1}{unit}",
                alert.metric, alert.value, alert.limit
            )?;
        }
        Ok(())
    }
}

fn line<T>(
    f: &mut fmt::Formatter<'_>,
    metric: Metric,
    reading: &Reading<T>,
    render: impl FnOnce(&T) -> String,
) -> fmt::Result {
    let label = capitalize(&metric.to_string());
    match reading {
        Reading::Ok { value } => writeln!(f, "{label}: {}", render(value)),
        Reading::Failed { error } => writeln!(f, "{label}: unavailable ({error})"),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
