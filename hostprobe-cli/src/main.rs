#![forbid(unsafe_code)]

use std::{path::PathBuf, process::ExitCode};

use argh::FromArgs;
use log::{LevelFilter, debug, info};
use simple_logger::SimpleLogger;

use crate::{
    query::MetricsQuerent,
    report::TextReport,
    sampler::Sampler,
    source::{ProcStat, SystemRunner},
};

mod config;
mod query;
mod report;
mod sampler;
mod source;

#[derive(FromArgs, Debug)]
#[argh(description = "One-shot snapshot of CPU temperature, CPU usage, memory and disk.")]
struct Cli {
    #[argh(
        option,
        short = 'c',
        default = "PathBuf::from(\"hostprobe.toml\")",
        description = "path to config file"
    )]
    pub config: PathBuf,
    #[argh(
        option,
        short = 'n',
        description = "number of CPU sampling rounds, overrides the config"
    )]
    pub samples: Option<u32>,
    #[argh(
        option,
        short = 'i',
        description = "pause between the two captures of a round in milliseconds, overrides the config"
    )]
    pub interval_ms: Option<u64>,
    #[argh(switch, description = "print the report as JSON")]
    pub json: bool,
    #[argh(
        switch,
        description = "exit with status 1 when any metric could not be read"
    )]
    pub strict: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;

    let cli: Cli = argh::from_env();
    debug!("command line arguments: {cli:#?}");

    let mut conf = config::load(&cli.config)?;
    if let Some(samples) = cli.samples {
        conf.sampler.samples = samples;
    }
    if let Some(interval_ms) = cli.interval_ms {
        conf.sampler.interval_ms = interval_ms;
    }
    conf.validate()?;
    debug!("using config {conf:#?}");

    let querent = MetricsQuerent::new(SystemRunner, conf.disk.mount.as_str());
    let mut sampler = Sampler::new(
        ProcStat::new(&conf.sampler.stat_path),
        conf.sampler.samples,
        conf.sampler.interval(),
        conf.sampler.averaging,
    );
    info!(
        "sampling CPU usage over {} rounds of {:?}",
        conf.sampler.samples,
        conf.sampler.interval()
    );

    let report = report::collect(&querent, &mut sampler, &conf.thresholds);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", TextReport(&report));
    }

    let failed = report.failed();
    if cli.strict && !failed.is_empty() {
        debug!("strict mode, failed metrics: {failed:?}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
