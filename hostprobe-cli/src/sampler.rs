//! Delta-sampled CPU utilization.
//!
//! Each round reads the aggregate `cpu` counters twice, `interval` apart, on the calling thread.
//! A round whose total did not advance yields no value. How those skipped rounds affect the
//! average depends on [`Averaging`]: `Nominal` divides by the requested round count and so
//! understates usage when rounds are skipped, while `Contributing` (the default) divides by the
//! rounds that produced a value.

use std::{thread, time::Duration};

use hostprobe_proto::{Averaging, CpuTimeSample, CpuUsage};
use log::{debug, trace};

use crate::source::{CounterSource, ProbeError};

const AGGREGATE_LABEL: &str = "cpu";
const COUNTERS: &str = "cpu counters";

/// Reads the aggregate `cpu` line. Per-core lines (`cpu0`, `cpu1`, ...) are ignored.
pub fn capture_sample(source: &mut impl CounterSource) -> Result<CpuTimeSample, ProbeError> {
    let content = source.read_counters()?;
    parse_aggregate_line(&content)
}

fn parse_aggregate_line(content: &str) -> Result<CpuTimeSample, ProbeError> {
    let fields = content
        .lines()
        .map(str::split_whitespace)
        .find_map(|mut fields| (fields.next() == Some(AGGREGATE_LABEL)).then_some(fields))
        .ok_or_else(|| ProbeError::malformed(COUNTERS, "no aggregate `cpu` line"))?;

    let ticks = fields
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|e| ProbeError::malformed(COUNTERS, format!("tick count {field:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let len = ticks.len();
    CpuTimeSample::new(ticks).ok_or_else(|| {
        ProbeError::malformed(
            COUNTERS,
            format!("aggregate `cpu` line has {len} categories, idle bucket missing"),
        )
    })
}

#[derive(Debug)]
pub struct Sampler<S> {
    source: S,
    samples: u32,
    interval: Duration,
    averaging: Averaging,
}

impl<S: CounterSource> Sampler<S> {
    pub fn new(source: S, samples: u32, interval: Duration, averaging: Averaging) -> Self {
        Self {
            source,
            samples,
            interval,
            averaging,
        }
    }

    /// Blocks for up to `samples * interval`.
    ///
    /// A failed capture ends the whole computation with that error: rounds already accumulated
    /// are discarded and no partial average is reported.
    pub fn compute_utilization(&mut self) -> Result<CpuUsage, ProbeError> {
        if self.samples == 0 {
            return Err(ProbeError::InvalidArgument("sample count must be at least 1"));
        }

        let mut accumulated = 0.0;
        let mut contributing = 0u32;

        for round in 1..=self.samples {
            let before = capture_sample(&mut self.source)?;
            thread::sleep(self.interval);
            let after = capture_sample(&mut self.source)?;

            match after.usage_since(&before) {
                Some(usage) => {
                    trace!("round {round}/{}: {usage:.2}%", self.samples);
                    accumulated += usage;
                    contributing += 1;
                }
                None => debug!(
                    "round {round}/{}: counters did not advance, skipping",
                    self.samples
                ),
            }
        }

        let divisor = match self.averaging {
            Averaging::Contributing if contributing == 0 => {
                return Err(ProbeError::NoUsableRounds(self.samples));
            }
            Averaging::Contributing => contributing,
            Averaging::Nominal => self.samples,
        };

        Ok(CpuUsage {
            percent: accumulated / f64::from(divisor),
            rounds: self.samples,
            skipped: self.samples - contributing,
            averaging: self.averaging,
        })
    }
}
