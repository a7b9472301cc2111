use serde::{Deserialize, Serialize};

/// Position of the idle bucket in the kernel's `cpu` accounting line.
pub const IDLE_INDEX: usize = 3;

/// Cumulative per-category tick counters captured at one instant.
///
/// Categories keep the kernel's order (user, nice, system, idle, iowait, irq, softirq, steal, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCpuTimeSample")]
pub struct CpuTimeSample {
    ticks: Vec<u64>,
}

#[derive(Deserialize)]
struct RawCpuTimeSample {
    ticks: Vec<u64>,
}

impl TryFrom<RawCpuTimeSample> for CpuTimeSample {
    type Error = String;

    fn try_from(raw: RawCpuTimeSample) -> Result<Self, Self::Error> {
        let len = raw.ticks.len();
        CpuTimeSample::new(raw.ticks).ok_or_else(|| {
            format!("{len} tick categories, idle bucket at index {IDLE_INDEX} missing")
        })
    }
}

impl CpuTimeSample {
    /// Returns `None` when there are too few categories to reach the idle bucket.
    pub fn new(ticks: Vec<u64>) -> Option<Self> {
        (ticks.len() > IDLE_INDEX).then_some(Self { ticks })
    }

    pub fn ticks(&self) -> &[u64] {
        &self.ticks
    }

    pub fn idle(&self) -> u64 {
        self.ticks[IDLE_INDEX]
    }

    pub fn total(&self) -> u64 {
        self.ticks.iter().fold(0u64, |acc, t| acc.saturating_add(*t))
    }

    /// Busy percentage over the span between `earlier` and `self`.
    ///
    /// `None` marks a degenerate pair: the total did not advance, so no rate exists.
    pub fn usage_since(&self, earlier: &CpuTimeSample) -> Option<f64> {
        let total_delta = self.total().saturating_sub(earlier.total());
        if total_delta == 0 {
            return None;
        }
        let idle_delta = self.idle().saturating_sub(earlier.idle()).min(total_delta);

        Some(100.0 * (1.0 - idle_delta as f64 / total_delta as f64))
    }
}

/// How per-round usages are folded into one figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Averaging {
    /// Divide by the rounds that produced a value. Degenerate rounds do not drag the mean down.
    #[default]
    Contributing,
    /// Divide by the requested round count, skipped rounds included. Understates usage
    /// whenever a round is skipped.
    Nominal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuUsage {
    pub percent: f64,
    pub rounds: u32,
    pub skipped: u32,
    pub averaging: Averaging,
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn sample(ticks: &[u64]) -> CpuTimeSample {
        CpuTimeSample::new(ticks.to_vec()).expect("enough categories")
    }

    #[test]
    fn test_rejects_short_lines() {
        assert!(CpuTimeSample::new(vec![1, 2, 3]).is_none());
        assert!(CpuTimeSample::new(vec![1, 2, 3, 4]).is_some());
    }

    #[test]
    fn test_deserialize_checks_idle_bucket() {
        let err = serde_json::from_str::<CpuTimeSample>(r#"{"ticks":[1]}"#).unwrap_err();
        assert!(err.to_string().contains("idle bucket"), "{err}");

        let sample: CpuTimeSample =
            serde_json::from_str(r#"{"ticks":[1,2,3,4,5]}"#).expect("valid sample");
        assert_eq!(sample.idle(), 4);
        assert_eq!(sample.total(), 15);
    }

    #[test]
    fn test_quarter_busy() {
        let a = sample(&[100, 0, 100, 600, 0, 0, 0, 0]);
        let b = sample(&[110, 0, 110, 660, 0, 0, 0, 0]);

        assert_eq!(a.total(), 800);
        assert_eq!(a.idle(), 600);
        assert_eq!(b.usage_since(&a), Some(25.0));
    }

    #[test]
    fn test_fully_idle() {
        let a = sample(&[10, 0, 10, 100, 0]);
        let b = sample(&[10, 0, 10, 150, 0]);
        assert_eq!(b.usage_since(&a), Some(0.0));
    }

    #[test]
    fn test_fully_busy() {
        let a = sample(&[10, 0, 10, 100, 0]);
        let b = sample(&[40, 5, 25, 100, 0]);
        assert_eq!(b.usage_since(&a), Some(100.0));
    }

    #[test]
    fn test_degenerate_pair() {
        let a = sample(&[10, 0, 10, 100, 3]);
        assert_eq!(a.usage_since(&a.clone()), None);
    }

    #[test]
    fn test_counter_reset_is_degenerate() {
        let a = sample(&[1000, 0, 1000, 5000]);
        let b = sample(&[1, 0, 1, 5]);
        assert_eq!(b.usage_since(&a), None);
    }

    proptest! {
        #[test]
        fn test_usage_within_bounds(
            base in prop::collection::vec(0..1_000_000u64, 4..10),
            growth in prop::collection::vec(0..1_000_000u64, 10),
        ) {
            let later: Vec<u64> = base
                .iter()
                .zip(growth.iter())
                .map(|(b, g)| b + g)
                .collect();
            let a = sample(&base);
            let b = sample(&later);

            match b.usage_since(&a) {
                Some(usage) => prop_assert!((0.0..=100.0).contains(&usage)),
                None => prop_assert_eq!(a.total(), b.total()),
            }
        }
    }
}
