use std::fmt;
use std::sync::Arc;

/// Plain reductions over a slice of samples. Empty input yields NaN.
pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Population variance (ddof = 0).
    pub fn variance(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        let mean = Self::mean(samples);
        samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64
    }

    pub fn std(samples: &[f64]) -> f64 {
        Self::variance(samples).sqrt()
    }

    /// Median; even-sized inputs average the two central values.
    pub fn median(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            0.5 * (sorted[mid - 1] + sorted[mid])
        } else {
            sorted[mid]
        }
    }

    pub fn max(samples: &[f64]) -> f64 {
        samples.iter().copied().reduce(f64::max).unwrap_or(f64::NAN)
    }

    pub fn sum(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return f64::NAN;
        }
        samples.iter().sum()
    }
}

/// Caller-supplied pure reduction used by [`Statistic::Custom`].
pub trait Reducer: Send + Sync {
    fn reduce(&self, samples: &[f64]) -> f64;
}

impl<F> Reducer for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn reduce(&self, samples: &[f64]) -> f64 {
        self(samples)
    }
}

/// A named user reduction.
#[derive(Clone)]
pub struct CustomStatistic {
    name: String,
    reducer: Arc<dyn Reducer>,
}

impl fmt::Debug for CustomStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomStatistic")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Aggregation applied to the samples falling in one bin.
#[derive(Debug, Clone, Default)]
pub enum Statistic {
    #[default]
    Mean,
    Std,
    Median,
    Variance,
    Max,
    Sum,
    /// Bin population.
    Size,
    Custom(CustomStatistic),
}

impl Statistic {
    pub fn custom(name: impl Into<String>, reducer: impl Reducer + 'static) -> Self {
        Statistic::Custom(CustomStatistic {
            name: name.into(),
            reducer: Arc::new(reducer),
        })
    }

    /// Key under which results for this statistic are reported.
    pub fn name(&self) -> &str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Std => "std",
            Statistic::Median => "median",
            Statistic::Variance => "variance",
            Statistic::Max => "max",
            Statistic::Sum => "sum",
            Statistic::Size => "size",
            Statistic::Custom(custom) => &custom.name,
        }
    }

    /// The closed set computed together by multi-statistic profiles.
    pub fn profile_set() -> [Statistic; 7] {
        [
            Statistic::Mean,
            Statistic::Std,
            Statistic::Median,
            Statistic::Variance,
            Statistic::Max,
            Statistic::Sum,
            Statistic::Size,
        ]
    }

    /// Empty bins reduce to NaN, except `Size` which counts zero. Custom
    /// reducers are never called on an empty slice.
    pub fn reduce(&self, samples: &[f64]) -> f64 {
        match self {
            Statistic::Mean => StatsHelper::mean(samples),
            Statistic::Std => StatsHelper::std(samples),
            Statistic::Median => StatsHelper::median(samples),
            Statistic::Variance => StatsHelper::variance(samples),
            Statistic::Max => StatsHelper::max(samples),
            Statistic::Sum => StatsHelper::sum(samples),
            Statistic::Size => samples.len() as f64,
            Statistic::Custom(custom) => {
                if samples.is_empty() {
                    f64::NAN
                } else {
                    custom.reducer.reduce(samples)
                }
            }
        }
    }
}
