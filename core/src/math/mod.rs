pub mod fft;
pub mod stats;

pub use fft::Fft2d;
pub use stats::{CustomStatistic, Reducer, Statistic, StatsHelper};
