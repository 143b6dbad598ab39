use serde::Serialize;

/// Descriptive statistics of a numeric column, missing values excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for fewer than two values
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl Summary {
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted: Vec<f64> = values.into_iter().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: sorted.len(),
            mean: mean(&sorted)?,
            std: sample_std(&sorted),
            min: sorted[0],
            p25: percentile(&sorted, 25.0)?,
            median: percentile(&sorted, 50.0)?,
            p75: percentile(&sorted, 75.0)?,
            max: sorted[sorted.len() - 1],
        })
    }

    pub fn describe(&self) -> String {
        format!(
            "Mean: {:.2}, Median: {:.2}, Std: {}, Min: {:.2}, Max: {:.2}",
            self.mean,
            self.median,
            self.std.map_or("undefined".to_string(), |s| format!("{:.2}", s)),
            self.min,
            self.max
        )
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    ratio(values.iter().sum(), values.len() as f64)
}

/// Standard deviation with one degree of freedom removed.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((squares / (values.len() - 1) as f64).sqrt())
}

/// Linear interpolation between closest ranks; `sorted` must be ascending
/// and `q` in [0, 100].
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// `numerator / denominator`, undefined when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}
