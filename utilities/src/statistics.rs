/// Mean and population standard deviation of a batch of readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    #[error("No samples to aggregate")]
    Empty,
}

impl SampleStats {
    pub fn from_samples(values: &[f64]) -> Result<Self, StatsError> {
        if values.is_empty() {
            return Err(StatsError::Empty);
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Ok(Self {
            mean,
            std_dev: variance.sqrt(),
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_std_dev() {
        let stats = SampleStats::from_samples(&[10.0, 10.2, 9.8, 10.0]).unwrap();
        assert!((stats.mean - 10.0).abs() < 1e-12);
        assert!((stats.std_dev - 0.02_f64.sqrt()).abs() < 1e-12);
        assert!((stats.std_dev - 0.1414).abs() < 1e-4);
        assert_eq!(stats.count, 4);
    }

    #[test]
    fn single_sample_has_no_spread() {
        let stats = SampleStats::from_samples(&[0.5]).unwrap();
        assert_eq!(stats.mean, 0.5);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(SampleStats::from_samples(&[]), Err(StatsError::Empty));
    }
}
