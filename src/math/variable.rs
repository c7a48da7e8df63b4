use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Uniform};

use crate::error::{Error, Result};

/// Per-period traffic-growth factor generator.
///
/// Draws from a log-normal distribution moment-matched so that the sample
/// mean equals `mean` and the sample standard deviation equals `std_dev`
/// (sigma^2 = ln(1 + S^2/M^2), mu = ln M - sigma^2/2). Growth factors stay
/// strictly positive. A zero standard deviation (or a zero mean) degenerates
/// to the constant `mean`.
#[derive(Debug, Clone)]
pub struct GrowthVariable {
    rng: ChaCha8Rng,
    dist: Option<LogNormal<f64>>,
    mean: f64,
    current: f64,
}

impl GrowthVariable {
    pub fn new(seed: u64, mean: f64, std_dev: f64) -> Result<Self> {
        if mean < 0.0 {
            return Err(Error::InvalidArgument("growth mean must be non-negative".to_string()));
        }
        if std_dev < 0.0 {
            return Err(Error::InvalidArgument(
                "growth standard deviation must be non-negative".to_string(),
            ));
        }

        let dist = if mean == 0.0 || std_dev == 0.0 {
            None
        } else {
            let sigma_sq = (1.0 + (std_dev * std_dev) / (mean * mean)).ln();
            let sigma = sigma_sq.sqrt();
            let mu = mean.ln() - sigma_sq / 2.0;
            Some(
                LogNormal::new(mu, sigma)
                    .map_err(|e| Error::InvalidArgument(format!("bad growth parameters: {}", e)))?,
            )
        };

        Ok(GrowthVariable { rng: ChaCha8Rng::seed_from_u64(seed), dist, mean, current: mean })
    }

    pub fn next_value(&mut self) -> f64 {
        self.current = match &self.dist {
            Some(dist) => dist.sample(&mut self.rng),
            None => self.mean,
        };
        self.current
    }

    /// The factor produced by the most recent `next_value` call.
    pub fn current_value(&self) -> f64 {
        self.current
    }
}

/// Seeded uniform variable on `[low, high)`.
#[derive(Debug, Clone)]
pub struct UniformVariable {
    rng: ChaCha8Rng,
    dist: Uniform<f64>,
}

impl UniformVariable {
    pub fn new(seed: u64, low: f64, high: f64) -> Result<Self> {
        let dist = Uniform::new(low, high)
            .map_err(|e| Error::InvalidArgument(format!("bad uniform bounds: {}", e)))?;
        Ok(UniformVariable { rng: ChaCha8Rng::seed_from_u64(seed), dist })
    }

    pub fn next_value(&mut self) -> f64 {
        self.dist.sample(&mut self.rng)
    }
}
