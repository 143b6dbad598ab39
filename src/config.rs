use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    DEFAULT_COMMISSION_RATE, DEFAULT_DETRACTOR_THRESHOLD, DEFAULT_PROMOTER_THRESHOLD,
    DEFAULT_RESTAURANT_MIN_ORDERS, ENV_PREFIX, LOWER_TIER_RATE, LOWER_TIER_THRESHOLD,
    UPPER_TIER_RATE, UPPER_TIER_THRESHOLD,
};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use validator::Validate;

/// A commission tier applies to costs strictly above `above`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub above: f64,
    pub rate: f64,
}

/// How the platform's revenue is taken from each order's cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CommissionPolicy {
    Flat { rate: f64 },
    Tiered { tiers: Vec<CommissionTier> },
}

impl CommissionPolicy {
    pub fn flat(rate: f64) -> Self {
        CommissionPolicy::Flat { rate }
    }

    /// 25% of orders above $20, 15% of orders above $5, nothing below.
    pub fn standard_tiers() -> Self {
        CommissionPolicy::Tiered {
            tiers: vec![
                CommissionTier {
                    above: UPPER_TIER_THRESHOLD,
                    rate: UPPER_TIER_RATE,
                },
                CommissionTier {
                    above: LOWER_TIER_THRESHOLD,
                    rate: LOWER_TIER_RATE,
                },
            ],
        }
    }

    pub fn commission(&self, cost: f64) -> f64 {
        match self {
            CommissionPolicy::Flat { rate } => cost * rate,
            CommissionPolicy::Tiered { tiers } => tiers
                .iter()
                .filter(|tier| cost > tier.above)
                .max_by(|a, b| a.above.total_cmp(&b.above))
                .map_or(0.0, |tier| cost * tier.rate),
        }
    }

    fn rates(&self) -> Vec<f64> {
        match self {
            CommissionPolicy::Flat { rate } => vec![*rate],
            CommissionPolicy::Tiered { tiers } => tiers.iter().map(|t| t.rate).collect(),
        }
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        CommissionPolicy::flat(DEFAULT_COMMISSION_RATE)
    }
}

/// Constants the metrics engine needs, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricsConfig {
    pub commission: CommissionPolicy,

    /// Fixed costs subtracted from total revenue to get net revenue
    #[validate(range(min = 0.0))]
    pub operating_costs: f64,

    /// Ratings at or above this count as promoters
    #[validate(range(min = 1, max = 5))]
    pub promoter_threshold: u32,

    /// Ratings at or below this count as detractors
    #[validate(range(min = 1, max = 5))]
    pub detractor_threshold: u32,

    /// Extra percentiles reported for completion time, in [0, 100]
    pub completion_percentiles: Vec<f64>,

    /// Restaurants need strictly more orders than this to be ranked
    pub restaurant_min_orders: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            commission: CommissionPolicy::default(),
            operating_costs: 0.0,
            promoter_threshold: DEFAULT_PROMOTER_THRESHOLD,
            detractor_threshold: DEFAULT_DETRACTOR_THRESHOLD,
            completion_percentiles: vec![90.0],
            restaurant_min_orders: DEFAULT_RESTAURANT_MIN_ORDERS,
        }
    }
}

impl MetricsConfig {
    pub fn with_commission(mut self, commission: CommissionPolicy) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_operating_costs(mut self, operating_costs: f64) -> Self {
        self.operating_costs = operating_costs;
        self
    }

    pub fn with_nps_thresholds(mut self, promoter: u32, detractor: u32) -> Self {
        self.promoter_threshold = promoter;
        self.detractor_threshold = detractor;
        self
    }

    /// Layer defaults, an optional TOML file and `FOODHUB__*` environment
    /// variables, then validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_layered(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn load_layered(path: Option<&Path>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&MetricsConfig::default())?);

        if let Some(path) = path {
            info!("Loading metrics configuration from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(environment);

        let config: MetricsConfig = builder.build()?.try_deserialize()?;
        config.check()?;
        debug!(?config, "Metrics configuration resolved");

        Ok(config)
    }

    /// Field ranges plus the cross-field rules the derive cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        if !self.operating_costs.is_finite() {
            return Err(ProcessingError::Config(format!(
                "Operating costs must be a finite amount, got {}",
                self.operating_costs
            )));
        }

        if let CommissionPolicy::Tiered { tiers } = &self.commission {
            if let Some(tier) = tiers.iter().find(|t| !t.above.is_finite()) {
                return Err(ProcessingError::Config(format!(
                    "Commission tier threshold {} is not a finite amount",
                    tier.above
                )));
            }
        }

        for rate in self.commission.rates() {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ProcessingError::Config(format!(
                    "Commission rate {} is outside [0, 1]",
                    rate
                )));
            }
        }

        if self.detractor_threshold >= self.promoter_threshold {
            return Err(ProcessingError::Config(format!(
                "Detractor threshold {} must be below promoter threshold {}",
                self.detractor_threshold, self.promoter_threshold
            )));
        }

        if let Some(p) = self
            .completion_percentiles
            .iter()
            .find(|p| !(0.0..=100.0).contains(*p))
        {
            return Err(ProcessingError::Config(format!(
                "Percentile {} is outside [0, 100]",
                p
            )));
        }

        Ok(())
    }
}
