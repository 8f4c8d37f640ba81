use chrono::{DateTime, Utc};
use hepneat_fitness::{config::FitnessConfig, network::SigmoidPerceptron};
use serde::{Deserialize, Serialize};

/// Result of scoring one set of candidate networks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoreReport {
    pub scored_at: DateTime<Utc>,
    pub metric: String,
    pub config: FitnessConfig,
    pub winner: SigmoidPerceptron,
    pub winner_fitness: f64,
    /// Fitness of every network, best first.
    pub fitness: Vec<f64>,
}
