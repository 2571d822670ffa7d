pub mod config;
pub mod instructor;
pub mod plan;
pub mod render;
pub mod strategy;

pub use config::{build_config, ChartConfig, ConfigError};
pub use plan::{ChartKind, ChartPlan};
pub use strategy::{
    ChartStrategy, HeuristicStrategy, ModelAssistedStrategy, PlanContext, SuggestionSetStrategy,
};
