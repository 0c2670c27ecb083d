pub mod types;

pub mod error;
pub use error::{PlanError, PlanResult};

pub mod config;
pub use config::PlanConf;

pub mod catalog;

pub mod expr;

pub mod planner;
pub use planner::{LogicalPlan, PlanBuilder, PlanNode};
