use ordered_float::OrderedFloat;
use tracing::debug;

use crate::{
    error::{PlanError, PlanResult},
    expr::{Attribute, Expr},
    planner::{single_child, LogicalNode, LogicalPlan, PlanNode},
};

/// Slack allowed on the sampling fraction bounds.
const RANDOM_SAMPLE_EPSILON: f64 = 1e-6;

/// Keeps the rows whose random draw falls in `[lower_bound, upper_bound)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub lower_bound: OrderedFloat<f64>,
    pub upper_bound: OrderedFloat<f64>,
    pub with_replacement: bool,
    pub seed: i64,
    pub child: Box<LogicalPlan>,
}

impl Sample {
    pub fn new(
        lower_bound: f64,
        upper_bound: f64,
        with_replacement: bool,
        seed: i64,
        child: LogicalPlan,
    ) -> PlanResult<Self> {
        let fraction = upper_bound - lower_bound;
        if with_replacement {
            if fraction.is_nan() || fraction < -RANDOM_SAMPLE_EPSILON {
                debug!(fraction, "rejecting sample with negative fraction");
                return Err(PlanError::NegativeSampleFraction { fraction });
            }
        } else if !(-RANDOM_SAMPLE_EPSILON..=1.0 + RANDOM_SAMPLE_EPSILON).contains(&fraction) {
            debug!(fraction, "rejecting sample fraction outside [0, 1]");
            return Err(PlanError::SampleFractionOutOfRange { fraction });
        }
        Ok(Self {
            lower_bound: OrderedFloat(lower_bound),
            upper_bound: OrderedFloat(upper_bound),
            with_replacement,
            seed,
            child: Box::new(child),
        })
    }

    pub fn fraction(&self) -> f64 {
        (self.upper_bound - self.lower_bound).into_inner()
    }
}

impl LogicalNode for Sample {
    fn node_name(&self) -> &'static str { "Sample" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Sample { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}
