use std::fmt;

use crate::{
    catalog::CatalogStorageFormat,
    error::PlanResult,
    expr::{Attribute, Expr, SortOrder},
    planner::{map_all, single_child, ConstraintSet, LogicalNode, LogicalPlan, OrderPreservingUnaryNode, PlanNode, UnaryNode},
};

/// A join strategy requested by the query, e.g. `broadcast`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HintInfo {
    pub strategy: Option<String>,
}

impl HintInfo {
    pub fn strategy(strategy: impl Into<String>) -> Self {
        Self { strategy: Some(strategy.into()) }
    }
}

impl fmt::Display for HintInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.strategy {
            Some(s) => write!(f, "(strategy={s})"),
            None => write!(f, "none"),
        }
    }
}

/// A hint that has been matched to the relation it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHint {
    pub hints: HintInfo,
    pub child: Box<LogicalPlan>,
}

impl ResolvedHint {
    pub fn new(hints: HintInfo, child: LogicalPlan) -> Self {
        Self { hints, child: Box::new(child) }
    }
}

impl UnaryNode for ResolvedHint {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl OrderPreservingUnaryNode for ResolvedHint {}

impl LogicalNode for ResolvedHint {
    fn node_name(&self) -> &'static str { "ResolvedHint" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.passthrough_output() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn output_ordering(&self) -> Vec<SortOrder> { self.passthrough_ordering() }

    fn is_order_preserving(&self) -> bool { true }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(ResolvedHint { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// Named aggregate metrics observed while rows flow through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectMetrics {
    pub name: String,
    pub metrics: Vec<Expr>,
    pub child: Box<LogicalPlan>,
}

impl CollectMetrics {
    pub fn new(name: impl Into<String>, metrics: Vec<Expr>, child: LogicalPlan) -> Self {
        Self { name: name.into(), metrics, child: Box::new(child) }
    }
}

impl LogicalNode for CollectMetrics {
    fn node_name(&self) -> &'static str { "CollectMetrics" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { self.metrics.iter().collect() }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn resolved(&self) -> bool {
        !self.name.is_empty()
            && !self.metrics.is_empty()
            && self.metrics.iter().all(Expr::resolved)
            && self.child.resolved()
    }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(CollectMetrics { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        CollectMetrics { metrics: map_all(f, &self.metrics), ..self.clone() }.into()
    }
}

/// `INSERT OVERWRITE [LOCAL] DIRECTORY`. Replaced by a write command before
/// planning finishes, so it never reports itself resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertIntoDir {
    pub is_local: bool,
    pub storage: CatalogStorageFormat,
    pub provider: Option<String>,
    pub overwrite: bool,
    pub child: Box<LogicalPlan>,
}

impl InsertIntoDir {
    pub fn new(
        is_local: bool,
        storage: CatalogStorageFormat,
        provider: Option<String>,
        overwrite: bool,
        child: LogicalPlan,
    ) -> Self {
        Self { is_local, storage, provider, overwrite, child: Box::new(child) }
    }
}

impl LogicalNode for InsertIntoDir {
    fn node_name(&self) -> &'static str { "InsertIntoDir" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { vec![] }

    fn resolved(&self) -> bool { false }

    fn valid_constraints(&self) -> ConstraintSet { ConstraintSet::new() }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(InsertIntoDir { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{planner::_tests::fixtures::*, types::DataType};

    #[test]
    fn hint_is_transparent() {
        let a = col("a");
        let child = sort(vec![SortOrder::asc(e(&a))], bounded(&[&a], 3));
        let plan = LogicalPlan::new(ResolvedHint::new(HintInfo::strategy("broadcast"), child.clone()));
        assert_eq!(plan.output(), child.output());
        assert_eq!(plan.output_ordering(), child.output_ordering());
        assert_eq!(plan.max_rows(), Some(3));
        assert_eq!(HintInfo::strategy("broadcast").to_string(), "(strategy=broadcast)");
    }

    #[test]
    fn collect_metrics_needs_a_name_and_metrics() {
        let a = col("a");
        let count = Expr::agg("count", vec![e(&a)], DataType::Long).alias("n");
        let ok = LogicalPlan::new(CollectMetrics::new("m", vec![count.clone()], relation(&[&a])));
        assert!(ok.resolved());
        assert!(!LogicalPlan::new(CollectMetrics::new("", vec![count], relation(&[&a]))).resolved());
        assert!(!LogicalPlan::new(CollectMetrics::new("m", vec![], relation(&[&a]))).resolved());
    }

    #[test]
    fn insert_into_dir_has_no_output() {
        let a = col("a");
        let child = filter(e(&a).gt(lit_i(0)), relation(&[&a]));
        let plan = LogicalPlan::new(InsertIntoDir::new(false, CatalogStorageFormat::default(), None, true, child));
        assert!(plan.output().is_empty());
        assert!(!plan.resolved());
        assert!(plan.constraints().is_empty());
    }
}
