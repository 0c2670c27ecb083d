use crate::{
    error::PlanResult,
    expr::{Attribute, Expr, SortOrder},
    planner::{single_child, LogicalNode, LogicalPlan, PlanNode, UnaryNode},
};

/// `ORDER BY` when `global`, otherwise a sort within each partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub order: Vec<SortOrder>,
    pub global: bool,
    pub child: Box<LogicalPlan>,
}

impl Sort {
    pub fn new(order: Vec<SortOrder>, global: bool, child: LogicalPlan) -> Self {
        Self { order, global, child: Box::new(child) }
    }
}

impl UnaryNode for Sort {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl LogicalNode for Sort {
    fn node_name(&self) -> &'static str { "Sort" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { self.order.iter().map(|o| o.child.as_ref()).collect() }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn output_ordering(&self) -> Vec<SortOrder> { self.order.clone() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Sort { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        let order = self
            .order
            .iter()
            .map(|o| SortOrder { child: Box::new(f(&o.child)), ..o.clone() })
            .collect();
        Sort { order, ..self.clone() }.into()
    }
}
