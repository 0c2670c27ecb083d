use crate::{
    error::PlanResult,
    expr::{Attribute, Expr, SortOrder},
    planner::{single_child, LogicalNode, LogicalPlan, OrderPreservingUnaryNode, PlanNode, UnaryNode},
};

/// Caps the total number of rows across all partitions.
///
/// Sits above a redistribution boundary, so it makes no ordering promise.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLimit {
    pub limit_expr: Expr,
    pub child: Box<LogicalPlan>,
}

impl GlobalLimit {
    pub fn new(limit_expr: Expr, child: LogicalPlan) -> Self {
        Self { limit_expr, child: Box::new(child) }
    }
}

impl LogicalNode for GlobalLimit {
    fn node_name(&self) -> &'static str { "GlobalLimit" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { vec![&self.limit_expr] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.limit_expr.as_integer_literal() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(GlobalLimit { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        GlobalLimit { limit_expr: f(&self.limit_expr), ..self.clone() }.into()
    }
}

/// Caps the number of rows each partition emits.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalLimit {
    pub limit_expr: Expr,
    pub child: Box<LogicalPlan>,
}

impl LocalLimit {
    pub fn new(limit_expr: Expr, child: LogicalPlan) -> Self {
        Self { limit_expr, child: Box::new(child) }
    }
}

impl UnaryNode for LocalLimit {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl OrderPreservingUnaryNode for LocalLimit {}

impl LogicalNode for LocalLimit {
    fn node_name(&self) -> &'static str { "LocalLimit" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { vec![&self.limit_expr] }

    fn output(&self) -> Vec<Attribute> { self.passthrough_output() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn max_rows_per_partition(&self) -> Option<i64> { self.limit_expr.as_integer_literal() }

    fn output_ordering(&self) -> Vec<SortOrder> { self.passthrough_ordering() }

    fn is_order_preserving(&self) -> bool { true }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(LocalLimit { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        LocalLimit { limit_expr: f(&self.limit_expr), ..self.clone() }.into()
    }
}

/// `LIMIT n` as one concept, stored as `GlobalLimit(n, LocalLimit(n, child))`.
pub struct Limit;

impl Limit {
    pub fn build(limit_expr: Expr, child: LogicalPlan) -> LogicalPlan {
        let local = LogicalPlan::new(LocalLimit::new(limit_expr.clone(), child));
        LogicalPlan::new(GlobalLimit::new(limit_expr, local))
    }

    /// The limit expression and the limited child, when `plan` is a global
    /// limit over a local limit with a structurally equal expression.
    pub fn extract(plan: &LogicalPlan) -> Option<(&Expr, &LogicalPlan)> {
        let PlanNode::GlobalLimit(global) = plan.node() else {
            return None;
        };
        let PlanNode::LocalLimit(local) = global.child.node() else {
            return None;
        };
        (global.limit_expr == local.limit_expr).then_some((&global.limit_expr, local.child.as_ref()))
    }
}

/// `TAIL n`: the last `n` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Tail {
    pub limit_expr: Expr,
    pub child: Box<LogicalPlan>,
}

impl Tail {
    pub fn new(limit_expr: Expr, child: LogicalPlan) -> Self {
        Self { limit_expr, child: Box::new(child) }
    }
}

impl UnaryNode for Tail {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl OrderPreservingUnaryNode for Tail {}

impl LogicalNode for Tail {
    fn node_name(&self) -> &'static str { "Tail" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { vec![&self.limit_expr] }

    fn output(&self) -> Vec<Attribute> { self.passthrough_output() }

    fn max_rows(&self) -> Option<i64> { self.limit_expr.as_integer_literal() }

    fn output_ordering(&self) -> Vec<SortOrder> { self.passthrough_ordering() }

    fn is_order_preserving(&self) -> bool { true }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Tail { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Tail { limit_expr: f(&self.limit_expr), ..self.clone() }.into()
    }
}
