use crate::{
    error::PlanResult,
    expr::{Attribute, Expr, PredicateHelper, SortOrder},
    planner::{
        single_child, ConstraintSet, LogicalNode, LogicalPlan, OrderPreservingUnaryNode, PlanNode, UnaryNode,
    },
};

/// `WHERE` / `HAVING`: keeps the rows for which `condition` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub condition: Expr,
    pub child: Box<LogicalPlan>,
}

impl Filter {
    pub fn new(condition: Expr, child: LogicalPlan) -> Self {
        Self { condition, child: Box::new(child) }
    }
}

impl PredicateHelper for Filter {}

impl UnaryNode for Filter {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl OrderPreservingUnaryNode for Filter {}

impl LogicalNode for Filter {
    fn node_name(&self) -> &'static str { "Filter" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { vec![&self.condition] }

    fn output(&self) -> Vec<Attribute> { self.passthrough_output() }

    /// Conjuncts with a correlated subquery depend on the outer row and are skipped.
    fn valid_constraints(&self) -> ConstraintSet {
        let predicates = Self::split_conjunctive_predicates(&self.condition)
            .into_iter()
            .filter(|p| !p.has_correlated_subquery());
        self.child.constraints().union(&predicates.collect())
    }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn output_ordering(&self) -> Vec<SortOrder> { self.passthrough_ordering() }

    fn is_order_preserving(&self) -> bool { true }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Filter { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Filter { condition: f(&self.condition), ..self.clone() }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::{SubqueryExpr, SubqueryKind},
        planner::_tests::fixtures::*,
    };

    #[test]
    fn conjuncts_become_constraints() {
        let (a, b) = (col("a"), col("b"));
        let plan = filter(e(&a).gt(lit_i(1)).and(e(&b).lt(lit_i(5))), relation(&[&a, &b]));
        let constraints = plan.constraints();
        assert!(constraints.contains(&e(&a).gt(lit_i(1))));
        assert!(constraints.contains(&e(&b).lt(lit_i(5))));
        assert!(constraints.contains(&e(&a).is_not_null()));
        assert!(constraints.contains(&e(&b).is_not_null()));
        assert_eq!(constraints.len(), 4);
    }

    #[test]
    fn equality_propagates_through_filters() {
        let (a, b) = (col("a"), col("b"));
        let plan = filter(e(&a).eq(e(&b)).and(e(&a).gt(lit_i(3))), relation(&[&a, &b]));
        assert!(plan.constraints().contains(&e(&b).gt(lit_i(3))));
    }

    #[test]
    fn correlated_subquery_conjuncts_are_skipped() {
        let (a, outer) = (col("a"), col("outer"));
        let sub = Expr::Subquery(SubqueryExpr::new(relation(&[&col("x")]), SubqueryKind::Exists, vec![e(&outer)]));
        let plan = filter(sub.and(e(&a).gt(lit_i(0))), relation(&[&a]));
        let valid = plan.valid_constraints();
        assert_eq!(valid.len(), 1);
        assert!(valid.contains(&e(&a).gt(lit_i(0))));
    }

    #[test]
    fn filter_keeps_child_output_and_ordering() {
        let a = col("a");
        let child = sort(vec![SortOrder::asc(e(&a))], relation(&[&a]));
        let plan = filter(e(&a).gt(lit_i(0)), child.clone());
        assert_eq!(plan.output(), child.output());
        assert_eq!(plan.output_ordering(), child.output_ordering());
    }
}
