use crate::{
    error::PlanResult,
    expr::{Attribute, AttributeSet, Expr, SortOrder},
    planner::{map_all, single_child, ConstraintSet, LogicalNode, LogicalPlan, PlanNode, UnaryNode},
};

/// `GROUP BY`: one output row per group, one column per aggregate-list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub grouping_expressions: Vec<Expr>,
    pub aggregate_expressions: Vec<Expr>,
    pub child: Box<LogicalPlan>,
}

impl Aggregate {
    pub fn new(grouping_expressions: Vec<Expr>, aggregate_expressions: Vec<Expr>, child: LogicalPlan) -> Self {
        Self { grouping_expressions, aggregate_expressions, child: Box::new(child) }
    }
}

impl UnaryNode for Aggregate {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl LogicalNode for Aggregate {
    fn node_name(&self) -> &'static str { "Aggregate" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> {
        self.grouping_expressions.iter().chain(&self.aggregate_expressions).collect()
    }

    fn output(&self) -> Vec<Attribute> {
        self.aggregate_expressions.iter().filter_map(Expr::to_attribute).collect()
    }

    /// Window functions over an aggregate need a separate `Window` on top.
    fn resolved(&self) -> bool {
        self.expressions().iter().all(|e| e.resolved())
            && self.aggregate_expressions.iter().all(Expr::is_named)
            && self.child.resolved()
            && !self.aggregate_expressions.iter().any(Expr::contains_window)
    }

    /// Only grouping-side entries can be restated per row.
    fn valid_constraints(&self) -> ConstraintSet {
        let non_aggregate: Vec<Expr> =
            self.aggregate_expressions.iter().filter(|e| !e.contains_aggregate()).cloned().collect();
        self.aliased_constraints(&non_aggregate)
    }

    fn max_rows(&self) -> Option<i64> {
        if self.grouping_expressions.is_empty() { Some(1) } else { self.child.max_rows() }
    }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Aggregate { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Aggregate {
            grouping_expressions: map_all(f, &self.grouping_expressions),
            aggregate_expressions: map_all(f, &self.aggregate_expressions),
            ..self.clone()
        }
        .into()
    }
}

/// Window functions evaluated over a shared partitioning and ordering; the
/// results are appended to the child's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub window_expressions: Vec<Expr>,
    pub partition_spec: Vec<Expr>,
    pub order_spec: Vec<SortOrder>,
    pub child: Box<LogicalPlan>,
}

impl Window {
    pub fn new(
        window_expressions: Vec<Expr>,
        partition_spec: Vec<Expr>,
        order_spec: Vec<SortOrder>,
        child: LogicalPlan,
    ) -> Self {
        Self { window_expressions, partition_spec, order_spec, child: Box::new(child) }
    }

    pub fn window_output_set(&self) -> AttributeSet {
        self.window_expressions.iter().filter_map(Expr::to_attribute).collect()
    }
}

impl UnaryNode for Window {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl LogicalNode for Window {
    fn node_name(&self) -> &'static str { "Window" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> {
        self.window_expressions
            .iter()
            .chain(&self.partition_spec)
            .chain(self.order_spec.iter().map(|o| o.child.as_ref()))
            .collect()
    }

    fn output(&self) -> Vec<Attribute> {
        let mut out = self.child.output().to_vec();
        out.extend(self.window_expressions.iter().filter_map(Expr::to_attribute));
        out
    }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn produced_attributes(&self) -> AttributeSet { self.window_output_set() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Window { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        let order_spec = self
            .order_spec
            .iter()
            .map(|o| SortOrder { child: Box::new(f(&o.child)), ..o.clone() })
            .collect();
        Window {
            window_expressions: map_all(f, &self.window_expressions),
            partition_spec: map_all(f, &self.partition_spec),
            order_spec,
            ..self.clone()
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::WindowSpec, planner::_tests::fixtures::*, types::DataType};

    fn sum(a: &Attribute) -> Expr {
        Expr::agg("sum", vec![e(a)], DataType::Long)
    }

    #[test]
    fn aggregate_output_and_bounds() {
        let (k, v) = (col("k"), col("v"));
        let grouped = aggregate(vec![e(&k)], vec![e(&k), sum(&v).alias("total")], bounded(&[&k, &v], 8));
        let names: Vec<_> = grouped.output().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["k", "total"]);
        assert_eq!(grouped.max_rows(), Some(8));
        assert!(grouped.resolved());

        let global = aggregate(vec![], vec![sum(&v).alias("total")], relation(&[&k, &v]));
        assert_eq!(global.max_rows(), Some(1));
    }

    #[test]
    fn window_in_aggregate_list_is_unresolved() {
        let (k, v) = (col("k"), col("v"));
        let win = Expr::Window { function: Box::new(sum(&v)), spec: WindowSpec::default() };
        let plan = aggregate(vec![e(&k)], vec![e(&k), win.alias("w")], relation(&[&k, &v]));
        assert!(!plan.resolved());
    }

    #[test]
    fn constraints_come_from_grouping_side_entries() {
        let (k, v) = (col("k"), col("v"));
        let child = filter(e(&k).gt(lit_i(0)).and(e(&v).gt(lit_i(0))), relation(&[&k, &v]));
        let plan = aggregate(vec![e(&k)], vec![e(&k), e(&k).alias("k2"), sum(&v).alias("total")], child);
        let k2 = plan.output()[1].clone();
        let total = plan.output()[2].clone();
        let constraints = plan.constraints();
        assert!(constraints.contains(&e(&k).gt(lit_i(0))));
        assert!(constraints.contains(&e(&k2).gt(lit_i(0))));
        assert!(constraints.iter().all(|c| !c.references().contains(&total)));
        assert!(constraints.iter().all(|c| !c.references().contains(&v)));
    }

    #[test]
    fn window_appends_its_columns() {
        let (k, v) = (col("k"), col("v"));
        let rank = Expr::Window {
            function: Box::new(Expr::agg("rank", vec![], DataType::Integer)),
            spec: WindowSpec::new(vec![e(&k)], vec![SortOrder::asc(e(&v))]),
        };
        let plan = LogicalPlan::new(Window::new(
            vec![rank.alias("r")],
            vec![e(&k)],
            vec![SortOrder::asc(e(&v))],
            bounded(&[&k, &v], 4),
        ));
        assert_eq!(plan.output().len(), 3);
        let r = plan.output()[2].clone();
        assert!(plan.produced_attributes().contains(&r));
        assert!(plan.missing_input().is_empty());
        assert_eq!(plan.max_rows(), Some(4));
    }
}
