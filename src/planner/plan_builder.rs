use crate::{
    config::PlanConf,
    error::PlanResult,
    expr::{Attribute, Expr, Literal, SortOrder},
    planner::{
        Aggregate, Distinct, Except, Expand, Filter, GroupingId, Intersect, Join, JoinType, Limit, LocalRelation,
        LogicalPlan, OneRowRelation, PlanNode, Project, Range, RepartitionByExpression, Sort, SubqueryAlias, Union,
    },
};

/// Fluent construction of plan trees, bottom-up:
///
/// ```ignore
/// let plan = PlanBuilder::scan(vec![a.clone(), b.clone()])
///     .filter(Expr::attr(&a).gt(Expr::lit(Literal::int(3))))
///     .project(vec![Expr::attr(&b)])
///     .limit(10)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    plan: LogicalPlan,
}

impl From<LogicalPlan> for PlanBuilder {
    fn from(plan: LogicalPlan) -> Self {
        Self { plan }
    }
}

impl PlanBuilder {
    /// A source of unknown size exposing `output`.
    pub fn scan(output: Vec<Attribute>) -> Self {
        LogicalPlan::new(LocalRelation::unbounded(output)).into()
    }

    pub fn values(output: Vec<Attribute>, num_rows: usize) -> Self {
        LogicalPlan::new(LocalRelation::new(output, num_rows)).into()
    }

    pub fn one_row() -> Self {
        LogicalPlan::new(OneRowRelation).into()
    }

    pub fn range(start: i64, end: i64, step: i64) -> PlanResult<Self> {
        Ok(LogicalPlan::new(Range::new(start, end, step, None)?).into())
    }

    pub fn plan(&self) -> &LogicalPlan {
        &self.plan
    }

    pub fn output(&self) -> &[Attribute] {
        self.plan.output()
    }

    pub fn filter(self, condition: Expr) -> Self {
        LogicalPlan::new(Filter::new(condition, self.plan)).into()
    }

    pub fn project(self, project_list: Vec<Expr>) -> Self {
        LogicalPlan::new(Project::new(project_list, self.plan)).into()
    }

    pub fn join(self, right: impl Into<PlanBuilder>, join_type: JoinType, condition: Option<Expr>) -> Self {
        LogicalPlan::new(Join::new(self.plan, right.into().plan, join_type, condition)).into()
    }

    pub fn aggregate(self, grouping_expressions: Vec<Expr>, aggregate_expressions: Vec<Expr>) -> Self {
        LogicalPlan::new(Aggregate::new(grouping_expressions, aggregate_expressions, self.plan)).into()
    }

    /// `GROUP BY GROUPING SETS`: an `Expand` under an `Aggregate` that groups
    /// by the expanded columns and the grouping id.
    ///
    /// `group_by` names child columns; every set must be a subset of it. The
    /// aggregate groups by every column the `Expand` adds.
    pub fn grouping_sets(
        self,
        grouping_sets: &[Vec<Attribute>],
        group_by: &[Attribute],
        aggregate_expressions: Vec<Expr>,
        conf: &PlanConf,
    ) -> PlanResult<Self> {
        let child_width = self.plan.output().len();
        let expand = Expand::from_grouping_sets(grouping_sets, vec![], group_by, GroupingId::attribute(conf), self.plan)?;
        let expanded = LogicalPlan::new(expand);
        let grouping_expressions: Vec<Expr> = expanded.output()[child_width..].iter().map(Expr::attr).collect();
        Ok(LogicalPlan::new(Aggregate::new(grouping_expressions, aggregate_expressions, expanded)).into())
    }

    pub fn sort(self, order: Vec<SortOrder>) -> Self {
        LogicalPlan::new(Sort::new(order, true, self.plan)).into()
    }

    pub fn sort_within_partitions(self, order: Vec<SortOrder>) -> Self {
        LogicalPlan::new(Sort::new(order, false, self.plan)).into()
    }

    pub fn limit(self, n: i32) -> Self {
        Limit::build(Expr::lit(Literal::int(n)), self.plan).into()
    }

    pub fn union(self, other: impl Into<PlanBuilder>) -> Self {
        let mut children = match self.plan.into_node() {
            PlanNode::Union(u) if !u.by_name && !u.allow_missing_col => u.children,
            node => vec![LogicalPlan::new(node)],
        };
        children.push(other.into().plan);
        LogicalPlan::new(Union::new(children)).into()
    }

    pub fn intersect(self, other: impl Into<PlanBuilder>, is_all: bool) -> Self {
        LogicalPlan::new(Intersect::new(self.plan, other.into().plan, is_all)).into()
    }

    pub fn except(self, other: impl Into<PlanBuilder>, is_all: bool) -> Self {
        LogicalPlan::new(Except::new(self.plan, other.into().plan, is_all)).into()
    }

    pub fn distinct(self) -> Self {
        LogicalPlan::new(Distinct::new(self.plan)).into()
    }

    pub fn repartition(self, partition_expressions: Vec<Expr>, conf: &PlanConf) -> PlanResult<Self> {
        Ok(LogicalPlan::new(RepartitionByExpression::new(partition_expressions, None, self.plan, conf)?).into())
    }

    pub fn alias(self, name: impl Into<String>) -> Self {
        LogicalPlan::new(SubqueryAlias::new(name, self.plan)).into()
    }

    pub fn build(self) -> LogicalPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{planner::_tests::fixtures::*, types::DataType};

    #[test]
    fn builds_bottom_up() {
        let (a, b) = (col("a"), col("b"));
        let plan = PlanBuilder::scan(vec![a.clone(), b.clone()])
            .filter(e(&a).gt(lit_i(3)))
            .project(vec![e(&b)])
            .sort(vec![SortOrder::asc(e(&b))])
            .limit(10)
            .build();
        let names: Vec<_> = plan.collect_nodes(&|_| true).iter().map(|p| p.node_name()).collect();
        assert_eq!(names, ["GlobalLimit", "LocalLimit", "Sort", "Project", "Filter", "LocalRelation"]);
        assert_eq!(plan.output(), &[b]);
        assert_eq!(plan.max_rows(), Some(10));
        assert!(plan.resolved());
    }

    #[test]
    fn unions_flatten() {
        let (a, b, c) = (col("a"), col("b"), col("c"));
        let plan = PlanBuilder::scan(vec![a]).union(relation(&[&b])).union(relation(&[&c])).build();
        let PlanNode::Union(union) = plan.node() else { panic!("expected a union, got {plan:?}") };
        assert_eq!(union.children.len(), 3);
    }

    #[test]
    fn join_then_alias() {
        let (a, b) = (col("a"), col("b"));
        let plan = PlanBuilder::values(vec![a.clone()], 2)
            .join(bounded(&[&b], 3), JoinType::Inner, Some(e(&a).eq(e(&b))))
            .alias("j")
            .build();
        assert_eq!(plan.output().len(), 2);
        assert!(plan.output().iter().all(|o| o.qualifier == ["j"]));
        assert_eq!(plan.max_rows(), Some(6));
    }

    #[test]
    fn grouping_sets_aggregate_over_expand() {
        let (k1, k2, v) = (col("k1"), col("k2"), col("v"));
        let total = Expr::agg("sum", vec![e(&v)], DataType::Long).alias("total");
        let plan = PlanBuilder::values(vec![k1.clone(), k2.clone(), v.clone()], 4)
            .grouping_sets(&[vec![k1.clone(), k2.clone()], vec![k1.clone()], vec![]], &[k1, k2], vec![total], &PlanConf::new())
            .unwrap()
            .build();
        let PlanNode::Aggregate(agg) = plan.node() else { panic!("expected an aggregate, got {plan:?}") };
        assert_eq!(agg.grouping_expressions.len(), 3);
        let expand = plan.children()[0];
        assert_eq!(expand.node_name(), "Expand");
        assert_eq!(expand.max_rows(), Some(12));
        assert_eq!(
            agg.grouping_expressions.last().and_then(Expr::name),
            Some(GroupingId::NAME)
        );
    }

    #[test]
    fn range_and_partitioning_propagate_errors() {
        assert!(PlanBuilder::range(0, 10, 0).is_err());
        let built = PlanBuilder::range(0, 10, 2).unwrap();
        assert_eq!(built.plan().max_rows(), Some(5));
        let id = built.output()[0].clone();
        assert!(built.clone().repartition(vec![Expr::attr(&id)], &PlanConf::new().with_shuffle_partitions(0)).is_err());
        let one = PlanBuilder::one_row().project(vec![Expr::lit(Literal::int(1)).alias("one")]).build();
        assert_eq!(one.max_rows(), Some(1));
    }
}
