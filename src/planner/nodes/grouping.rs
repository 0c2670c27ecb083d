use std::collections::HashSet;

use num_bigint::BigInt;
use tracing::debug;

use crate::{
    config::PlanConf,
    error::{PlanError, PlanResult},
    expr::{Attribute, AttributeSet, Expr, ExprId, Literal},
    planner::{map_all, map_attribute, single_child, ConstraintSet, LogicalNode, LogicalPlan, PlanNode, Project},
    types::DataType,
};

/// The grouping id column of an `Expand`.
pub struct GroupingId;

impl GroupingId {
    pub const NAME: &'static str = "grouping_id";
    pub const POSITION_NAME: &'static str = "_gen_grouping_pos";

    /// A fresh, non-nullable grouping id typed per `conf`.
    pub fn attribute(conf: &PlanConf) -> Attribute {
        Attribute::new(Self::NAME, conf.grouping_id_type(), false)
    }

    /// Number of group-by columns a grouping id of this type can describe.
    pub fn width(data_type: &DataType) -> usize {
        (data_type.default_size() * 8).min(64)
    }

    /// One bit per group-by attribute, most significant first: 0 when the
    /// attribute is kept in this grouping set, 1 when it is nulled out.
    pub fn bitmask(selected: &[Attribute], group_by: &[Attribute], width: usize) -> PlanResult<u64> {
        let n = group_by.len();
        if n > width {
            return Err(PlanError::TooManyGroupingAttributes { count: n, width });
        }
        let mut mask = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };
        for attr in selected {
            let index = group_by
                .iter()
                .position(|g| g.same_ref(attr))
                .ok_or_else(|| PlanError::UnknownGroupingAttribute(attr.name.clone()))?;
            mask &= !(1u64 << (n - 1 - index));
        }
        Ok(mask)
    }

    fn literal(mask: u64, data_type: &DataType) -> Literal {
        match data_type {
            DataType::Integer => Literal::int(mask as u32 as i32),
            _ => Literal::long(mask as i64),
        }
    }
}

/// Emits one output row per projection for every input row; used to
/// evaluate grouping sets, rollup and cube in a single aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expand {
    pub projections: Vec<Vec<Expr>>,
    pub output: Vec<Attribute>,
    pub child: Box<LogicalPlan>,
}

impl Expand {
    pub fn new(projections: Vec<Vec<Expr>>, output: Vec<Attribute>, child: LogicalPlan) -> Self {
        Self { projections, output, child: Box::new(child) }
    }

    /// Build the `Expand` for a set of grouping sets.
    ///
    /// Each projection keeps the child's columns, then every group-by
    /// attribute (or a typed null when the set leaves it out), then the
    /// grouping id bitmask. When two sets select the same attributes a
    /// position column tells their rows apart. The child is wrapped in a
    /// `Project` that evaluates `group_by_aliases`.
    pub fn from_grouping_sets(
        grouping_sets: &[Vec<Attribute>],
        group_by_aliases: Vec<Expr>,
        group_by_attrs: &[Attribute],
        gid: Attribute,
        child: LogicalPlan,
    ) -> PlanResult<Expand> {
        let width = GroupingId::width(&gid.data_type);
        let distinct: HashSet<Vec<ExprId>> = grouping_sets
            .iter()
            .map(|set| {
                let mut ids: Vec<ExprId> = set.iter().map(|a| a.expr_id).collect();
                ids.sort();
                ids.dedup();
                ids
            })
            .collect();
        let has_duplicates = distinct.len() != grouping_sets.len();
        if has_duplicates {
            debug!(sets = grouping_sets.len(), distinct = distinct.len(), "duplicate grouping sets");
        }

        let mut projections = Vec::with_capacity(grouping_sets.len());
        for (i, set) in grouping_sets.iter().enumerate() {
            let mut projection: Vec<Expr> = child.output().iter().map(Expr::attr).collect();
            projection.extend(group_by_attrs.iter().map(|attr| {
                if set.iter().any(|s| s.same_ref(attr)) {
                    Expr::attr(attr)
                } else {
                    Expr::lit(Literal::null(attr.data_type.clone()))
                }
            }));
            let mask = GroupingId::bitmask(set, group_by_attrs, width).inspect_err(|err| {
                debug!(%err, "rejecting grouping set");
            })?;
            projection.push(Expr::lit(GroupingId::literal(mask, &gid.data_type)));
            if has_duplicates {
                projection.push(Expr::lit(Literal::int(i as i32)));
            }
            projections.push(projection);
        }

        let mut output = child.output().to_vec();
        output.extend(group_by_attrs.iter().map(Attribute::new_instance));
        output.push(gid);
        if has_duplicates {
            output.push(Attribute::new(GroupingId::POSITION_NAME, DataType::Integer, false));
        }

        let mut project_list: Vec<Expr> = child.output().iter().map(Expr::attr).collect();
        project_list.extend(group_by_aliases);
        let child = LogicalPlan::new(Project::new(project_list, child));
        Ok(Expand::new(projections, output, child))
    }
}

impl LogicalNode for Expand {
    fn node_name(&self) -> &'static str { "Expand" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { self.projections.iter().flatten().collect() }

    fn output(&self) -> Vec<Attribute> { self.output.clone() }

    /// Rows are duplicated and partially nulled, so nothing carries over.
    fn valid_constraints(&self) -> ConstraintSet { ConstraintSet::new() }

    fn max_rows(&self) -> Option<i64> {
        let rows = BigInt::from(self.child.max_rows()?) * BigInt::from(self.projections.len());
        i64::try_from(&rows).ok()
    }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn produced_attributes(&self) -> AttributeSet {
        let output: AttributeSet = self.output.iter().collect();
        output.difference(self.child.output_set())
    }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Expand { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Expand {
            projections: self.projections.iter().map(|p| map_all(f, p)).collect(),
            output: self.output.iter().map(|a| map_attribute(f, a)).collect(),
            ..self.clone()
        }
        .into()
    }
}

/// `GROUP BY GROUPING SETS (...)` before it is rewritten into
/// `Aggregate` over `Expand`. Never resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingSets {
    pub selected_group_by_exprs: Vec<Vec<Expr>>,
    pub group_by_exprs: Vec<Expr>,
    pub aggregations: Vec<Expr>,
    pub child: Box<LogicalPlan>,
}

impl GroupingSets {
    pub fn new(
        selected_group_by_exprs: Vec<Vec<Expr>>,
        group_by_exprs: Vec<Expr>,
        aggregations: Vec<Expr>,
        child: LogicalPlan,
    ) -> Self {
        Self { selected_group_by_exprs, group_by_exprs, aggregations, child: Box::new(child) }
    }
}

impl LogicalNode for GroupingSets {
    fn node_name(&self) -> &'static str { "GroupingSets" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> {
        self.selected_group_by_exprs
            .iter()
            .flatten()
            .chain(&self.group_by_exprs)
            .chain(&self.aggregations)
            .collect()
    }

    fn output(&self) -> Vec<Attribute> {
        self.aggregations.iter().filter_map(Expr::to_attribute).collect()
    }

    fn resolved(&self) -> bool { false }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(GroupingSets { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        GroupingSets {
            selected_group_by_exprs: self.selected_group_by_exprs.iter().map(|s| map_all(f, s)).collect(),
            group_by_exprs: map_all(f, &self.group_by_exprs),
            aggregations: map_all(f, &self.aggregations),
            ..self.clone()
        }
        .into()
    }
}

/// `PIVOT (aggregates FOR pivot_column IN (pivot_values))` before it is
/// rewritten into aggregations. Never resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub group_by_exprs: Option<Vec<Expr>>,
    pub pivot_column: Expr,
    pub pivot_values: Vec<Expr>,
    pub aggregates: Vec<Expr>,
    pub child: Box<LogicalPlan>,
}

impl Pivot {
    pub fn new(
        group_by_exprs: Option<Vec<Expr>>,
        pivot_column: Expr,
        pivot_values: Vec<Expr>,
        aggregates: Vec<Expr>,
        child: LogicalPlan,
    ) -> Self {
        Self { group_by_exprs, pivot_column, pivot_values, aggregates, child: Box::new(child) }
    }
}

impl LogicalNode for Pivot {
    fn node_name(&self) -> &'static str { "Pivot" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> {
        self.group_by_exprs
            .iter()
            .flatten()
            .chain(std::iter::once(&self.pivot_column))
            .chain(&self.pivot_values)
            .chain(&self.aggregates)
            .collect()
    }

    /// Group-by columns, then one column per pivot value (and per aggregate
    /// when there is more than one), each a new nullable attribute.
    fn output(&self) -> Vec<Attribute> {
        let mut out: Vec<Attribute> =
            self.group_by_exprs.iter().flatten().filter_map(Expr::to_attribute).collect();
        match self.aggregates.as_slice() {
            [agg] => out.extend(self.pivot_values.iter().map(|v| Attribute::new(v.to_string(), agg.data_type(), true))),
            aggs => out.extend(self.pivot_values.iter().flat_map(|v| {
                aggs.iter().map(move |agg| Attribute::new(format!("{v}_{agg}"), agg.data_type(), true))
            })),
        }
        out
    }

    fn resolved(&self) -> bool { false }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Pivot { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Pivot {
            group_by_exprs: self.group_by_exprs.as_ref().map(|g| map_all(f, g)),
            pivot_column: f(&self.pivot_column),
            pivot_values: map_all(f, &self.pivot_values),
            aggregates: map_all(f, &self.aggregates),
            ..self.clone()
        }
        .into()
    }
}
