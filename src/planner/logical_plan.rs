use std::fmt;

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::{
    error::PlanResult,
    expr::{Attribute, AttributeSet, Expr, SortOrder},
    planner::{nodes::*, ConstraintInference, ConstraintSet, LogicalNode},
};

/// One relational operator per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    OneRowRelation(OneRowRelation),
    LocalRelation(LocalRelation),
    UnresolvedRelation(UnresolvedRelation),
    Range(Range),
    Project(Project),
    Generate(Generate),
    Filter(Filter),
    Join(Join),
    Intersect(Intersect),
    Except(Except),
    Union(Union),
    Aggregate(Aggregate),
    Window(Window),
    Expand(Expand),
    GroupingSets(GroupingSets),
    Pivot(Pivot),
    GlobalLimit(GlobalLimit),
    LocalLimit(LocalLimit),
    Tail(Tail),
    SubqueryAlias(SubqueryAlias),
    Subquery(Subquery),
    ReturnAnswer(ReturnAnswer),
    View(View),
    With(With),
    WithWindowDefinition(WithWindowDefinition),
    Sort(Sort),
    Sample(Sample),
    Repartition(Repartition),
    RepartitionByExpression(RepartitionByExpression),
    Distinct(Distinct),
    Deduplicate(Deduplicate),
    CollectMetrics(CollectMetrics),
    InsertIntoDir(InsertIntoDir),
    ResolvedHint(ResolvedHint),
}

impl PlanNode {
    pub fn as_node(&self) -> &dyn LogicalNode {
        match self {
            PlanNode::OneRowRelation(n) => n,
            PlanNode::LocalRelation(n) => n,
            PlanNode::UnresolvedRelation(n) => n,
            PlanNode::Range(n) => n,
            PlanNode::Project(n) => n,
            PlanNode::Generate(n) => n,
            PlanNode::Filter(n) => n,
            PlanNode::Join(n) => n,
            PlanNode::Intersect(n) => n,
            PlanNode::Except(n) => n,
            PlanNode::Union(n) => n,
            PlanNode::Aggregate(n) => n,
            PlanNode::Window(n) => n,
            PlanNode::Expand(n) => n,
            PlanNode::GroupingSets(n) => n,
            PlanNode::Pivot(n) => n,
            PlanNode::GlobalLimit(n) => n,
            PlanNode::LocalLimit(n) => n,
            PlanNode::Tail(n) => n,
            PlanNode::SubqueryAlias(n) => n,
            PlanNode::Subquery(n) => n,
            PlanNode::ReturnAnswer(n) => n,
            PlanNode::View(n) => n,
            PlanNode::With(n) => n,
            PlanNode::WithWindowDefinition(n) => n,
            PlanNode::Sort(n) => n,
            PlanNode::Sample(n) => n,
            PlanNode::Repartition(n) => n,
            PlanNode::RepartitionByExpression(n) => n,
            PlanNode::Distinct(n) => n,
            PlanNode::Deduplicate(n) => n,
            PlanNode::CollectMetrics(n) => n,
            PlanNode::InsertIntoDir(n) => n,
            PlanNode::ResolvedHint(n) => n,
        }
    }
}

macro_rules! impl_from_node {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for PlanNode {
                fn from(node: $variant) -> Self {
                    PlanNode::$variant(node)
                }
            }
        )*
    };
}

impl_from_node!(
    OneRowRelation, LocalRelation, UnresolvedRelation, Range, Project, Generate, Filter, Join,
    Intersect, Except, Union, Aggregate, Window, Expand, GroupingSets, Pivot, GlobalLimit,
    LocalLimit, Tail, SubqueryAlias, Subquery, ReturnAnswer, View, With, WithWindowDefinition,
    Sort, Sample, Repartition, RepartitionByExpression, Distinct, Deduplicate, CollectMetrics,
    InsertIntoDir, ResolvedHint,
);

/// Memo slots for derived properties.
///
/// Each slot is filled at most once per plan instance by a pure computation,
/// so concurrent first readers observe the same value.
#[derive(Clone, Default)]
struct Derived {
    output: OnceCell<Vec<Attribute>>,
    output_set: OnceCell<AttributeSet>,
    resolved: OnceCell<bool>,
    constraints: OnceCell<ConstraintSet>,
    max_rows: OnceCell<Option<i64>>,
    metadata_output: OnceCell<Vec<Attribute>>,
    canonicalized: OnceCell<Box<LogicalPlan>>,
}

/// An immutable logical plan tree.
///
/// Equality is structural over the operator tree; memoized properties are
/// not compared. Clones share the values already derived, so a cloned plan
/// reports the same output attribute ids as the original.
#[derive(Clone)]
pub struct LogicalPlan {
    node: PlanNode,
    derived: Derived,
}

impl LogicalPlan {
    pub fn new(node: impl Into<PlanNode>) -> Self {
        Self { node: node.into(), derived: Derived::default() }
    }

    pub fn node(&self) -> &PlanNode {
        &self.node
    }

    pub fn into_node(self) -> PlanNode {
        self.node
    }

    fn as_node(&self) -> &dyn LogicalNode {
        self.node.as_node()
    }

    pub fn node_name(&self) -> &'static str {
        self.as_node().node_name()
    }

    pub fn children(&self) -> Vec<&LogicalPlan> {
        self.as_node().children()
    }

    pub fn expressions(&self) -> Vec<&Expr> {
        self.as_node().expressions()
    }

    // ---- derived properties ----

    pub fn output(&self) -> &[Attribute] {
        self.derived.output.get_or_init(|| {
            trace!(node = self.node_name(), "deriving output");
            self.as_node().output()
        })
    }

    pub fn output_set(&self) -> &AttributeSet {
        self.derived.output_set.get_or_init(|| self.output().iter().collect())
    }

    pub fn resolved(&self) -> bool {
        *self.derived.resolved.get_or_init(|| {
            let resolved = self.as_node().resolved();
            trace!(node = self.node_name(), resolved, "deriving resolution");
            resolved
        })
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    /// Constraints before inference; see `constraints` for the full set.
    pub fn valid_constraints(&self) -> ConstraintSet {
        self.as_node().valid_constraints()
    }

    /// Every predicate known to hold on each output row, restricted to this
    /// node's own output attributes.
    pub fn constraints(&self) -> &ConstraintSet {
        self.derived.constraints.get_or_init(|| {
            trace!(node = self.node_name(), "deriving constraints");
            ConstraintInference::constraints_for(self)
        })
    }

    pub fn max_rows(&self) -> Option<i64> {
        *self.derived.max_rows.get_or_init(|| self.as_node().max_rows())
    }

    pub fn max_rows_per_partition(&self) -> Option<i64> {
        self.as_node().max_rows_per_partition()
    }

    pub fn metadata_output(&self) -> &[Attribute] {
        self.derived.metadata_output.get_or_init(|| self.as_node().metadata_output())
    }

    pub fn output_ordering(&self) -> Vec<SortOrder> {
        self.as_node().output_ordering()
    }

    pub fn produced_attributes(&self) -> AttributeSet {
        self.as_node().produced_attributes()
    }

    pub fn references(&self) -> AttributeSet {
        self.as_node().references()
    }

    /// Union of the children's outputs.
    pub fn input_set(&self) -> AttributeSet {
        self.children().iter().fold(AttributeSet::new(), |acc, c| acc.union(c.output_set()))
    }

    /// Referenced attributes that neither a child nor this node provides.
    pub fn missing_input(&self) -> AttributeSet {
        self.references().difference(&self.input_set()).difference(&self.produced_attributes())
    }

    pub fn is_order_preserving(&self) -> bool {
        self.as_node().is_order_preserving()
    }

    pub fn is_streaming(&self) -> bool {
        self.as_node().is_streaming()
    }

    // ---- tree rewriting ----

    pub fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<LogicalPlan> {
        Ok(LogicalPlan::new(self.as_node().with_new_children(children)?))
    }

    pub fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> LogicalPlan {
        LogicalPlan::new(self.as_node().map_expressions(f))
    }

    /// Rebuild with new children, keeping this instance when nothing changed.
    fn rebuild(&self, children: Vec<LogicalPlan>) -> PlanResult<LogicalPlan> {
        let unchanged = children.len() == self.children().len()
            && children.iter().zip(self.children()).all(|(new, old)| new == old);
        if unchanged { Ok(self.clone()) } else { self.with_new_children(children) }
    }

    /// Post-order rewrite: `rule` sees each node after its children were rewritten.
    pub fn transform_up(
        &self,
        rule: &mut dyn FnMut(LogicalPlan) -> PlanResult<LogicalPlan>,
    ) -> PlanResult<LogicalPlan> {
        let children = self
            .children()
            .into_iter()
            .map(|c| c.transform_up(rule))
            .collect::<PlanResult<Vec<_>>>()?;
        rule(self.rebuild(children)?)
    }

    /// Pre-order rewrite: `rule` may replace a node, whose children are then visited.
    pub fn transform_down(
        &self,
        rule: &mut dyn FnMut(&LogicalPlan) -> Option<LogicalPlan>,
    ) -> PlanResult<LogicalPlan> {
        let current = rule(self).unwrap_or_else(|| self.clone());
        let children = current
            .children()
            .into_iter()
            .map(|c| c.transform_down(rule))
            .collect::<PlanResult<Vec<_>>>()?;
        current.rebuild(children)
    }

    pub fn exists(&self, pred: &dyn Fn(&LogicalPlan) -> bool) -> bool {
        pred(self) || self.children().iter().any(|c| c.exists(pred))
    }

    /// Pre-order list of the nodes satisfying `pred`.
    pub fn collect_nodes(&self, pred: &dyn Fn(&LogicalPlan) -> bool) -> Vec<&LogicalPlan> {
        let mut out = Vec::new();
        self.collect_into(pred, &mut out);
        out
    }

    fn collect_into<'a>(&'a self, pred: &dyn Fn(&LogicalPlan) -> bool, out: &mut Vec<&'a LogicalPlan>) {
        if pred(self) {
            out.push(self);
        }
        for child in self.children() {
            child.collect_into(pred, out);
        }
    }

    // ---- canonical form ----

    /// Normal form with cosmetic differences erased; see `same_result`.
    pub fn canonicalized(&self) -> &LogicalPlan {
        self.derived.canonicalized.get_or_init(|| Box::new(crate::planner::canonicalize::canonicalize(self)))
    }

    /// True when both plans compute the same rows, judged by their canonical forms.
    pub fn same_result(&self, other: &LogicalPlan) -> bool {
        self.canonicalized() == other.canonicalized()
    }
}

impl PartialEq for LogicalPlan {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl fmt::Debug for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node, f)
    }
}
