use num_bigint::BigInt;

use crate::{
    error::PlanResult,
    expr::{Attribute, AttributeSet, Expr},
    planner::{positional_mapping, ConstraintSet, LogicalNode, LogicalPlan, PlanNode},
    types::DataType,
};

/// `UNION ALL` over any number of inputs matched by position
/// (or by name, before the analyzer rewrites it).
#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    pub children: Vec<LogicalPlan>,
    pub by_name: bool,
    pub allow_missing_col: bool,
}

impl Union {
    pub fn new(children: Vec<LogicalPlan>) -> Self {
        Self { children, by_name: false, allow_missing_col: false }
    }

    pub fn by_name(children: Vec<LogicalPlan>, allow_missing_col: bool) -> Self {
        Self { children, by_name: true, allow_missing_col }
    }

    /// No attribute id appears in more than one child.
    pub fn duplicate_resolved(&self) -> bool {
        let total: usize = self.children.iter().map(|c| c.output_set().len()).sum();
        let distinct = self.children.iter().fold(AttributeSet::new(), |acc, c| acc.union(c.output_set()));
        total == distinct.len()
    }

    fn all_children_compatible(&self) -> bool {
        let Some((first, rest)) = self.children.split_first() else {
            return true;
        };
        rest.iter().all(|child| {
            child.output().len() == first.output().len()
                && child.output().iter().zip(first.output()).all(|(l, r)| l.data_type.same_type(&r.data_type))
        })
    }

    /// Keep what both sides guarantee; for columns constrained on both sides
    /// only by single-column predicates, keep `(all of a) OR (all of b)`.
    pub fn merge_constraints(a: &ConstraintSet, b: &ConstraintSet) -> ConstraintSet {
        let common = a.intersect(b);
        let only_a = a.difference(&common).group_by_single_reference();
        let only_b = b.difference(&common).group_by_single_reference();
        let mut merged = common;
        for (attr, a_side) in &only_a {
            let Some(b_side) = only_b.get(attr) else {
                continue;
            };
            if let (Some(a_all), Some(b_all)) = (conjunction(a_side), conjunction(b_side)) {
                merged.insert(a_all.or(b_all));
            }
        }
        merged
    }
}

fn conjunction(predicates: &[Expr]) -> Option<Expr> {
    predicates.iter().cloned().reduce(Expr::and)
}

impl LogicalNode for Union {
    fn node_name(&self) -> &'static str { "Union" }

    fn children(&self) -> Vec<&LogicalPlan> { self.children.iter().collect() }

    /// Per position: nullable when any input is, typed by the merge of all
    /// input types. A widened column gets its own id, derived from the first
    /// input's so it stays the same whenever this output is derived again.
    fn output(&self) -> Vec<Attribute> {
        let Some(first) = self.children.first() else {
            return vec![];
        };
        first
            .output()
            .iter()
            .enumerate()
            .map(|(i, first_attr)| {
                let column: Vec<&Attribute> = self.children.iter().filter_map(|c| c.output().get(i)).collect();
                let nullable = column.iter().any(|a| a.nullable);
                let merged = column
                    .iter()
                    .skip(1)
                    .try_fold(first_attr.data_type.clone(), |acc, a| DataType::merge(&acc, &a.data_type));
                match merged {
                    Some(data_type) if data_type != first_attr.data_type => {
                        let expr_id = first_attr.expr_id.derived(&format!("union:{data_type}"));
                        Attribute { data_type, nullable, expr_id, ..first_attr.clone() }
                    }
                    _ => first_attr.with_nullability(nullable),
                }
            })
            .collect()
    }

    fn resolved(&self) -> bool {
        self.children.len() > 1
            && !(self.by_name || self.allow_missing_col)
            && self.children.iter().all(LogicalPlan::resolved)
            && self.all_children_compatible()
            && self.duplicate_resolved()
    }

    /// Each child's constraints are restated over this node's output
    /// attributes, then merged pairwise.
    fn valid_constraints(&self) -> ConstraintSet {
        let output = self.output();
        self.children
            .iter()
            .map(|child| child.constraints().rewrite_attributes(&positional_mapping(child.output(), &output)))
            .reduce(|a, b| Self::merge_constraints(&a, &b))
            .unwrap_or_default()
    }

    fn max_rows(&self) -> Option<i64> {
        sum_bounds(self.children.iter().map(LogicalPlan::max_rows))
    }

    fn max_rows_per_partition(&self) -> Option<i64> {
        sum_bounds(self.children.iter().map(LogicalPlan::max_rows_per_partition))
    }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Union { children, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

fn sum_bounds(bounds: impl Iterator<Item = Option<i64>>) -> Option<i64> {
    let mut total = BigInt::from(0);
    for bound in bounds {
        total += bound?;
    }
    i64::try_from(&total).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::_tests::fixtures::*;

    #[test]
    fn merged_nullability_is_any_child() {
        let a = Attribute::new("a", DataType::Integer, false);
        let b = Attribute::new("b", DataType::Integer, true);
        let c = Attribute::new("c", DataType::Integer, false);
        let nullable = union(vec![relation(&[&a]), relation(&[&b])]);
        assert!(nullable.output()[0].nullable);
        assert!(nullable.output()[0].same_ref(&a));
        let non_nullable = union(vec![relation(&[&a]), relation(&[&c])]);
        assert!(!non_nullable.output()[0].nullable);
    }

    #[test]
    fn widened_column_gets_a_new_id() {
        let a = Attribute::new("a", DataType::Integer, false).with_qualifier(vec!["t".into()]);
        let b = Attribute::new("b", DataType::Long, false);
        let plan = union(vec![relation(&[&a]), relation(&[&b])]);
        let out = &plan.output()[0];
        assert_eq!(out.data_type, DataType::Long);
        assert_eq!(out.name, "a");
        assert_eq!(out.qualifier, a.qualifier);
        assert!(!out.same_ref(&a) && !out.same_ref(&b));
        let again = union(vec![relation(&[&a]), relation(&[&b])]);
        assert!(again.output()[0].same_ref(out));
    }

    #[test]
    fn resolution() {
        let (a, b, c) = (col("a"), col("b"), col("c"));
        assert!(union(vec![relation(&[&a]), relation(&[&b])]).resolved());
        assert!(!union(vec![relation(&[&a])]).resolved());
        assert!(!union(vec![relation(&[&a]), relation(&[&a])]).resolved());
        assert!(!union(vec![relation(&[&a]), relation(&[&b, &c])]).resolved());
        let by_name = LogicalPlan::new(Union::by_name(vec![relation(&[&a]), relation(&[&b])], false));
        assert!(!by_name.resolved());
    }

    #[test]
    fn max_rows_is_the_sum() {
        let (a, b) = (col("a"), col("b"));
        assert_eq!(union(vec![bounded(&[&a], 2), bounded(&[&b], 3)]).max_rows(), Some(5));
        assert_eq!(union(vec![bounded(&[&a], 2), relation(&[&b])]).max_rows(), None);
        let huge = usize::MAX / 2;
        assert_eq!(union(vec![bounded(&[&a], huge), bounded(&[&b], huge)]).max_rows(), None);
    }

    #[test]
    fn constraints_common_to_all_children_survive() {
        let (a, b) = (col("a"), col("b"));
        let left = filter(e(&a).gt(lit_i(0)), relation(&[&a]));
        let right = filter(e(&b).gt(lit_i(0)), relation(&[&b]));
        let plan = union(vec![left, right]);
        let out = plan.output()[0].clone();
        assert!(out.same_ref(&a));
        assert!(plan.constraints().contains(&e(&out).gt(lit_i(0))));
        assert!(plan.constraints().contains(&e(&out).is_not_null()));
    }

    #[test]
    fn single_column_constraints_are_weakened_to_a_disjunction() {
        let (a, b) = (col("a"), col("b"));
        let left = filter(e(&a).gt(lit_i(10)).and(e(&a).lt(lit_i(20))), relation(&[&a]));
        let right = filter(e(&b).lt(lit_i(0)), relation(&[&b]));
        let plan = union(vec![left, right]);
        let expected = e(&a).gt(lit_i(10)).and(e(&a).lt(lit_i(20))).or(e(&a).lt(lit_i(0)));
        assert!(plan.constraints().contains(&expected));
        assert!(!plan.constraints().contains(&e(&a).gt(lit_i(10))));
        assert!(plan.constraints().iter().all(|c| !c.references().contains(&b)));
    }

    #[test]
    fn three_way_union_keeps_only_what_every_child_guarantees() {
        let (a, b, c) = (col("a"), col("b"), col("c"));
        let plan = union(vec![
            filter(e(&a).gt(lit_i(0)), relation(&[&a])),
            filter(e(&b).gt(lit_i(0)), relation(&[&b])),
            filter(e(&c).lt(lit_i(100)), relation(&[&c])),
        ]);
        let constraints = plan.constraints();
        assert!(!constraints.contains(&e(&a).gt(lit_i(0))));
        assert!(constraints.contains(&e(&a).gt(lit_i(0)).or(e(&a).lt(lit_i(100)))));
        assert!(constraints.contains(&e(&a).is_not_null()));
        assert_eq!(constraints.len(), 2);
    }

    #[test]
    fn three_way_union_folds_the_disjunction_over_every_child() {
        let (a, b, c) = (col("a"), col("b"), col("c"));
        let plan = union(vec![
            filter(e(&a).gt(lit_i(10)), relation(&[&a])),
            filter(e(&b).lt(lit_i(0)), relation(&[&b])),
            filter(e(&c).eq(lit_i(5)), relation(&[&c])),
        ]);
        let folded = e(&a).eq(lit_i(5)).or(e(&a).gt(lit_i(10)).or(e(&a).lt(lit_i(0))));
        assert!(plan.constraints().contains(&folded));
        assert!(!plan.constraints().contains(&e(&a).gt(lit_i(10)).or(e(&a).lt(lit_i(0)))));
        assert!(plan.constraints().iter().all(|p| p.references().iter().all(|r| r.same_ref(&a))));
    }

    #[test]
    fn widened_column_carries_the_restated_constraints() {
        let a = col("a");
        let b = Attribute::new("b", DataType::Long, true);
        let left = filter(e(&a).gt(lit_i(0)), relation(&[&a]));
        let right = filter(e(&b).gt(lit_i(5)), relation(&[&b]));
        let plan = union(vec![left, right]);
        let out = plan.output()[0].clone();
        assert_eq!(out.data_type, DataType::Long);
        assert!(!out.same_ref(&a) && !out.same_ref(&b));

        let constraints = plan.constraints();
        assert!(constraints.contains(&e(&out).is_not_null()));
        assert!(constraints.contains(&e(&out).gt(lit_i(0)).or(e(&out).gt(lit_i(5)))));
        assert!(constraints.iter().all(|p| {
            let refs = p.references();
            !refs.is_empty() && refs.iter().all(|r| r.expr_id == out.expr_id && plan.output_set().contains(r))
        }));
    }

    #[test]
    fn merge_drops_multi_column_constraints_present_on_one_side() {
        let (a, b) = (col("a"), col("b"));
        let x: ConstraintSet = [e(&a).gt(e(&b))].into_iter().collect();
        let y: ConstraintSet = [e(&a).lt(e(&b))].into_iter().collect();
        assert!(Union::merge_constraints(&x, &y).is_empty());
    }
}
