use crate::{
    error::PlanResult,
    expr::{Attribute, AttributeMap, Expr},
    planner::{two_children, ConstraintSet, LogicalNode, LogicalPlan, PlanNode},
};

/// Shape shared by `INTERSECT` and `EXCEPT`: two inputs matched by column position.
pub trait SetOperation {
    fn left(&self) -> &LogicalPlan;

    fn right(&self) -> &LogicalPlan;

    fn duplicate_resolved(&self) -> bool {
        self.left().output_set().intersect(self.right().output_set()).is_empty()
    }

    /// Same arity and pairwise equal column types.
    fn columns_compatible(&self) -> bool {
        let (left, right) = (self.left().output(), self.right().output());
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| l.data_type.same_type(&r.data_type))
    }

    fn set_operation_resolved(&self) -> bool {
        self.left().resolved() && self.right().resolved() && self.columns_compatible() && self.duplicate_resolved()
    }

    /// Right-side constraints restated over the left side's attributes.
    fn right_constraints_in_left_space(&self) -> ConstraintSet {
        let mapping = positional_mapping(self.right().output(), self.left().output());
        self.right().constraints().rewrite_attributes(&mapping)
    }
}

/// Map each attribute of `from` to the attribute at the same position in `to`.
pub(crate) fn positional_mapping(from: &[Attribute], to: &[Attribute]) -> AttributeMap<Attribute> {
    from.iter().zip(to.iter().cloned()).collect()
}

/// `INTERSECT [ALL]`
#[derive(Debug, Clone, PartialEq)]
pub struct Intersect {
    pub left: Box<LogicalPlan>,
    pub right: Box<LogicalPlan>,
    pub is_all: bool,
}

impl Intersect {
    pub fn new(left: LogicalPlan, right: LogicalPlan, is_all: bool) -> Self {
        Self { left: Box::new(left), right: Box::new(right), is_all }
    }
}

impl SetOperation for Intersect {
    fn left(&self) -> &LogicalPlan { &self.left }

    fn right(&self) -> &LogicalPlan { &self.right }
}

impl LogicalNode for Intersect {
    fn node_name(&self) -> &'static str { "Intersect" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.left, &self.right] }

    /// A row survives only if it appears on both sides, so a column is
    /// nullable only when it is nullable on both sides.
    fn output(&self) -> Vec<Attribute> {
        self.left
            .output()
            .iter()
            .zip(self.right.output())
            .map(|(l, r)| l.with_nullability(l.nullable && r.nullable))
            .collect()
    }

    fn resolved(&self) -> bool { self.set_operation_resolved() }

    fn valid_constraints(&self) -> ConstraintSet {
        self.left.constraints().union(&self.right_constraints_in_left_space())
    }

    fn max_rows(&self) -> Option<i64> {
        Some(self.left.max_rows()?.min(self.right.max_rows()?))
    }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        let (left, right) = two_children(self.node_name(), children)?;
        Ok(Intersect { left, right, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// `EXCEPT [ALL]`
#[derive(Debug, Clone, PartialEq)]
pub struct Except {
    pub left: Box<LogicalPlan>,
    pub right: Box<LogicalPlan>,
    pub is_all: bool,
}

impl Except {
    pub fn new(left: LogicalPlan, right: LogicalPlan, is_all: bool) -> Self {
        Self { left: Box::new(left), right: Box::new(right), is_all }
    }
}

impl SetOperation for Except {
    fn left(&self) -> &LogicalPlan { &self.left }

    fn right(&self) -> &LogicalPlan { &self.right }
}

impl LogicalNode for Except {
    fn node_name(&self) -> &'static str { "Except" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.left, &self.right] }

    fn output(&self) -> Vec<Attribute> { self.left.output().to_vec() }

    fn resolved(&self) -> bool { self.set_operation_resolved() }

    fn valid_constraints(&self) -> ConstraintSet { self.left.constraints().clone() }

    fn max_rows(&self) -> Option<i64> { self.left.max_rows() }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        let (left, right) = two_children(self.node_name(), children)?;
        Ok(Except { left, right, ..self.clone() }.into())
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
    fn intersect_nullable_only_when_both_sides_are() {
        let (a, b) = (col("a"), Attribute::new("b", DataType::Integer, false));
        let plan = LogicalPlan::new(Intersect::new(relation(&[&a]), relation(&[&b]), false));
        assert!(!plan.output()[0].nullable);
        assert!(plan.output()[0].same_ref(&a));
    }

    #[test]
    fn intersect_merges_right_constraints_into_left_attributes() {
        let (a, b) = (col("a"), col("b"));
        let left = filter(e(&a).gt(lit_i(0)), relation(&[&a]));
        let right = filter(e(&b).lt(lit_i(9)), relation(&[&b]));
        let plan = LogicalPlan::new(Intersect::new(left, right, false));
        let constraints = plan.constraints();
        assert!(constraints.contains(&e(&a).gt(lit_i(0))));
        assert!(constraints.contains(&e(&a).lt(lit_i(9))));
        assert!(constraints.iter().all(|c| !c.references().contains(&b)));
    }

    #[test]
    fn except_keeps_left_constraints_only() {
        let (a, b) = (col("a"), col("b"));
        let left = filter(e(&a).gt(lit_i(0)), relation(&[&a]));
        let right = filter(e(&b).lt(lit_i(9)), relation(&[&b]));
        let plan = LogicalPlan::new(Except::new(left.clone(), right, false));
        assert_eq!(plan.constraints(), left.constraints());
    }

    #[test]
    fn resolution_checks_arity_types_and_duplicates() {
        let (a, b, c) = (col("a"), col("b"), col("c"));
        let s = Attribute::new("s", DataType::String, true);
        assert!(LogicalPlan::new(Intersect::new(relation(&[&a]), relation(&[&b]), false)).resolved());
        assert!(!LogicalPlan::new(Intersect::new(relation(&[&a]), relation(&[&b, &c]), false)).resolved());
        assert!(!LogicalPlan::new(Except::new(relation(&[&a]), relation(&[&s]), false)).resolved());
        assert!(!LogicalPlan::new(Except::new(relation(&[&a]), relation(&[&a]), true)).resolved());
    }

    #[test]
    fn max_rows() {
        let (a, b) = (col("a"), col("b"));
        let intersect = LogicalPlan::new(Intersect::new(bounded(&[&a], 5), bounded(&[&b], 2), false));
        assert_eq!(intersect.max_rows(), Some(2));
        let except = LogicalPlan::new(Except::new(bounded(&[&a], 5), bounded(&[&b], 2), false));
        assert_eq!(except.max_rows(), Some(5));
        let unbounded = LogicalPlan::new(Intersect::new(bounded(&[&a], 5), relation(&[&b]), false));
        assert_eq!(unbounded.max_rows(), None);
    }
}
