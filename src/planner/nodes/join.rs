use num_bigint::BigInt;

use crate::{
    error::PlanResult,
    expr::{Attribute, AttributeSet, Expr, PredicateHelper},
    planner::{map_attribute, two_children, ConstraintSet, HintInfo, LogicalNode, LogicalPlan, PlanNode},
    types::DataType,
};

#[derive(Debug, Clone, PartialEq)]
pub enum JoinType {
    Inner,
    Cross,
    LeftOuter,
    RightOuter,
    FullOuter,
    LeftSemi,
    LeftAnti,
    /// Left rows plus a boolean column telling whether a match exists.
    ExistenceJoin(Attribute),
    /// `NATURAL <join>`; rewritten to an explicit condition before resolution.
    NaturalJoin(Box<JoinType>),
    /// `<join> USING (cols)`; rewritten like a natural join.
    UsingJoin(Box<JoinType>, Vec<String>),
}

impl JoinType {
    pub fn is_inner_like(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Cross)
    }

    /// Joins whose output is the left side only (plus an existence marker).
    pub fn is_left_existence(&self) -> bool {
        matches!(self, JoinType::LeftSemi | JoinType::LeftAnti | JoinType::ExistenceJoin(_))
    }

    pub fn is_natural_or_using(&self) -> bool {
        matches!(self, JoinType::NaturalJoin(_) | JoinType::UsingJoin(..))
    }

    /// The join performed once natural and using wrappers are peeled off.
    pub fn effective(&self) -> &JoinType {
        match self {
            JoinType::NaturalJoin(inner) | JoinType::UsingJoin(inner, _) => inner.effective(),
            other => other,
        }
    }
}

/// Strategy hints for either side of a join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinHint {
    pub left: Option<HintInfo>,
    pub right: Option<HintInfo>,
}

impl JoinHint {
    pub const NONE: JoinHint = JoinHint { left: None, right: None };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: Box<LogicalPlan>,
    pub right: Box<LogicalPlan>,
    pub join_type: JoinType,
    pub condition: Option<Expr>,
    pub hint: JoinHint,
}

impl Join {
    pub fn new(left: LogicalPlan, right: LogicalPlan, join_type: JoinType, condition: Option<Expr>) -> Self {
        Self { left: Box::new(left), right: Box::new(right), join_type, condition, hint: JoinHint::NONE }
    }

    pub fn with_hint(mut self, hint: JoinHint) -> Self {
        self.hint = hint;
        self
    }

    /// Both sides expose disjoint attribute ids.
    pub fn duplicate_resolved(&self) -> bool {
        self.left.output_set().intersect(self.right.output_set()).is_empty()
    }

    fn condition_conjuncts(&self) -> ConstraintSet {
        self.condition
            .as_ref()
            .map(|c| Self::split_conjunctive_predicates(c).into_iter().collect())
            .unwrap_or_default()
    }
}

impl PredicateHelper for Join {}

impl LogicalNode for Join {
    fn node_name(&self) -> &'static str { "Join" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.left, &self.right] }

    fn expressions(&self) -> Vec<&Expr> { self.condition.iter().collect() }

    fn output(&self) -> Vec<Attribute> {
        let nullable = |attrs: &[Attribute]| attrs.iter().map(|a| a.with_nullability(true)).collect::<Vec<_>>();
        let (left, right) = (self.left.output(), self.right.output());
        match &self.join_type {
            JoinType::ExistenceJoin(exists) => {
                let mut out = left.to_vec();
                out.push(exists.clone());
                out
            }
            JoinType::LeftSemi | JoinType::LeftAnti => left.to_vec(),
            JoinType::LeftOuter => [left.to_vec(), nullable(right)].concat(),
            JoinType::RightOuter => [nullable(left), right.to_vec()].concat(),
            JoinType::FullOuter => [nullable(left), nullable(right)].concat(),
            _ => [left, right].concat(),
        }
    }

    fn resolved(&self) -> bool {
        !self.join_type.is_natural_or_using()
            && self.left.resolved()
            && self.right.resolved()
            && self.expressions().iter().all(|e| e.resolved())
            && self.duplicate_resolved()
            && self.condition.as_ref().is_none_or(|c| c.data_type() == DataType::Boolean)
    }

    fn valid_constraints(&self) -> ConstraintSet {
        let (left, right) = (self.left.constraints(), self.right.constraints());
        match (self.join_type.effective(), self.condition.is_some()) {
            (t, true) if t.is_inner_like() => left.union(right).union(&self.condition_conjuncts()),
            (JoinType::LeftSemi, true) => left.union(&self.condition_conjuncts()),
            (t, false) if t.is_inner_like() => left.union(right),
            (t, _) if t.is_left_existence() => left.clone(),
            (JoinType::LeftOuter, _) => left.clone(),
            (JoinType::RightOuter, _) => right.clone(),
            _ => ConstraintSet::new(),
        }
    }

    fn max_rows(&self) -> Option<i64> {
        let join_type = self.join_type.effective();
        match join_type {
            JoinType::Inner | JoinType::Cross | JoinType::LeftOuter | JoinType::RightOuter | JoinType::FullOuter => {
                let left = BigInt::from(self.left.max_rows()?);
                let right = BigInt::from(self.right.max_rows()?);
                let min_rows = match join_type {
                    JoinType::LeftOuter => left.clone(),
                    JoinType::RightOuter => right.clone(),
                    JoinType::FullOuter => &left + &right,
                    _ => BigInt::from(0),
                };
                i64::try_from(&(&left * &right).max(min_rows)).ok()
            }
            JoinType::LeftSemi | JoinType::LeftAnti => self.left.max_rows(),
            _ => None,
        }
    }

    fn metadata_output(&self) -> Vec<Attribute> {
        if self.join_type.is_left_existence() {
            self.left.metadata_output().to_vec()
        } else {
            [self.left.metadata_output(), self.right.metadata_output()].concat()
        }
    }

    fn produced_attributes(&self) -> AttributeSet {
        match &self.join_type {
            JoinType::ExistenceJoin(exists) => [exists].into_iter().collect(),
            _ => AttributeSet::new(),
        }
    }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        let (left, right) = two_children(self.node_name(), children)?;
        Ok(Join { left, right, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        let join_type = match &self.join_type {
            JoinType::ExistenceJoin(exists) => JoinType::ExistenceJoin(map_attribute(f, exists)),
            other => other.clone(),
        };
        Join { join_type, condition: self.condition.as_ref().map(|c| f(c)), ..self.clone() }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{LocalRelation, _tests::fixtures::*};

    fn not_null(name: &str) -> Attribute {
        Attribute::new(name, DataType::Integer, false)
    }

    #[test]
    fn left_outer_forces_right_side_nullable() {
        let (a, b) = (not_null("a"), not_null("b"));
        let plan = join(relation(&[&a]), relation(&[&b]), JoinType::LeftOuter, Some(e(&a).eq(e(&b))));
        let out = plan.output();
        assert!(!out[0].nullable);
        assert!(out[1].nullable && out[1].same_ref(&b));
    }

    #[test]
    fn outer_join_nullability() {
        let (a, b) = (not_null("a"), not_null("b"));
        let right_outer = join(relation(&[&a]), relation(&[&b]), JoinType::RightOuter, None);
        assert!(right_outer.output()[0].nullable && !right_outer.output()[1].nullable);
        let full = join(relation(&[&a]), relation(&[&b]), JoinType::FullOuter, None);
        assert!(full.output().iter().all(|a| a.nullable));
    }

    #[test]
    fn existence_family_outputs() {
        let (a, b) = (col("a"), col("b"));
        let semi = join(relation(&[&a]), relation(&[&b]), JoinType::LeftSemi, None);
        assert_eq!(semi.output().len(), 1);
        let marker = Attribute::new("exists", DataType::Boolean, false);
        let existence = join(relation(&[&a]), relation(&[&b]), JoinType::ExistenceJoin(marker.clone()), None);
        assert_eq!(existence.output().len(), 2);
        assert!(existence.output()[1].same_ref(&marker));
        assert!(existence.produced_attributes().contains(&marker));
    }

    #[test]
    fn inner_join_without_condition_unions_side_constraints_only() {
        let (a, b) = (col("a"), col("b"));
        let left = filter(e(&a).gt(lit_i(1)), relation(&[&a]));
        let right = filter(e(&b).lt(lit_i(9)), relation(&[&b]));
        let plan = join(left.clone(), right.clone(), JoinType::Inner, None);
        assert_eq!(plan.valid_constraints(), left.constraints().union(right.constraints()));
        assert_eq!(plan.constraints(), &left.constraints().union(right.constraints()));
    }

    #[test]
    fn inner_join_with_condition_adds_conjuncts() {
        let (a, b) = (col("a"), col("b"));
        let plan = join(relation(&[&a]), relation(&[&b]), JoinType::Inner, Some(e(&a).eq(e(&b))));
        let constraints = plan.constraints();
        assert!(constraints.contains(&e(&a).eq(e(&b))));
        assert!(constraints.contains(&e(&a).is_not_null()));
        assert!(constraints.contains(&e(&b).is_not_null()));
    }

    #[test]
    fn constraints_by_join_type() {
        let (a, b) = (col("a"), col("b"));
        let left = filter(e(&a).gt(lit_i(1)), relation(&[&a]));
        let right = filter(e(&b).lt(lit_i(9)), relation(&[&b]));
        let cond = Some(e(&a).eq(e(&b)));
        let valid = |t: JoinType| join(left.clone(), right.clone(), t, cond.clone()).valid_constraints();

        assert_eq!(valid(JoinType::LeftOuter), left.constraints().clone());
        assert_eq!(valid(JoinType::RightOuter), right.constraints().clone());
        assert!(valid(JoinType::FullOuter).is_empty());
        assert_eq!(valid(JoinType::LeftAnti), left.constraints().clone());
        let semi = valid(JoinType::LeftSemi);
        assert!(semi.contains(&e(&a).eq(e(&b))));
        assert!(!semi.contains(&e(&b).lt(lit_i(9))));
    }

    #[test]
    fn natural_and_using_joins_never_resolve() {
        let (a, b) = (col("a"), col("b"));
        let natural = join(relation(&[&a]), relation(&[&b]), JoinType::NaturalJoin(Box::new(JoinType::Inner)), None);
        let using = join(
            relation(&[&a]),
            relation(&[&b]),
            JoinType::UsingJoin(Box::new(JoinType::LeftOuter), vec!["a".into()]),
            None,
        );
        assert!(!natural.resolved());
        assert!(!using.resolved());
    }

    #[test]
    fn natural_and_using_joins_follow_the_wrapped_type() {
        let (a, b) = (col("a"), col("b"));
        let left = filter(e(&a).gt(lit_i(1)), relation(&[&a]));
        let right = filter(e(&b).gt(lit_i(2)), relation(&[&b]));
        let natural = join(left.clone(), right.clone(), JoinType::NaturalJoin(Box::new(JoinType::Inner)), None);
        assert!(natural.constraints().contains(&e(&a).gt(lit_i(1))));
        assert!(natural.constraints().contains(&e(&b).gt(lit_i(2))));
        assert_eq!(natural.constraints(), &left.constraints().union(right.constraints()));

        let using = JoinType::UsingJoin(Box::new(JoinType::LeftOuter), vec!["a".into()]);
        assert_eq!(using.effective(), &JoinType::LeftOuter);
        assert_eq!(join(left.clone(), right, using, None).constraints(), left.constraints());

        let bounded_natural =
            join(bounded(&[&a], 3), bounded(&[&b], 2), JoinType::NaturalJoin(Box::new(JoinType::Inner)), None);
        assert_eq!(bounded_natural.max_rows(), Some(6));
    }

    #[test]
    fn resolution_requires_disjoint_sides_and_boolean_condition() {
        let (a, b) = (col("a"), col("b"));
        let self_join = join(relation(&[&a]), relation(&[&a]), JoinType::Inner, None);
        assert!(!self_join.resolved());
        let non_boolean = join(relation(&[&a]), relation(&[&b]), JoinType::Inner, Some(e(&a).plus(e(&b))));
        assert!(!non_boolean.resolved());
        let ok = join(relation(&[&a]), relation(&[&b]), JoinType::Inner, Some(e(&a).eq(e(&b))));
        assert!(ok.resolved());
    }

    #[test]
    fn max_rows_bounds() {
        let (a, b) = (col("a"), col("b"));
        let l = || bounded(&[&a], 3);
        let r = || bounded(&[&b], 0);
        assert_eq!(join(l(), r(), JoinType::Inner, None).max_rows(), Some(0));
        assert_eq!(join(l(), r(), JoinType::LeftOuter, None).max_rows(), Some(3));
        assert_eq!(join(l(), r(), JoinType::FullOuter, None).max_rows(), Some(3));
        assert_eq!(join(l(), r(), JoinType::LeftSemi, None).max_rows(), Some(3));
        assert_eq!(join(l(), relation(&[&b]), JoinType::Inner, None).max_rows(), None);

        let big = || bounded(&[&a], usize::MAX / 2);
        assert_eq!(join(big(), bounded(&[&b], 4), JoinType::Cross, None).max_rows(), None);
    }

    #[test]
    fn metadata_output_by_join_type() {
        let (a, b) = (col("a"), col("b"));
        let (ma, mb) = (col("_meta_a"), col("_meta_b"));
        let left = LogicalPlan::new(LocalRelation::new(vec![a.clone()], 1).with_metadata_output(vec![ma.clone()]));
        let right = LogicalPlan::new(LocalRelation::new(vec![b.clone()], 1).with_metadata_output(vec![mb.clone()]));
        assert_eq!(join(left.clone(), right.clone(), JoinType::Inner, None).metadata_output().len(), 2);
        assert_eq!(join(left, right, JoinType::LeftAnti, None).metadata_output(), &[ma]);
    }
}
