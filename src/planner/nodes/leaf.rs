use num_bigint::BigInt;
use tracing::debug;

use crate::{
    error::{PlanError, PlanResult},
    expr::{Attribute, AttributeSet, Expr, SortOrder},
    planner::{no_children, map_attribute, ConstraintSet, LogicalNode, LogicalPlan, PlanNode},
    types::DataType,
};

/// `SELECT` without `FROM`: exactly one row and no columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneRowRelation;

impl LogicalNode for OneRowRelation {
    fn node_name(&self) -> &'static str { "OneRowRelation" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![] }

    fn output(&self) -> Vec<Attribute> { vec![] }

    fn valid_constraints(&self) -> ConstraintSet { ConstraintSet::new() }

    fn max_rows(&self) -> Option<i64> { Some(1) }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn is_streaming(&self) -> bool { false }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        no_children(self.node_name(), children)?;
        Ok(self.clone().into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// Rows known up front, e.g. an inline `VALUES` list. A relation without a
/// row count stands for a source whose size is not known while planning.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRelation {
    pub output: Vec<Attribute>,
    pub num_rows: Option<usize>,
    pub metadata_output: Vec<Attribute>,
    pub is_streaming: bool,
}

impl LocalRelation {
    pub fn new(output: Vec<Attribute>, num_rows: usize) -> Self {
        Self { output, num_rows: Some(num_rows), metadata_output: vec![], is_streaming: false }
    }

    pub fn unbounded(output: Vec<Attribute>) -> Self {
        Self { output, num_rows: None, metadata_output: vec![], is_streaming: false }
    }

    pub fn with_metadata_output(mut self, metadata_output: Vec<Attribute>) -> Self {
        self.metadata_output = metadata_output;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.is_streaming = true;
        self
    }
}

impl LogicalNode for LocalRelation {
    fn node_name(&self) -> &'static str { "LocalRelation" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![] }

    fn output(&self) -> Vec<Attribute> { self.output.clone() }

    fn valid_constraints(&self) -> ConstraintSet { ConstraintSet::new() }

    fn max_rows(&self) -> Option<i64> { self.num_rows.and_then(|n| i64::try_from(n).ok()) }

    fn metadata_output(&self) -> Vec<Attribute> { self.metadata_output.clone() }

    fn produced_attributes(&self) -> AttributeSet { self.output.iter().collect() }

    fn is_streaming(&self) -> bool { self.is_streaming }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        no_children(self.node_name(), children)?;
        Ok(self.clone().into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        LocalRelation {
            output: self.output.iter().map(|a| map_attribute(f, a)).collect(),
            metadata_output: self.metadata_output.iter().map(|a| map_attribute(f, a)).collect(),
            ..self.clone()
        }
        .into()
    }
}

/// A table name the catalog has not looked up yet. Never resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedRelation {
    pub multipart_identifier: Vec<String>,
}

impl UnresolvedRelation {
    pub fn new(name: &str) -> Self {
        Self { multipart_identifier: name.split('.').map(str::to_string).collect() }
    }

    pub fn table_name(&self) -> String {
        self.multipart_identifier.join(".")
    }
}

impl LogicalNode for UnresolvedRelation {
    fn node_name(&self) -> &'static str { "UnresolvedRelation" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![] }

    fn output(&self) -> Vec<Attribute> { vec![] }

    fn resolved(&self) -> bool { false }

    fn valid_constraints(&self) -> ConstraintSet { ConstraintSet::new() }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn is_streaming(&self) -> bool { false }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        no_children(self.node_name(), children)?;
        Ok(self.clone().into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// `range(start, end, step)`: the single `id` column counting from `start`
/// towards `end` (exclusive) in increments of `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub start: i64,
    pub end: i64,
    pub step: i64,
    pub num_slices: Option<usize>,
    pub output: Vec<Attribute>,
    pub is_streaming: bool,
}

impl Range {
    pub fn new(start: i64, end: i64, step: i64, num_slices: Option<usize>) -> PlanResult<Self> {
        let id = Attribute::new("id", DataType::Long, false);
        Self::with_output(start, end, step, num_slices, vec![id])
    }

    pub fn with_output(
        start: i64,
        end: i64,
        step: i64,
        num_slices: Option<usize>,
        output: Vec<Attribute>,
    ) -> PlanResult<Self> {
        if step == 0 {
            debug!(start, end, "rejecting range with zero step");
            return Err(PlanError::ZeroRangeStep { start, end });
        }
        Ok(Self { start, end, step, num_slices, output, is_streaming: false })
    }

    /// Number of values produced; zero when `step` points away from `end`.
    pub fn num_elements(&self) -> BigInt {
        let span = BigInt::from(self.end) - BigInt::from(self.start);
        let step = BigInt::from(self.step);
        let zero = BigInt::from(0);
        let exact = &span % &step == zero || (self.end > self.start) != (self.step > 0);
        let count = if exact { &span / &step } else { &span / &step + 1 };
        if count < zero { zero } else { count }
    }

    /// SQL that produces the same rows.
    pub fn to_sql(&self) -> String {
        let name = self.output.first().map(|a| a.name.as_str()).unwrap_or("id");
        let slices = self.num_slices.map(|n| format!(", {n}")).unwrap_or_default();
        format!("SELECT id AS `{name}` FROM range({}, {}, {}{slices})", self.start, self.end, self.step)
    }
}

impl LogicalNode for Range {
    fn node_name(&self) -> &'static str { "Range" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![] }

    fn output(&self) -> Vec<Attribute> { self.output.clone() }

    fn valid_constraints(&self) -> ConstraintSet { ConstraintSet::new() }

    fn max_rows(&self) -> Option<i64> { i64::try_from(&self.num_elements()).ok() }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn output_ordering(&self) -> Vec<SortOrder> {
        self.output
            .iter()
            .map(|a| if self.step > 0 { SortOrder::asc(Expr::attr(a)) } else { SortOrder::desc(Expr::attr(a)) })
            .collect()
    }

    fn produced_attributes(&self) -> AttributeSet { self.output.iter().collect() }

    fn is_streaming(&self) -> bool { self.is_streaming }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        no_children(self.node_name(), children)?;
        Ok(self.clone().into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Range { output: self.output.iter().map(|a| map_attribute(f, a)).collect(), ..self.clone() }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(start: i64, end: i64, step: i64) -> BigInt {
        Range::new(start, end, step, None).unwrap().num_elements()
    }

    #[test]
    fn range_counts() {
        assert_eq!(count(0, 10, 2), BigInt::from(5));
        assert_eq!(count(0, 10, 3), BigInt::from(4));
        assert_eq!(count(10, 0, -3), BigInt::from(4));
        assert_eq!(count(0, 0, 1), BigInt::from(0));
    }

    #[test]
    fn range_pointing_away_from_end_is_empty() {
        assert_eq!(count(10, 0, 3), BigInt::from(0));
        assert_eq!(count(0, 10, -1), BigInt::from(0));
    }

    #[test]
    fn zero_step_is_rejected() {
        assert_eq!(Range::new(0, 10, 0, None), Err(PlanError::ZeroRangeStep { start: 0, end: 10 }));
    }

    #[test]
    fn full_span_does_not_fit_max_rows() {
        let range = LogicalPlan::new(Range::new(i64::MIN, i64::MAX, 1, None).unwrap());
        assert_eq!(range.max_rows(), None);
        let range = LogicalPlan::new(Range::new(i64::MIN, i64::MAX, 4, None).unwrap());
        assert_eq!(range.max_rows(), Some(1 << 62));
    }

    #[test]
    fn range_output_is_a_non_nullable_ordered_id() {
        let asc = LogicalPlan::new(Range::new(0, 10, 1, Some(4)).unwrap());
        let id = &asc.output()[0];
        assert_eq!((id.name.as_str(), &id.data_type, id.nullable), ("id", &DataType::Long, false));
        assert!(asc.output_ordering()[0].is_ascending());
        assert!(asc.resolved());
        assert!(asc.constraints().contains(&Expr::attr(id).is_not_null()));

        let desc = LogicalPlan::new(Range::new(10, 0, -1, None).unwrap());
        assert!(!desc.output_ordering()[0].is_ascending());
    }

    #[test]
    fn range_sql() {
        let range = Range::new(0, 10, 2, Some(3)).unwrap();
        assert_eq!(range.to_sql(), "SELECT id AS `id` FROM range(0, 10, 2, 3)");
    }

    #[test]
    fn leaves_reject_children() {
        let one = LogicalPlan::new(OneRowRelation);
        assert_eq!(one.max_rows(), Some(1));
        let err = one.with_new_children(vec![one.clone()]).unwrap_err();
        assert_eq!(err, PlanError::ChildCountMismatch { node: "OneRowRelation", expected: 0, got: 1 });
    }

    #[test]
    fn unresolved_relation_never_resolves() {
        let rel = LogicalPlan::new(UnresolvedRelation::new("db.t"));
        assert!(!rel.resolved());
        assert!(rel.output().is_empty());
    }
}
