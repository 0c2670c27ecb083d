use crate::{
    error::{PlanError, PlanResult},
    expr::{Attribute, AttributeSet, Expr, SortOrder},
    planner::{ConstraintSet, LogicalPlan, PlanNode},
};

/// Derivation surface shared by every operator.
///
/// Defaults follow the unary shape: one child whose constraints, metadata
/// columns and streaming flag pass through. Leaves and multi-child operators
/// override what differs.
pub trait LogicalNode {
    fn node_name(&self) -> &'static str;

    fn children(&self) -> Vec<&LogicalPlan>;

    /// Expressions owned by this node (not by its children).
    fn expressions(&self) -> Vec<&Expr> {
        vec![]
    }

    fn output(&self) -> Vec<Attribute>;

    fn resolved(&self) -> bool {
        self.expressions().iter().all(|e| e.resolved()) && self.children().iter().all(|c| c.resolved())
    }

    /// Constraints this node guarantees before equality and not-null inference.
    fn valid_constraints(&self) -> ConstraintSet {
        match self.children().as_slice() {
            [child] => child.constraints().clone(),
            _ => ConstraintSet::new(),
        }
    }

    fn max_rows(&self) -> Option<i64> {
        None
    }

    fn max_rows_per_partition(&self) -> Option<i64> {
        self.max_rows()
    }

    fn metadata_output(&self) -> Vec<Attribute> {
        match self.children().as_slice() {
            [child] => child.metadata_output().to_vec(),
            _ => vec![],
        }
    }

    fn output_ordering(&self) -> Vec<SortOrder> {
        vec![]
    }

    /// Attributes this node introduces itself rather than receiving from a child.
    fn produced_attributes(&self) -> AttributeSet {
        AttributeSet::new()
    }

    /// Attributes read by this node's expressions.
    fn references(&self) -> AttributeSet {
        self.expressions().iter().fold(AttributeSet::new(), |acc, e| acc.union(&e.references()))
    }

    fn is_order_preserving(&self) -> bool {
        false
    }

    fn is_streaming(&self) -> bool {
        self.children().iter().any(|c| c.is_streaming())
    }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode>;

    /// Rebuild the node with every owned expression mapped through `f`,
    /// including explicitly carried output attributes.
    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode;
}

pub trait UnaryNode {
    fn child(&self) -> &LogicalPlan;

    /// Child constraints plus those implied by the aliases in `named`.
    ///
    /// `lit AS x` adds `x <=> lit`; `e AS x` restates every constraint on `e`
    /// in terms of `x` and adds `e <=> x`.
    fn aliased_constraints(&self, named: &[Expr]) -> ConstraintSet {
        let mut all = self.child().constraints().clone();
        for e in named {
            if let Expr::Alias(alias) = e {
                let attr = Expr::Attribute(alias.to_attribute());
                match alias.child.as_ref() {
                    Expr::Literal(_) => all.insert(attr.eq_null_safe(*alias.child.clone())),
                    child => {
                        let restated: Vec<Expr> = all.iter().map(|c| c.replace_semantic(child, &attr)).collect();
                        all.extend(restated);
                        all.insert(child.clone().eq_null_safe(attr));
                    }
                }
            }
        }
        all
    }
}

/// A unary operator that keeps its child's rows, columns and ordering.
pub trait OrderPreservingUnaryNode: UnaryNode {
    fn passthrough_output(&self) -> Vec<Attribute> {
        self.child().output().to_vec()
    }

    fn passthrough_ordering(&self) -> Vec<SortOrder> {
        self.child().output_ordering()
    }
}

pub(crate) fn no_children(node: &'static str, children: Vec<LogicalPlan>) -> PlanResult<()> {
    if children.is_empty() {
        Ok(())
    } else {
        Err(PlanError::ChildCountMismatch { node, expected: 0, got: children.len() })
    }
}

pub(crate) fn single_child(node: &'static str, children: Vec<LogicalPlan>) -> PlanResult<Box<LogicalPlan>> {
    let got = children.len();
    match <[LogicalPlan; 1]>::try_from(children) {
        Ok([child]) => Ok(Box::new(child)),
        Err(_) => Err(PlanError::ChildCountMismatch { node, expected: 1, got }),
    }
}

pub(crate) fn two_children(
    node: &'static str,
    children: Vec<LogicalPlan>,
) -> PlanResult<(Box<LogicalPlan>, Box<LogicalPlan>)> {
    let got = children.len();
    match <[LogicalPlan; 2]>::try_from(children) {
        Ok([left, right]) => Ok((Box::new(left), Box::new(right))),
        Err(_) => Err(PlanError::ChildCountMismatch { node, expected: 2, got }),
    }
}

/// Map an explicitly carried attribute through an expression rewrite.
pub(crate) fn map_attribute(f: &mut dyn FnMut(&Expr) -> Expr, attr: &Attribute) -> Attribute {
    match f(&Expr::Attribute(attr.clone())) {
        Expr::Attribute(mapped) => mapped,
        _ => attr.clone(),
    }
}

pub(crate) fn map_all(f: &mut dyn FnMut(&Expr) -> Expr, exprs: &[Expr]) -> Vec<Expr> {
    exprs.iter().map(|e| f(e)).collect()
}
