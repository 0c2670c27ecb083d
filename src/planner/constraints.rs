use crate::{
    expr::{Attribute, BinaryOperator, Expr},
    planner::{ConstraintSet, LogicalPlan},
};

/// Completes a node's valid constraints with what can be inferred from them.
pub struct ConstraintInference;

impl ConstraintInference {
    /// `valid ∪ equality substitutions ∪ not-null facts`, keeping only
    /// deterministic predicates over this node's own output.
    pub fn constraints_for(plan: &LogicalPlan) -> ConstraintSet {
        let valid = plan.valid_constraints();
        let inferred = Self::infer_additional(&valid);
        let not_null = Self::is_not_null_constraints(&valid, plan.output());
        let output = plan.output_set();

        valid.union(&inferred).union(&not_null).filter(|c| {
            let refs = c.references();
            !refs.is_empty() && refs.subset_of(output) && c.deterministic()
        })
    }

    /// For every `a = b` between attributes, restate the other predicates
    /// with `a` and `b` swapped.
    pub fn infer_additional(constraints: &ConstraintSet) -> ConstraintSet {
        let predicates = constraints.filter(|c| !matches!(c, Expr::IsNotNull(_)));
        let mut inferred = ConstraintSet::new();
        for p in predicates.iter() {
            if let Expr::Binary { op: BinaryOperator::Eq, left, right } = p {
                if let (Expr::Attribute(l), Expr::Attribute(r)) = (left.as_ref(), right.as_ref()) {
                    let candidates = predicates.filter(|c| c != p);
                    inferred.extend(Self::replace_constraints(&candidates, l, r).iter().cloned());
                    inferred.extend(Self::replace_constraints(&candidates, r, l).iter().cloned());
                }
            }
        }
        inferred.difference(constraints)
    }

    fn replace_constraints(constraints: &ConstraintSet, source: &Attribute, destination: &Attribute) -> ConstraintSet {
        let source = Expr::Attribute(source.clone());
        let destination = Expr::Attribute(destination.clone());
        constraints.map(|c| c.replace_semantic(&source, &destination))
    }

    /// `IsNotNull` for every attribute reached through null-intolerant
    /// expressions of a constraint, and for every non-nullable output column.
    pub fn is_not_null_constraints(constraints: &ConstraintSet, output: &[Attribute]) -> ConstraintSet {
        let mut out = ConstraintSet::new();
        for c in constraints.iter() {
            let root = match c {
                Expr::IsNotNull(inner) => inner.as_ref(),
                other => other,
            };
            let mut attrs = Vec::new();
            Self::scan_null_intolerant_attributes(root, &mut attrs);
            out.extend(attrs.into_iter().map(|a| Expr::Attribute(a).is_not_null()));
        }
        out.extend(output.iter().filter(|a| !a.nullable).map(|a| Expr::attr(a).is_not_null()));
        out.difference(constraints)
    }

    fn scan_null_intolerant_attributes(e: &Expr, out: &mut Vec<Attribute>) {
        match e {
            Expr::Attribute(a) => out.push(a.clone()),
            Expr::Binary { op, left, right } if op.is_null_intolerant() => {
                Self::scan_null_intolerant_attributes(left, out);
                Self::scan_null_intolerant_attributes(right, out);
            }
            Expr::Not(child) | Expr::Cast { child, .. } => Self::scan_null_intolerant_attributes(child, out),
            _ => {}
        }
    }
}
