//! Canonical plans: the same tree with cosmetic differences erased, so two
//! plans computing the same rows compare equal.

use tracing::debug;

use crate::{
    expr::{Alias, Attribute, Expr, ExprId},
    planner::{Join, JoinHint, LogicalPlan, PlanNode, Project},
};

pub(crate) fn canonicalize(plan: &LogicalPlan) -> LogicalPlan {
    match plan.node() {
        PlanNode::SubqueryAlias(n) => n.child.canonicalized().clone(),
        PlanNode::ResolvedHint(n) => n.child.canonicalized().clone(),
        PlanNode::View(n) => strip_view_project(&n.child).canonicalized().clone(),
        _ => normalize(plan),
    }
}

/// A view body wrapped in a projection that only restates the inner
/// projection's names and types reads the same as the inner projection.
fn strip_view_project(body: &LogicalPlan) -> &LogicalPlan {
    let PlanNode::Project(Project { project_list: outer, child }) = body.node() else {
        return body;
    };
    let PlanNode::Project(Project { project_list: inner, .. }) = child.node() else {
        return body;
    };
    let same_output = outer.len() == inner.len()
        && outer.iter().zip(inner).all(|(o, i)| o.name() == i.name() && o.data_type() == i.data_type());
    if same_output { child.as_ref() } else { body }
}

fn normalize(plan: &LogicalPlan) -> LogicalPlan {
    let children: Vec<LogicalPlan> = plan.children().iter().map(|c| c.canonicalized().clone()).collect();
    let input: Vec<Attribute> = plan.children().iter().flat_map(|c| c.output().iter().cloned()).collect();

    let mut next_id = 0usize;
    let mut fresh_id = || {
        let id = ExprId::canonical(next_id);
        next_id += 1;
        id
    };
    let mapped = plan.map_expressions(&mut |e| match e {
        Expr::Alias(alias) => Expr::Alias(Alias {
            child: Box::new(normalize_expression(&alias.child, &input)),
            name: String::new(),
            expr_id: fresh_id(),
            qualifier: alias.qualifier.clone(),
            metadata: None,
        }),
        Expr::Attribute(a) if ordinal(&input, a).is_none() => {
            Expr::Attribute(a.with_expr_id(fresh_id())).canonicalized()
        }
        other => normalize_expression(other, &input),
    });

    let rebuilt = match mapped.with_new_children(children) {
        Ok(rebuilt) => rebuilt,
        Err(err) => {
            debug!(%err, node = plan.node_name(), "keeping original children in canonical form");
            mapped
        }
    };
    match rebuilt.node() {
        PlanNode::Join(join) => LogicalPlan::new(Join { hint: JoinHint::NONE, ..join.clone() }),
        _ => rebuilt,
    }
}

fn ordinal(input: &[Attribute], attr: &Attribute) -> Option<usize> {
    input.iter().position(|i| i.same_ref(attr))
}

/// Input references become positional ids, then the whole expression is
/// put in canonical form.
fn normalize_expression(e: &Expr, input: &[Attribute]) -> Expr {
    e.transform_up(&mut |e| match e {
        Expr::Attribute(a) => match ordinal(input, &a) {
            Some(i) => Expr::Attribute(a.with_expr_id(ExprId::canonical(i))),
            None => Expr::Attribute(a),
        },
        other => other,
    })
    .canonicalized()
}
