use std::fmt;

use crate::{
    error::PlanResult,
    expr::{Attribute, Expr, SortOrder},
    planner::{single_child, LogicalNode, LogicalPlan, OrderPreservingUnaryNode, PlanNode, UnaryNode},
};

/// `name` optionally prefixed by a qualifier path, e.g. `catalog.db.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasIdentifier {
    pub name: String,
    pub qualifier: Vec<String>,
}

impl AliasIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), qualifier: vec![] }
    }

    pub fn with_qualifier(name: impl Into<String>, qualifier: Vec<String>) -> Self {
        Self { name: name.into(), qualifier }
    }

    /// The qualifier given to every column seen through the alias.
    pub fn qualifier_path(&self) -> Vec<String> {
        let mut path = self.qualifier.clone();
        path.push(self.name.clone());
        path
    }
}

impl fmt::Display for AliasIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualifier_path().join("."))
    }
}

/// `(...) AS t`: the child's columns re-qualified by the alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryAlias {
    pub identifier: AliasIdentifier,
    pub child: Box<LogicalPlan>,
}

impl SubqueryAlias {
    pub fn new(alias: impl Into<String>, child: LogicalPlan) -> Self {
        Self { identifier: AliasIdentifier::new(alias), child: Box::new(child) }
    }

    pub fn with_identifier(identifier: AliasIdentifier, child: LogicalPlan) -> Self {
        Self { identifier, child: Box::new(child) }
    }

    pub fn alias(&self) -> &str {
        &self.identifier.name
    }

    fn requalify(&self, attrs: &[Attribute]) -> Vec<Attribute> {
        let path = self.identifier.qualifier_path();
        attrs.iter().map(|a| a.with_qualifier(path.clone())).collect()
    }
}

impl UnaryNode for SubqueryAlias {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl OrderPreservingUnaryNode for SubqueryAlias {}

impl LogicalNode for SubqueryAlias {
    fn node_name(&self) -> &'static str { "SubqueryAlias" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.requalify(self.child.output()) }

    fn metadata_output(&self) -> Vec<Attribute> { self.requalify(self.child.metadata_output()) }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn output_ordering(&self) -> Vec<SortOrder> { self.passthrough_ordering() }

    fn is_order_preserving(&self) -> bool { true }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(SubqueryAlias { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// Root of a subquery plan, marking whether it reads outer columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub child: Box<LogicalPlan>,
    pub correlated: bool,
}

impl Subquery {
    pub fn new(child: LogicalPlan, correlated: bool) -> Self {
        Self { child: Box::new(child), correlated }
    }
}

impl UnaryNode for Subquery {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl OrderPreservingUnaryNode for Subquery {}

impl LogicalNode for Subquery {
    fn node_name(&self) -> &'static str { "Subquery" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.passthrough_output() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn output_ordering(&self) -> Vec<SortOrder> { self.passthrough_ordering() }

    fn is_order_preserving(&self) -> bool { true }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Subquery { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// Marks the root of the plan whose rows are returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnAnswer {
    pub child: Box<LogicalPlan>,
}

impl ReturnAnswer {
    pub fn new(child: LogicalPlan) -> Self {
        Self { child: Box::new(child) }
    }
}

impl LogicalNode for ReturnAnswer {
    fn node_name(&self) -> &'static str { "ReturnAnswer" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(ReturnAnswer { child: single_child(self.node_name(), children)? }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}
