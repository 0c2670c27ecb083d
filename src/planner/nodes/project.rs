use std::collections::HashSet;

use crate::{
    error::PlanResult,
    expr::{Attribute, AttributeSet, Expr, SortOrder},
    planner::{
        map_all, map_attribute, single_child, ConstraintSet, LogicalNode, LogicalPlan,
        OrderPreservingUnaryNode, PlanNode, UnaryNode,
    },
};

/// `SELECT <project_list>`: one output column per named expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub project_list: Vec<Expr>,
    pub child: Box<LogicalPlan>,
}

impl Project {
    pub fn new(project_list: Vec<Expr>, child: LogicalPlan) -> Self {
        Self { project_list, child: Box::new(child) }
    }

    /// Aggregates, generators and windows need their own operators.
    fn has_special_expressions(&self) -> bool {
        self.project_list
            .iter()
            .any(|e| e.contains_aggregate() || e.contains_generator() || e.contains_window())
    }
}

impl UnaryNode for Project {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl OrderPreservingUnaryNode for Project {}

impl LogicalNode for Project {
    fn node_name(&self) -> &'static str { "Project" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { self.project_list.iter().collect() }

    fn output(&self) -> Vec<Attribute> {
        self.project_list.iter().filter_map(Expr::to_attribute).collect()
    }

    fn resolved(&self) -> bool {
        self.project_list.iter().all(|e| e.resolved() && e.is_named())
            && self.child.resolved()
            && !self.has_special_expressions()
    }

    fn valid_constraints(&self) -> ConstraintSet {
        self.aliased_constraints(&self.project_list)
    }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn output_ordering(&self) -> Vec<SortOrder> { self.passthrough_ordering() }

    fn is_order_preserving(&self) -> bool { true }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Project { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Project { project_list: map_all(f, &self.project_list), ..self.clone() }.into()
    }
}

/// Lateral expansion of each input row through a generator (`explode` and friends).
#[derive(Debug, Clone, PartialEq)]
pub struct Generate {
    pub generator: Expr,
    /// Child column positions not needed above this node.
    pub unrequired_child_index: Vec<usize>,
    /// Emit a row of nulls when the generator yields nothing.
    pub outer: bool,
    pub qualifier: Option<String>,
    pub generator_output: Vec<Attribute>,
    pub child: Box<LogicalPlan>,
}

impl Generate {
    pub fn new(
        generator: Expr,
        unrequired_child_index: Vec<usize>,
        outer: bool,
        qualifier: Option<String>,
        generator_output: Vec<Attribute>,
        child: LogicalPlan,
    ) -> Self {
        Self { generator, unrequired_child_index, outer, qualifier, generator_output, child: Box::new(child) }
    }

    pub fn required_child_output(&self) -> Vec<Attribute> {
        let unrequired: HashSet<usize> = self.unrequired_child_index.iter().copied().collect();
        self.child
            .output()
            .iter()
            .enumerate()
            .filter(|(i, _)| !unrequired.contains(i))
            .map(|(_, a)| a.clone())
            .collect()
    }

    pub fn qualified_generator_output(&self) -> Vec<Attribute> {
        self.generator_output
            .iter()
            .map(|a| {
                let a = match &self.qualifier {
                    Some(q) => a.with_qualifier(vec![q.clone()]),
                    None => a.clone(),
                };
                if self.outer { a.with_nullability(true) } else { a }
            })
            .collect()
    }
}

impl UnaryNode for Generate {
    fn child(&self) -> &LogicalPlan { &self.child }
}

impl LogicalNode for Generate {
    fn node_name(&self) -> &'static str { "Generate" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { vec![&self.generator] }

    fn output(&self) -> Vec<Attribute> {
        let mut out = self.required_child_output();
        out.extend(self.qualified_generator_output());
        out
    }

    fn resolved(&self) -> bool {
        let schema_matches = match &self.generator {
            Expr::Generator { element_schema, .. } => element_schema.len() == self.generator_output.len(),
            _ => false,
        };
        self.generator.resolved() && self.child.resolved() && schema_matches
    }

    fn produced_attributes(&self) -> AttributeSet { self.generator_output.iter().collect() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Generate { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Generate {
            generator: f(&self.generator),
            generator_output: self.generator_output.iter().map(|a| map_attribute(f, a)).collect(),
            ..self.clone()
        }
        .into()
    }
}
