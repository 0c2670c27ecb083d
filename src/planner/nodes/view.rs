use indexmap::IndexMap;
use tracing::debug;

use crate::{
    catalog::CatalogTable,
    config::PlanConf,
    error::PlanResult,
    expr::{Attribute, Expr, SortOrder, WindowSpec},
    planner::{map_all, single_child, LogicalNode, LogicalPlan, PlanNode},
};

/// A catalog view standing in for its defining query.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub desc: CatalogTable,
    pub is_temp: bool,
    pub child: Box<LogicalPlan>,
}

impl View {
    pub fn new(desc: CatalogTable, is_temp: bool, child: LogicalPlan) -> Self {
        Self { desc, is_temp, child: Box::new(child) }
    }

    /// Options the view body is analyzed with.
    ///
    /// Temporary views always use what they captured; permanent views use
    /// `current` instead when `use_current_config_for_view` is set.
    pub fn effective_conf(&self, current: &PlanConf) -> PlanResult<PlanConf> {
        if current.use_current_config_for_view && !self.is_temp {
            return Ok(current.clone());
        }
        let captured = self.desc.captured_conf()?;
        debug!(is_temp = self.is_temp, ?captured, "using view captured configuration");
        Ok(captured)
    }
}

impl LogicalNode for View {
    fn node_name(&self) -> &'static str { "View" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn resolved(&self) -> bool { self.child.resolved() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn metadata_output(&self) -> Vec<Attribute> { vec![] }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(View { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// `WITH name AS (...) <child>`. The named relations are not children; the
/// analyzer inlines them where they are referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub child: Box<LogicalPlan>,
    pub cte_relations: Vec<(String, LogicalPlan)>,
}

impl With {
    pub fn new(child: LogicalPlan, cte_relations: Vec<(String, LogicalPlan)>) -> Self {
        Self { child: Box::new(child), cte_relations }
    }

    pub fn cte(&self, name: &str) -> Option<&LogicalPlan> {
        self.cte_relations.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, plan)| plan)
    }
}

impl LogicalNode for With {
    fn node_name(&self) -> &'static str { "With" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(With { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// `WINDOW w AS (...)` definitions visible to the window expressions below.
#[derive(Debug, Clone, PartialEq)]
pub struct WithWindowDefinition {
    pub window_definitions: IndexMap<String, WindowSpec>,
    pub child: Box<LogicalPlan>,
}

impl WithWindowDefinition {
    pub fn new(window_definitions: IndexMap<String, WindowSpec>, child: LogicalPlan) -> Self {
        Self { window_definitions, child: Box::new(child) }
    }
}

impl LogicalNode for WithWindowDefinition {
    fn node_name(&self) -> &'static str { "WithWindowDefinition" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> {
        self.window_definitions
            .values()
            .flat_map(|spec| spec.partition_spec.iter().chain(spec.order_spec.iter().map(|o| o.child.as_ref())))
            .collect()
    }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(WithWindowDefinition { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        let window_definitions = self
            .window_definitions
            .iter()
            .map(|(name, spec)| {
                let order_spec = spec
                    .order_spec
                    .iter()
                    .map(|o| SortOrder { child: Box::new(f(&o.child)), ..o.clone() })
                    .collect();
                (name.clone(), WindowSpec::new(map_all(f, &spec.partition_spec), order_spec))
            })
            .collect();
        WithWindowDefinition { window_definitions, ..self.clone() }.into()
    }
}
