use tracing::debug;

use crate::{
    config::PlanConf,
    error::{PlanError, PlanResult},
    expr::{Attribute, AttributeSet, Expr, SortOrder},
    planner::{map_all, map_attribute, single_child, LogicalNode, LogicalPlan, PlanNode},
};

/// How rows are spread across output partitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Partitioning {
    Single,
    RoundRobin(i64),
    Hash(Vec<Expr>, i64),
    Range(Vec<SortOrder>, i64),
}

impl Partitioning {
    pub fn num_partitions(&self) -> i64 {
        match self {
            Partitioning::Single => 1,
            Partitioning::RoundRobin(n) | Partitioning::Hash(_, n) | Partitioning::Range(_, n) => *n,
        }
    }
}

fn check_partitions(num_partitions: i64) -> PlanResult<()> {
    if num_partitions > 0 {
        Ok(())
    } else {
        debug!(num_partitions, "rejecting repartition");
        Err(PlanError::NonPositivePartitions(num_partitions))
    }
}

/// `REPARTITION(n)` / `COALESCE(n)`: a fixed partition count without keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Repartition {
    pub num_partitions: i64,
    pub shuffle: bool,
    pub child: Box<LogicalPlan>,
}

impl Repartition {
    pub fn new(num_partitions: i64, shuffle: bool, child: LogicalPlan) -> PlanResult<Self> {
        check_partitions(num_partitions)?;
        Ok(Self { num_partitions, shuffle, child: Box::new(child) })
    }

    pub fn partitioning(&self) -> Partitioning {
        if self.num_partitions == 1 { Partitioning::Single } else { Partitioning::RoundRobin(self.num_partitions) }
    }
}

impl LogicalNode for Repartition {
    fn node_name(&self) -> &'static str { "Repartition" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Repartition { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// `DISTRIBUTE BY` / `REPARTITION(n, exprs)`: range partitioning when every
/// expression is a sort order, hash partitioning when none is.
#[derive(Debug, Clone, PartialEq)]
pub struct RepartitionByExpression {
    pub partition_expressions: Vec<Expr>,
    pub num_partitions: i64,
    pub child: Box<LogicalPlan>,
}

impl RepartitionByExpression {
    /// Without an explicit count the session's shuffle partition count is used.
    pub fn new(
        partition_expressions: Vec<Expr>,
        num_partitions: Option<i64>,
        child: LogicalPlan,
        conf: &PlanConf,
    ) -> PlanResult<Self> {
        let num_partitions = num_partitions.unwrap_or(conf.shuffle_partitions);
        check_partitions(num_partitions)?;
        let (sort_orders, others): (Vec<&Expr>, Vec<&Expr>) =
            partition_expressions.iter().partition(|e| matches!(e, Expr::SortOrder(_)));
        if !sort_orders.is_empty() && !others.is_empty() {
            let list = |exprs: &[&Expr]| exprs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            return Err(PlanError::MixedPartitionExpressions {
                sort_orders: list(&sort_orders),
                others: list(&others),
            });
        }
        Ok(Self { partition_expressions, num_partitions, child: Box::new(child) })
    }

    pub fn partitioning(&self) -> Partitioning {
        let orders: Vec<SortOrder> = self
            .partition_expressions
            .iter()
            .filter_map(|e| match e {
                Expr::SortOrder(order) => Some(order.clone()),
                _ => None,
            })
            .collect();
        if self.partition_expressions.is_empty() {
            Partitioning::RoundRobin(self.num_partitions)
        } else if orders.len() == self.partition_expressions.len() {
            Partitioning::Range(orders, self.num_partitions)
        } else {
            Partitioning::Hash(self.partition_expressions.clone(), self.num_partitions)
        }
    }
}

impl LogicalNode for RepartitionByExpression {
    fn node_name(&self) -> &'static str { "RepartitionByExpression" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn expressions(&self) -> Vec<&Expr> { self.partition_expressions.iter().collect() }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(RepartitionByExpression { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        RepartitionByExpression { partition_expressions: map_all(f, &self.partition_expressions), ..self.clone() }
            .into()
    }
}

/// `SELECT DISTINCT`: removes duplicate rows, so the child's bound still holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Distinct {
    pub child: Box<LogicalPlan>,
}

impl Distinct {
    pub fn new(child: LogicalPlan) -> Self {
        Self { child: Box::new(child) }
    }
}

impl LogicalNode for Distinct {
    fn node_name(&self) -> &'static str { "Distinct" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Distinct { child: single_child(self.node_name(), children)? }.into())
    }

    fn map_expressions(&self, _f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        self.clone().into()
    }
}

/// Keeps one row per distinct value of `keys`.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduplicate {
    pub keys: Vec<Attribute>,
    pub child: Box<LogicalPlan>,
}

impl Deduplicate {
    pub fn new(keys: Vec<Attribute>, child: LogicalPlan) -> Self {
        Self { keys, child: Box::new(child) }
    }
}

impl LogicalNode for Deduplicate {
    fn node_name(&self) -> &'static str { "Deduplicate" }

    fn children(&self) -> Vec<&LogicalPlan> { vec![&self.child] }

    fn output(&self) -> Vec<Attribute> { self.child.output().to_vec() }

    fn references(&self) -> AttributeSet { self.keys.iter().collect() }

    fn max_rows(&self) -> Option<i64> { self.child.max_rows() }

    fn with_new_children(&self, children: Vec<LogicalPlan>) -> PlanResult<PlanNode> {
        Ok(Deduplicate { child: single_child(self.node_name(), children)?, ..self.clone() }.into())
    }

    fn map_expressions(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> PlanNode {
        Deduplicate { keys: self.keys.iter().map(|k| map_attribute(f, k)).collect(), ..self.clone() }.into()
    }
}
