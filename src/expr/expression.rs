use std::fmt;

use crate::{
    expr::{Attribute, AttributeSet, ExprId, Literal, Metadata},
    planner::LogicalPlan,
    types::{DataType, StructField},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Null-safe equality (`<=>`): never null, true when both sides are null.
    EqNullSafe,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Eq | NotEq | Lt | LtEq | Gt | GtEq | EqNullSafe)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    pub fn is_arithmetic(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Plus | Minus | Multiply | Divide)
    }

    pub fn is_commutative(self) -> bool {
        use BinaryOperator::*;
        matches!(self, Plus | Multiply | Eq | NotEq | EqNullSafe | And | Or)
    }

    /// The operator that gives the same result with its operands swapped.
    pub fn flipped(self) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        match self {
            Lt => Some(Gt),
            Gt => Some(Lt),
            LtEq => Some(GtEq),
            GtEq => Some(LtEq),
            op if op.is_commutative() => Some(op),
            _ => None,
        }
    }

    /// Null in, null out. `<=>`, AND and OR can turn a null input into a value.
    pub fn is_null_intolerant(self) -> bool {
        !matches!(self, BinaryOperator::EqNullSafe | BinaryOperator::And | BinaryOperator::Or)
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Plus => "+",
            Minus => "-",
            Multiply => "*",
            Divide => "/",
            Eq => "=",
            NotEq => "!=",
            Lt => "<",
            LtEq => "<=",
            Gt => ">",
            GtEq => ">=",
            EqNullSafe => "<=>",
            And => "AND",
            Or => "OR",
        }
    }
}

/// `child AS name`: introduces a new column.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub child: Box<Expr>,
    pub name: String,
    pub expr_id: ExprId,
    pub qualifier: Vec<String>,
    pub metadata: Option<Metadata>,
}

impl Alias {
    pub fn new(child: Expr, name: impl Into<String>) -> Self {
        Self {
            child: Box::new(child),
            name: name.into(),
            expr_id: ExprId::next(),
            qualifier: vec![],
            metadata: None,
        }
    }

    pub fn to_attribute(&self) -> Attribute {
        let metadata = match (&self.metadata, self.child.as_ref()) {
            (Some(m), _) => m.clone(),
            (None, Expr::Attribute(a)) => a.metadata.clone(),
            (None, _) => Metadata::new(),
        };
        Attribute {
            name: self.name.clone(),
            data_type: self.child.data_type(),
            nullable: self.child.nullable(),
            metadata,
            expr_id: self.expr_id,
            qualifier: self.qualifier.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortOrder {
    pub child: Box<Expr>,
    pub direction: SortDirection,
    pub null_ordering: NullOrdering,
}

impl SortOrder {
    /// Ascending with nulls first.
    pub fn asc(child: Expr) -> Self {
        Self { child: Box::new(child), direction: SortDirection::Ascending, null_ordering: NullOrdering::NullsFirst }
    }

    /// Descending with nulls last.
    pub fn desc(child: Expr) -> Self {
        Self { child: Box::new(child), direction: SortDirection::Descending, null_ordering: NullOrdering::NullsLast }
    }

    pub fn is_ascending(&self) -> bool {
        self.direction == SortDirection::Ascending
    }

    fn map_child(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> SortOrder {
        SortOrder { child: Box::new(f(&self.child)), ..self.clone() }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSpec {
    pub partition_spec: Vec<Expr>,
    pub order_spec: Vec<SortOrder>,
}

impl WindowSpec {
    pub fn new(partition_spec: Vec<Expr>, order_spec: Vec<SortOrder>) -> Self {
        Self { partition_spec, order_spec }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubqueryKind {
    Scalar,
    Exists,
    In { values: Vec<Expr> },
}

/// A nested query used as an expression. Outer references make it correlated.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryExpr {
    pub plan: Box<LogicalPlan>,
    pub kind: SubqueryKind,
    pub outer_attrs: Vec<Expr>,
    pub expr_id: ExprId,
}

impl SubqueryExpr {
    pub fn new(plan: LogicalPlan, kind: SubqueryKind, outer_attrs: Vec<Expr>) -> Self {
        Self { plan: Box::new(plan), kind, outer_attrs, expr_id: ExprId::next() }
    }

    pub fn is_correlated(&self) -> bool {
        !self.outer_attrs.is_empty()
    }
}

/// Expression tree.
///
/// The plan algebra consumes expressions through `resolved`, `data_type`,
/// `references` and substitution (`transform_up`, `substitute`); evaluation
/// lives elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Attribute(Attribute),
    /// A name path not yet bound to a column.
    UnresolvedAttribute(Vec<String>),
    Literal(Literal),
    Alias(Alias),
    Binary { op: BinaryOperator, left: Box<Expr>, right: Box<Expr> },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    Cast { child: Box<Expr>, data_type: DataType },
    ScalarFunction { name: String, args: Vec<Expr>, return_type: DataType, deterministic: bool },
    AggregateFunction { name: String, args: Vec<Expr>, distinct: bool, return_type: DataType },
    Window { function: Box<Expr>, spec: WindowSpec },
    /// Set-returning function; each input row yields rows shaped by `element_schema`.
    Generator { name: String, args: Vec<Expr>, element_schema: Vec<StructField> },
    Subquery(SubqueryExpr),
    SortOrder(SortOrder),
}

impl Expr {
    // ---- constructors ----

    pub fn attr(a: &Attribute) -> Expr {
        Expr::Attribute(a.clone())
    }

    pub fn lit(l: Literal) -> Expr {
        Expr::Literal(l)
    }

    pub fn unresolved(name: &str) -> Expr {
        Expr::UnresolvedAttribute(name.split('.').map(str::to_string).collect())
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias(Alias::new(self, name))
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn eq(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::Eq, other)
    }

    pub fn eq_null_safe(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::EqNullSafe, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::Gt, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::Lt, other)
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::GtEq, other)
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::LtEq, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::Or, other)
    }

    pub fn plus(self, other: Expr) -> Expr {
        Expr::binary(self, BinaryOperator::Plus, other)
    }

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn agg(name: impl Into<String>, args: Vec<Expr>, return_type: DataType) -> Expr {
        Expr::AggregateFunction { name: name.into(), args, distinct: false, return_type }
    }

    // ---- capability surface ----

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Attribute(_) | Expr::UnresolvedAttribute(_) | Expr::Literal(_) => vec![],
            Expr::Alias(a) => vec![a.child.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Not(c) | Expr::IsNull(c) | Expr::IsNotNull(c) => vec![c.as_ref()],
            Expr::Cast { child, .. } => vec![child.as_ref()],
            Expr::ScalarFunction { args, .. }
            | Expr::AggregateFunction { args, .. }
            | Expr::Generator { args, .. } => args.iter().collect(),
            Expr::Window { function, spec } => {
                let mut out = vec![function.as_ref()];
                out.extend(spec.partition_spec.iter());
                out.extend(spec.order_spec.iter().map(|o| o.child.as_ref()));
                out
            }
            Expr::Subquery(s) => {
                let mut out: Vec<&Expr> = s.outer_attrs.iter().collect();
                if let SubqueryKind::In { values } = &s.kind {
                    out.extend(values.iter());
                }
                out
            }
            Expr::SortOrder(o) => vec![o.child.as_ref()],
        }
    }

    /// Rebuild this node with every direct child replaced by `f(child)`.
    pub fn map_children(&self, f: &mut dyn FnMut(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Attribute(_) | Expr::UnresolvedAttribute(_) | Expr::Literal(_) => self.clone(),
            Expr::Alias(a) => Expr::Alias(Alias { child: Box::new(f(&a.child)), ..a.clone() }),
            Expr::Binary { op, left, right } => {
                Expr::Binary { op: *op, left: Box::new(f(left)), right: Box::new(f(right)) }
            }
            Expr::Not(c) => Expr::Not(Box::new(f(c))),
            Expr::IsNull(c) => Expr::IsNull(Box::new(f(c))),
            Expr::IsNotNull(c) => Expr::IsNotNull(Box::new(f(c))),
            Expr::Cast { child, data_type } => {
                Expr::Cast { child: Box::new(f(child)), data_type: data_type.clone() }
            }
            Expr::ScalarFunction { name, args, return_type, deterministic } => Expr::ScalarFunction {
                name: name.clone(),
                args: args.iter().map(|a| f(a)).collect(),
                return_type: return_type.clone(),
                deterministic: *deterministic,
            },
            Expr::AggregateFunction { name, args, distinct, return_type } => Expr::AggregateFunction {
                name: name.clone(),
                args: args.iter().map(|a| f(a)).collect(),
                distinct: *distinct,
                return_type: return_type.clone(),
            },
            Expr::Generator { name, args, element_schema } => Expr::Generator {
                name: name.clone(),
                args: args.iter().map(|a| f(a)).collect(),
                element_schema: element_schema.clone(),
            },
            Expr::Window { function, spec } => Expr::Window {
                function: Box::new(f(function)),
                spec: WindowSpec {
                    partition_spec: spec.partition_spec.iter().map(|p| f(p)).collect(),
                    order_spec: spec.order_spec.iter().map(|o| o.map_child(f)).collect(),
                },
            },
            Expr::Subquery(s) => {
                let kind = match &s.kind {
                    SubqueryKind::In { values } => SubqueryKind::In { values: values.iter().map(|v| f(v)).collect() },
                    other => other.clone(),
                };
                Expr::Subquery(SubqueryExpr {
                    plan: s.plan.clone(),
                    kind,
                    outer_attrs: s.outer_attrs.iter().map(|o| f(o)).collect(),
                    expr_id: s.expr_id,
                })
            }
            Expr::SortOrder(o) => Expr::SortOrder(o.map_child(f)),
        }
    }

    pub fn resolved(&self) -> bool {
        let children_resolved = self.children().iter().all(|c| c.resolved());
        match self {
            Expr::UnresolvedAttribute(_) => false,
            Expr::Binary { op, left, right } => {
                children_resolved && Self::binary_input_types_ok(*op, &left.data_type(), &right.data_type())
            }
            Expr::Not(c) => children_resolved && c.data_type() == DataType::Boolean,
            Expr::Subquery(s) => children_resolved && s.plan.resolved(),
            _ => children_resolved,
        }
    }

    fn binary_input_types_ok(op: BinaryOperator, left: &DataType, right: &DataType) -> bool {
        if op.is_logical() {
            left == &DataType::Boolean && right == &DataType::Boolean
        } else if op.is_arithmetic() {
            (left.is_numeric() || left == &DataType::Null) && (right.is_numeric() || right == &DataType::Null)
        } else {
            DataType::merge(left, right).is_some()
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Attribute(a) => a.data_type.clone(),
            Expr::UnresolvedAttribute(_) => DataType::Null,
            Expr::Literal(l) => l.data_type.clone(),
            Expr::Alias(a) => a.child.data_type(),
            Expr::Binary { op, left, right } => {
                if op.is_comparison() || op.is_logical() {
                    DataType::Boolean
                } else {
                    let l = left.data_type();
                    DataType::merge(&l, &right.data_type()).unwrap_or(l)
                }
            }
            Expr::Not(_) | Expr::IsNull(_) | Expr::IsNotNull(_) => DataType::Boolean,
            Expr::Cast { data_type, .. } => data_type.clone(),
            Expr::ScalarFunction { return_type, .. } | Expr::AggregateFunction { return_type, .. } => {
                return_type.clone()
            }
            Expr::Window { function, .. } => function.data_type(),
            Expr::Generator { element_schema, .. } => {
                DataType::array(DataType::Struct(element_schema.clone()), false)
            }
            Expr::Subquery(s) => match s.kind {
                SubqueryKind::Scalar => s.plan.output().first().map(|a| a.data_type.clone()).unwrap_or(DataType::Null),
                SubqueryKind::Exists | SubqueryKind::In { .. } => DataType::Boolean,
            },
            Expr::SortOrder(o) => o.child.data_type(),
        }
    }

    pub fn nullable(&self) -> bool {
        match self {
            Expr::Attribute(a) => a.nullable,
            Expr::UnresolvedAttribute(_) => true,
            Expr::Literal(l) => l.is_null(),
            Expr::Alias(a) => a.child.nullable(),
            Expr::Binary { op: BinaryOperator::EqNullSafe, .. } => false,
            Expr::Binary { op: BinaryOperator::Divide, .. } => true,
            Expr::Binary { left, right, .. } => left.nullable() || right.nullable(),
            Expr::Not(c) | Expr::Cast { child: c, .. } => c.nullable(),
            Expr::IsNull(_) | Expr::IsNotNull(_) => false,
            Expr::ScalarFunction { .. } => true,
            Expr::AggregateFunction { name, .. } => !name.eq_ignore_ascii_case("count"),
            Expr::Window { function, .. } => function.nullable(),
            Expr::Generator { .. } => false,
            Expr::Subquery(s) => matches!(s.kind, SubqueryKind::Scalar | SubqueryKind::In { .. }),
            Expr::SortOrder(o) => o.child.nullable(),
        }
    }

    /// Attributes this expression reads.
    pub fn references(&self) -> AttributeSet {
        let mut out = AttributeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut AttributeSet) {
        if let Expr::Attribute(a) = self {
            out.insert(a.clone());
        }
        for child in self.children() {
            child.collect_references(out);
        }
    }

    pub fn deterministic(&self) -> bool {
        let own = match self {
            Expr::ScalarFunction { deterministic, .. } => *deterministic,
            _ => true,
        };
        own && self.children().iter().all(|c| c.deterministic())
    }

    /// Whether the expression can be evaluated without any input row.
    pub fn foldable(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Binary { .. } | Expr::Not(_) | Expr::IsNull(_) | Expr::IsNotNull(_) | Expr::Cast { .. } => {
                self.children().iter().all(|c| c.foldable())
            }
            _ => false,
        }
    }

    /// Output attribute of a named expression (attribute or alias).
    pub fn to_attribute(&self) -> Option<Attribute> {
        match self {
            Expr::Attribute(a) => Some(a.clone()),
            Expr::Alias(a) => Some(a.to_attribute()),
            _ => None,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Expr::Attribute(_) | Expr::Alias(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Expr::Attribute(a) => Some(&a.name),
            Expr::Alias(a) => Some(&a.name),
            Expr::UnresolvedAttribute(parts) => parts.last().map(String::as_str),
            _ => None,
        }
    }

    /// Integral value of a literal, e.g. the count of a limit.
    pub fn as_integer_literal(&self) -> Option<i64> {
        match self {
            Expr::Literal(l) => l.as_i64(),
            _ => None,
        }
    }

    // ---- tree search ----

    /// Pre-order search for a node satisfying `pred`.
    pub fn find(&self, pred: &dyn Fn(&Expr) -> bool) -> Option<&Expr> {
        if pred(self) {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(pred))
    }

    pub fn contains(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        self.find(pred).is_some()
    }

    pub fn contains_aggregate(&self) -> bool {
        self.contains(&|e| matches!(e, Expr::AggregateFunction { .. }))
    }

    pub fn contains_window(&self) -> bool {
        self.contains(&|e| matches!(e, Expr::Window { .. }))
    }

    pub fn contains_generator(&self) -> bool {
        self.contains(&|e| matches!(e, Expr::Generator { .. }))
    }

    pub fn has_correlated_subquery(&self) -> bool {
        self.contains(&|e| matches!(e, Expr::Subquery(s) if s.is_correlated()))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
            for (i, a) in args.iter().enumerate() {
                if i > 0 { write!(f, ", ")?; }
                write!(f, "{a}")?;
            }
            Ok(())
        }
        match self {
            Expr::Attribute(a) => write!(f, "{}", a.name),
            Expr::UnresolvedAttribute(parts) => write!(f, "'{}", parts.join(".")),
            Expr::Literal(l) => write!(f, "{l}"),
            Expr::Alias(a) => write!(f, "{} AS {}", a.child, a.name),
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Not(c) => write!(f, "(NOT {c})"),
            Expr::IsNull(c) => write!(f, "({c} IS NULL)"),
            Expr::IsNotNull(c) => write!(f, "({c} IS NOT NULL)"),
            Expr::Cast { child, data_type } => write!(f, "CAST({child} AS {data_type})"),
            Expr::ScalarFunction { name, args, .. } | Expr::Generator { name, args, .. } => {
                write!(f, "{name}(")?;
                list(f, args)?;
                write!(f, ")")
            }
            Expr::AggregateFunction { name, args, distinct, .. } => {
                write!(f, "{name}({}", if *distinct { "DISTINCT " } else { "" })?;
                list(f, args)?;
                write!(f, ")")
            }
            Expr::Window { function, .. } => write!(f, "{function} OVER (...)"),
            Expr::Subquery(s) => match s.kind {
                SubqueryKind::Scalar => write!(f, "scalar-subquery{}", s.expr_id),
                SubqueryKind::Exists => write!(f, "exists{}", s.expr_id),
                SubqueryKind::In { .. } => write!(f, "in-subquery{}", s.expr_id),
            },
            Expr::SortOrder(o) => write!(
                f,
                "{} {} {}",
                o.child,
                if o.is_ascending() { "ASC" } else { "DESC" },
                if o.null_ordering == NullOrdering::NullsFirst { "NULLS FIRST" } else { "NULLS LAST" }
            ),
        }
    }
}
