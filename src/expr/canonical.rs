use crate::expr::{BinaryOperator, Expr, ExprId, Metadata, SubqueryExpr};

impl Expr {
    /// Normal form used to compare expressions for semantic equality.
    ///
    /// Cosmetic attribute details (name, qualifier, nullability, metadata) are
    /// erased, chains of commutative operators are flattened and ordered, and
    /// ordering comparisons are turned so their operands sort ascending.
    pub fn canonicalized(&self) -> Expr {
        let erased = self.transform_up(&mut |e| match e {
            Expr::Attribute(a) => Expr::Attribute(crate::expr::Attribute {
                name: "none".to_string(),
                nullable: true,
                metadata: Metadata::new(),
                qualifier: vec![],
                ..a
            }),
            Expr::Subquery(s) => Expr::Subquery(SubqueryExpr {
                plan: Box::new(s.plan.canonicalized().clone()),
                expr_id: ExprId::canonical(0),
                ..s
            }),
            other => other,
        });
        Self::reorder(erased)
    }

    /// Both expressions are deterministic and share a canonical form.
    pub fn semantic_eq(&self, other: &Expr) -> bool {
        self.deterministic() && other.deterministic() && self.canonicalized() == other.canonicalized()
    }

    fn reorder(e: Expr) -> Expr {
        e.transform_up(&mut |e| match e {
            Expr::Binary { op, left, right } => match op {
                BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Plus | BinaryOperator::Multiply => {
                    let mut operands = Vec::new();
                    Self::flatten(op, *left, &mut operands);
                    Self::flatten(op, *right, &mut operands);
                    operands.sort_by_cached_key(Self::order_key);
                    operands
                        .into_iter()
                        .reduce(|acc, next| Expr::binary(acc, op, next))
                        .unwrap_or(Expr::lit(crate::expr::Literal::boolean(true)))
                }
                BinaryOperator::Eq | BinaryOperator::NotEq | BinaryOperator::EqNullSafe
                | BinaryOperator::Lt | BinaryOperator::LtEq | BinaryOperator::Gt | BinaryOperator::GtEq => {
                    match op.flipped() {
                        Some(flipped) if Self::order_key(&left) > Self::order_key(&right) => {
                            Expr::Binary { op: flipped, left: right, right: left }
                        }
                        _ => Expr::Binary { op, left, right },
                    }
                }
                _ => Expr::Binary { op, left, right },
            },
            other => other,
        })
    }

    fn flatten(op: BinaryOperator, e: Expr, out: &mut Vec<Expr>) {
        match e {
            Expr::Binary { op: inner, left, right } if inner == op => {
                Self::flatten(op, *left, out);
                Self::flatten(op, *right, out);
            }
            other => out.push(other),
        }
    }

    fn order_key(e: &Expr) -> String {
        format!("{e:?}")
    }
}
