use crate::expr::{Attribute, AttributeMap, Expr};

/// Structural rewrites over an expression tree.
///
/// Every rewrite builds a new tree; the input is never modified.
impl Expr {
    /// Post-order rewrite: children are rewritten first, then `rule` sees the
    /// rebuilt node.
    pub fn transform_up(&self, rule: &mut dyn FnMut(Expr) -> Expr) -> Expr {
        let rebuilt = self.map_children(&mut |c| c.transform_up(rule));
        rule(rebuilt)
    }

    /// Pre-order rewrite: when `rule` returns a replacement the subtree below
    /// it is not visited.
    pub fn transform_down(&self, rule: &mut dyn FnMut(&Expr) -> Option<Expr>) -> Expr {
        match rule(self) {
            Some(replaced) => replaced,
            None => self.map_children(&mut |c| c.transform_down(rule)),
        }
    }

    /// Replace every attribute occurrence found in `mapping` by its mapped attribute.
    pub fn substitute(&self, mapping: &AttributeMap<Attribute>) -> Expr {
        if mapping.is_empty() {
            return self.clone();
        }
        self.transform_up(&mut |e| match &e {
            Expr::Attribute(a) => match mapping.get(a) {
                Some(to) => Expr::Attribute(to.clone()),
                None => e,
            },
            _ => e,
        })
    }

    /// Replace every subtree semantically equal to `target` by `replacement`.
    pub fn replace_semantic(&self, target: &Expr, replacement: &Expr) -> Expr {
        let target = target.canonicalized();
        self.transform_down(&mut |e| {
            (e.deterministic() && e.canonicalized() == target).then(|| replacement.clone())
        })
    }

    /// Strip a top-level alias.
    pub fn strip_alias(&self) -> &Expr {
        match self {
            Expr::Alias(a) => a.child.strip_alias(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::Literal, types::DataType};

    // ---- helpers ----
    fn col(name: &str) -> Attribute {
        Attribute::new(name, DataType::Integer, true)
    }
    fn lit_i(i: i32) -> Expr {
        Expr::lit(Literal::int(i))
    }

    #[test]
    fn substitute_rewrites_mapped_attributes_only() {
        let (a, b, c) = (col("a"), col("b"), col("c"));
        let e = Expr::attr(&a).plus(Expr::attr(&c)).gt(lit_i(1));
        let mapping: AttributeMap<Attribute> = [(&a, b.clone())].into_iter().collect();

        let out = e.substitute(&mapping);

        assert_eq!(out, Expr::attr(&b).plus(Expr::attr(&c)).gt(lit_i(1)));
        assert!(!out.references().contains(&a));
    }

    #[test]
    fn transform_up_sees_rebuilt_children() {
        let a = col("a");
        let e = Expr::attr(&a).plus(lit_i(1)).plus(lit_i(2));
        let mut literals = 0;
        let out = e.transform_up(&mut |e| match e {
            Expr::Literal(_) => {
                literals += 1;
                lit_i(0)
            }
            other => other,
        });
        assert_eq!(literals, 2);
        assert_eq!(out, Expr::attr(&a).plus(lit_i(0)).plus(lit_i(0)));
    }

    #[test]
    fn transform_down_stops_at_replaced_subtree() {
        let a = col("a");
        let inner = Expr::attr(&a).plus(lit_i(1));
        let e = inner.clone().gt(lit_i(3));
        let mut visited_literal_one = false;
        let out = e.transform_down(&mut |e| {
            if e == &inner {
                return Some(lit_i(9));
            }
            if e == &lit_i(1) {
                visited_literal_one = true;
            }
            None
        });
        assert!(!visited_literal_one);
        assert_eq!(out, lit_i(9).gt(lit_i(3)));
    }

    #[test]
    fn replace_semantic_ignores_operand_order() {
        let (a, b, x) = (col("a"), col("b"), col("x"));
        let e = Expr::attr(&b).plus(Expr::attr(&a)).gt(lit_i(0));
        let out = e.replace_semantic(&Expr::attr(&a).plus(Expr::attr(&b)), &Expr::attr(&x));
        assert_eq!(out, Expr::attr(&x).gt(lit_i(0)));
    }

    #[test]
    fn strip_alias_unwraps_nested_aliases() {
        let a = col("a");
        let e = Expr::attr(&a).alias("x").alias("y");
        assert_eq!(e.strip_alias(), &Expr::attr(&a));
    }
}
