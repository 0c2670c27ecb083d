use crate::expr::{BinaryOperator, Expr};

/// Splitting of boolean predicates into their AND / OR operands.
pub trait PredicateHelper {
    fn split_conjunctive_predicates(condition: &Expr) -> Vec<Expr> {
        split(condition, BinaryOperator::And)
    }

    fn split_disjunctive_predicates(condition: &Expr) -> Vec<Expr> {
        split(condition, BinaryOperator::Or)
    }

    /// Rebuild a left-deep AND chain; `None` when there is nothing to combine.
    fn conjoin(predicates: Vec<Expr>) -> Option<Expr> {
        predicates.into_iter().reduce(Expr::and)
    }

    fn disjoin(predicates: Vec<Expr>) -> Option<Expr> {
        predicates.into_iter().reduce(Expr::or)
    }
}

fn split(condition: &Expr, by: BinaryOperator) -> Vec<Expr> {
    match condition {
        Expr::Binary { op, left, right } if *op == by => {
            let mut out = split(left, by);
            out.extend(split(right, by));
            out
        }
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::{Attribute, Literal}, types::DataType};

    struct Helper;
    impl PredicateHelper for Helper {}

    #[test]
    fn splits_nested_conjunctions_in_order() {
        let a = Attribute::new("a", DataType::Integer, true);
        let p1 = Expr::attr(&a).gt(Expr::lit(Literal::int(1)));
        let p2 = Expr::attr(&a).lt(Expr::lit(Literal::int(9)));
        let p3 = Expr::attr(&a).is_not_null();
        let cond = p1.clone().and(p2.clone().and(p3.clone()));
        assert_eq!(Helper::split_conjunctive_predicates(&cond), vec![p1, p2, p3]);
    }

    #[test]
    fn disjunction_is_a_single_conjunct() {
        let a = Attribute::new("a", DataType::Integer, true);
        let cond = Expr::attr(&a).is_null().or(Expr::attr(&a).is_not_null());
        assert_eq!(Helper::split_conjunctive_predicates(&cond).len(), 1);
        assert_eq!(Helper::split_disjunctive_predicates(&cond).len(), 2);
    }

    #[test]
    fn conjoin_of_nothing_is_none() {
        assert!(Helper::conjoin(vec![]).is_none());
    }
}
