use indexmap::IndexMap;

use crate::expr::{Attribute, AttributeMap, Expr, ExprId};

/// Deduplicated set of predicates known to hold on every output row.
///
/// Membership is decided on canonical forms, so `a = b` and `b = a` are the
/// same constraint. Non-deterministic predicates are kept but never match
/// anything, including themselves.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    // (canonical form, predicate as inserted)
    entries: Vec<(Expr, Expr)>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, predicate: Expr) {
        let canonical = predicate.canonicalized();
        if !predicate.deterministic() || !self.entries.iter().any(|(c, _)| c == &canonical) {
            self.entries.push((canonical, predicate));
        }
    }

    pub fn contains(&self, predicate: &Expr) -> bool {
        if !predicate.deterministic() {
            return false;
        }
        let canonical = predicate.canonicalized();
        self.contains_canonical(&canonical)
    }

    fn contains_canonical(&self, canonical: &Expr) -> bool {
        self.entries.iter().any(|(c, e)| c == canonical && e.deterministic())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.entries.iter().map(|(_, e)| e)
    }

    pub fn union(&self, other: &ConstraintSet) -> ConstraintSet {
        let mut out = self.clone();
        out.extend(other.iter().cloned());
        out
    }

    pub fn intersect(&self, other: &ConstraintSet) -> ConstraintSet {
        self.retain_by(|c| other.contains_canonical(c))
    }

    pub fn difference(&self, other: &ConstraintSet) -> ConstraintSet {
        self.retain_by(|c| !other.contains_canonical(c))
    }

    pub fn filter(&self, pred: impl Fn(&Expr) -> bool) -> ConstraintSet {
        ConstraintSet {
            entries: self.entries.iter().filter(|(_, e)| pred(e)).cloned().collect(),
        }
    }

    pub fn map(&self, f: impl Fn(&Expr) -> Expr) -> ConstraintSet {
        self.iter().map(f).collect()
    }

    /// Restate every predicate with attributes renamed through `mapping`.
    pub fn rewrite_attributes(&self, mapping: &AttributeMap<Attribute>) -> ConstraintSet {
        self.map(|e| e.substitute(mapping))
    }

    /// Predicates that reference exactly one attribute, grouped by that attribute.
    pub fn group_by_single_reference(&self) -> IndexMap<ExprId, Vec<Expr>> {
        let mut groups: IndexMap<ExprId, Vec<Expr>> = IndexMap::new();
        for e in self.iter() {
            let refs = e.references();
            if refs.len() == 1 {
                if let Some(attr) = refs.first() {
                    groups.entry(attr.expr_id).or_default().push(e.clone());
                }
            }
        }
        groups
    }

    fn retain_by(&self, keep: impl Fn(&Expr) -> bool) -> ConstraintSet {
        ConstraintSet {
            entries: self
                .entries
                .iter()
                .filter(|(c, e)| e.deterministic() && keep(c))
                .cloned()
                .collect(),
        }
    }
}

impl Extend<Expr> for ConstraintSet {
    fn extend<T: IntoIterator<Item = Expr>>(&mut self, iter: T) {
        for e in iter {
            self.insert(e);
        }
    }
}

impl FromIterator<Expr> for ConstraintSet {
    fn from_iter<T: IntoIterator<Item = Expr>>(iter: T) -> Self {
        let mut set = ConstraintSet::new();
        set.extend(iter);
        set
    }
}

/// Sets are equal when they hold the same canonical predicates, in any order.
impl PartialEq for ConstraintSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(c, _)| other.contains_canonical(c))
            && other.entries.iter().all(|(c, _)| self.contains_canonical(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::Literal, types::DataType};

    fn col(name: &str) -> Attribute {
        Attribute::new(name, DataType::Integer, true)
    }
    fn lit_i(i: i32) -> Expr {
        Expr::lit(Literal::int(i))
    }

    #[test]
    fn dedups_semantically_equal_predicates() {
        let (a, b) = (col("a"), col("b"));
        let set: ConstraintSet = [
            Expr::attr(&a).eq(Expr::attr(&b)),
            Expr::attr(&b).eq(Expr::attr(&a)),
            Expr::attr(&a).gt(lit_i(1)),
            Expr::attr(&a.with_name("renamed")).gt(lit_i(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&lit_i(1).lt(Expr::attr(&a))));
    }

    #[test]
    fn nondeterministic_predicates_never_match() {
        let rand = Expr::ScalarFunction {
            name: "rand".into(),
            args: vec![],
            return_type: DataType::Double,
            deterministic: false,
        };
        let p = rand.gt(Expr::lit(Literal::double(0.5)));
        let set: ConstraintSet = [p.clone(), p.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&p));
        assert!(set.intersect(&set).is_empty());
    }

    #[test]
    fn set_algebra() {
        let a = col("a");
        let p1 = Expr::attr(&a).gt(lit_i(1));
        let p2 = Expr::attr(&a).lt(lit_i(9));
        let p3 = Expr::attr(&a).is_not_null();
        let left: ConstraintSet = [p1.clone(), p2.clone()].into_iter().collect();
        let right: ConstraintSet = [p2.clone(), p3.clone()].into_iter().collect();

        assert_eq!(left.union(&right).len(), 3);
        assert_eq!(left.intersect(&right), [p2.clone()].into_iter().collect());
        assert_eq!(left.difference(&right), [p1].into_iter().collect());
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let (a, b) = (col("a"), col("b"));
        let p1 = Expr::attr(&a).gt(lit_i(1));
        let p2 = Expr::attr(&b).is_not_null();
        let x: ConstraintSet = [p1.clone(), p2.clone()].into_iter().collect();
        let y: ConstraintSet = [p2, p1].into_iter().collect();
        assert_eq!(x, y);
    }

    #[test]
    fn groups_single_reference_predicates() {
        let (a, b) = (col("a"), col("b"));
        let set: ConstraintSet = [
            Expr::attr(&a).gt(lit_i(1)),
            Expr::attr(&a).lt(lit_i(5)),
            Expr::attr(&b).is_not_null(),
            Expr::attr(&a).eq(Expr::attr(&b)),
        ]
        .into_iter()
        .collect();
        let groups = set.group_by_single_reference();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&a.expr_id].len(), 2);
        assert_eq!(groups[&b.expr_id].len(), 1);
    }

    #[test]
    fn rewrite_attributes_renames_references() {
        let (a, x) = (col("a"), col("x"));
        let set: ConstraintSet = [Expr::attr(&a).gt(lit_i(1))].into_iter().collect();
        let mapping: AttributeMap<Attribute> = [(&a, x.clone())].into_iter().collect();
        assert!(set.rewrite_attributes(&mapping).contains(&Expr::attr(&x).gt(lit_i(1))));
    }
}
