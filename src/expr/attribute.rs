use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{expr::ExprId, types::DataType};

/// Free-form column metadata, carried through the plan untouched.
pub type Metadata = Map<String, Value>;

/// A typed, nullable column reference.
///
/// Two attributes denote the same column iff their `expr_id`s match; name,
/// qualifier and nullability are presentation that may differ between the
/// places a column is referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub metadata: Metadata,
    pub expr_id: ExprId,
    pub qualifier: Vec<String>,
}

impl Attribute {
    /// A brand new column with a freshly minted id.
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
            metadata: Metadata::new(),
            expr_id: ExprId::next(),
            qualifier: vec![],
        }
    }

    /// Same column, different identity: used when a column is re-derived.
    pub fn new_instance(&self) -> Self {
        Self { expr_id: ExprId::next(), ..self.clone() }
    }

    pub fn with_nullability(&self, nullable: bool) -> Self {
        if self.nullable == nullable { self.clone() } else { Self { nullable, ..self.clone() } }
    }

    pub fn with_qualifier(&self, qualifier: Vec<String>) -> Self {
        Self { qualifier, ..self.clone() }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), ..self.clone() }
    }

    pub fn with_expr_id(&self, expr_id: ExprId) -> Self {
        Self { expr_id, ..self.clone() }
    }

    pub fn with_data_type(&self, data_type: DataType) -> Self {
        Self { data_type, ..self.clone() }
    }

    pub fn with_metadata(&self, metadata: Metadata) -> Self {
        Self { metadata, ..self.clone() }
    }

    /// True when both attributes reference the same column.
    pub fn same_ref(&self, other: &Attribute) -> bool {
        self.expr_id == other.expr_id
    }

    pub fn qualified_name(&self) -> String {
        if self.qualifier.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.qualifier.join("."), self.name)
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.expr_id)
    }
}

/// An ordered set of attributes keyed by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    attrs: IndexMap<ExprId, Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attr: Attribute) {
        self.attrs.entry(attr.expr_id).or_insert(attr);
    }

    pub fn contains(&self, attr: &Attribute) -> bool {
        self.attrs.contains_key(&attr.expr_id)
    }

    pub fn contains_id(&self, id: &ExprId) -> bool {
        self.attrs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.values()
    }

    pub fn first(&self) -> Option<&Attribute> {
        self.attrs.values().next()
    }

    pub fn subset_of(&self, other: &AttributeSet) -> bool {
        self.attrs.keys().all(|id| other.attrs.contains_key(id))
    }

    pub fn union(&self, other: &AttributeSet) -> AttributeSet {
        let mut out = self.clone();
        for attr in other.iter() {
            out.insert(attr.clone());
        }
        out
    }

    pub fn intersect(&self, other: &AttributeSet) -> AttributeSet {
        self.iter().filter(|a| other.contains(a)).cloned().collect()
    }

    pub fn difference(&self, other: &AttributeSet) -> AttributeSet {
        self.iter().filter(|a| !other.contains(a)).cloned().collect()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        let mut set = AttributeSet::new();
        for attr in iter {
            set.insert(attr);
        }
        set
    }
}

impl<'a> FromIterator<&'a Attribute> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = &'a Attribute>>(iter: T) -> Self {
        iter.into_iter().cloned().collect()
    }
}

/// Map keyed by attribute identity.
#[derive(Debug, Clone)]
pub struct AttributeMap<V> {
    entries: IndexMap<ExprId, V>,
}

impl<V> Default for AttributeMap<V> {
    fn default() -> Self {
        Self { entries: IndexMap::new() }
    }
}

impl<V> AttributeMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &Attribute, value: V) {
        self.entries.insert(key.expr_id, value);
    }

    pub fn get(&self, key: &Attribute) -> Option<&V> {
        self.entries.get(&key.expr_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, V> FromIterator<(&'a Attribute, V)> for AttributeMap<V> {
    fn from_iter<T: IntoIterator<Item = (&'a Attribute, V)>>(iter: T) -> Self {
        let mut map = AttributeMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
