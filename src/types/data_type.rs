use std::fmt;

use serde::{Deserialize, Serialize};

/// A named, typed field of a struct type (also the element schema of a generator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self { name: name.into(), data_type, nullable }
    }
}

/// Column data types known to the plan algebra.
///
/// Types are compared structurally; `same_type` ignores the nullability flags
/// carried by nested array, map and struct types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of the untyped `NULL` literal
    Null,
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Decimal { precision: u8, scale: u8 },
    String,
    Binary,
    Date,
    Timestamp,
    Array { element: Box<DataType>, contains_null: bool },
    Map { key: Box<DataType>, value: Box<DataType>, value_contains_null: bool },
    Struct(Vec<StructField>),
}

impl DataType {
    pub const MAX_DECIMAL_PRECISION: u8 = 38;

    pub fn array(element: DataType, contains_null: bool) -> Self {
        DataType::Array { element: Box::new(element), contains_null }
    }

    pub fn map(key: DataType, value: DataType, value_contains_null: bool) -> Self {
        DataType::Map { key: Box::new(key), value: Box::new(value), value_contains_null }
    }

    /// Size in bytes of a default value of this type; used to bound bit widths.
    pub fn default_size(&self) -> usize {
        match self {
            DataType::Null => 1,
            DataType::Boolean | DataType::Byte => 1,
            DataType::Short => 2,
            DataType::Integer | DataType::Float | DataType::Date => 4,
            DataType::Long | DataType::Double | DataType::Timestamp => 8,
            DataType::Decimal { precision, .. } => if *precision <= 18 { 8 } else { 16 },
            DataType::String | DataType::Binary => 20,
            DataType::Array { element, .. } => element.default_size(),
            DataType::Map { key, value, .. } => key.default_size() + value.default_size(),
            DataType::Struct(fields) => fields.iter().map(|f| f.data_type.default_size()).sum(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self,
            DataType::Byte | DataType::Short | DataType::Integer | DataType::Long
            | DataType::Float | DataType::Double | DataType::Decimal { .. })
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Byte | DataType::Short | DataType::Integer | DataType::Long)
    }

    /// Structural equality that ignores nested nullability flags.
    pub fn same_type(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Array { element: a, .. }, DataType::Array { element: b, .. }) => a.same_type(b),
            (
                DataType::Map { key: ka, value: va, .. },
                DataType::Map { key: kb, value: vb, .. },
            ) => ka.same_type(kb) && va.same_type(vb),
            (DataType::Struct(a), DataType::Struct(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| x.name == y.name && x.data_type.same_type(&y.data_type))
            }
            (a, b) => a == b,
        }
    }

    /// Least common supertype of two types, or `None` when they cannot be merged.
    ///
    /// Numeric types widen (`Int` + `Double` -> `Double`), `Null` merges into any
    /// type, and nested nullability flags are OR-ed together. Struct types merge
    /// field by field (by name); fields only present on one side are appended
    /// as nullable.
    pub fn merge(a: &DataType, b: &DataType) -> Option<DataType> {
        use DataType::*;
        if a == b {
            return Some(a.clone());
        }
        match (a, b) {
            (Null, other) | (other, Null) => Some(other.clone()),
            (
                Array { element: ea, contains_null: na },
                Array { element: eb, contains_null: nb },
            ) => Some(DataType::array(DataType::merge(ea, eb)?, *na || *nb)),
            (
                Map { key: ka, value: va, value_contains_null: na },
                Map { key: kb, value: vb, value_contains_null: nb },
            ) => Some(DataType::map(DataType::merge(ka, kb)?, DataType::merge(va, vb)?, *na || *nb)),
            (Struct(fa), Struct(fb)) => {
                let mut merged: Vec<StructField> = Vec::with_capacity(fa.len().max(fb.len()));
                for left in fa {
                    match fb.iter().find(|f| f.name == left.name) {
                        Some(right) => merged.push(StructField::new(
                            left.name.clone(),
                            DataType::merge(&left.data_type, &right.data_type)?,
                            left.nullable || right.nullable,
                        )),
                        None => merged.push(StructField::new(left.name.clone(), left.data_type.clone(), true)),
                    }
                }
                for right in fb {
                    if !fa.iter().any(|f| f.name == right.name) {
                        merged.push(StructField::new(right.name.clone(), right.data_type.clone(), true));
                    }
                }
                Some(Struct(merged))
            }
            (Decimal { precision: p1, scale: s1 }, Decimal { precision: p2, scale: s2 }) => {
                let scale = (*s1).max(*s2);
                let range = p1.saturating_sub(*s1).max(p2.saturating_sub(*s2));
                let precision = range.saturating_add(scale).min(Self::MAX_DECIMAL_PRECISION);
                Some(Decimal { precision, scale })
            }
            (x, y) if x.is_numeric() && y.is_numeric() => Some(Self::widen_numeric(x, y)),
            _ => None,
        }
    }

    fn numeric_rank(&self) -> u8 {
        match self {
            DataType::Byte => 1,
            DataType::Short => 2,
            DataType::Integer => 3,
            DataType::Long => 4,
            DataType::Decimal { .. } => 5,
            DataType::Float => 6,
            DataType::Double => 7,
            _ => 0,
        }
    }

    fn widen_numeric(a: &DataType, b: &DataType) -> DataType {
        if a.numeric_rank() >= b.numeric_rank() { a.clone() } else { b.clone() }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "void"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Byte => write!(f, "tinyint"),
            DataType::Short => write!(f, "smallint"),
            DataType::Integer => write!(f, "int"),
            DataType::Long => write!(f, "bigint"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            DataType::String => write!(f, "string"),
            DataType::Binary => write!(f, "binary"),
            DataType::Date => write!(f, "date"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Array { element, .. } => write!(f, "array<{element}>"),
            DataType::Map { key, value, .. } => write!(f, "map<{key},{value}>"),
            DataType::Struct(fields) => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 { write!(f, ",")?; }
                    write!(f, "{}:{}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_widens_numeric_types() {
        assert_eq!(DataType::merge(&DataType::Integer, &DataType::Long), Some(DataType::Long));
        assert_eq!(DataType::merge(&DataType::Double, &DataType::Short), Some(DataType::Double));
        assert_eq!(DataType::merge(&DataType::Null, &DataType::String), Some(DataType::String));
    }

    #[test]
    fn merge_rejects_incompatible_types() {
        assert_eq!(DataType::merge(&DataType::String, &DataType::Integer), None);
        assert_eq!(DataType::merge(&DataType::Boolean, &DataType::Date), None);
    }

    #[test]
    fn merge_ors_nested_nullability() {
        let a = DataType::array(DataType::Integer, false);
        let b = DataType::array(DataType::Integer, true);
        let merged = DataType::merge(&a, &b).unwrap();
        assert_eq!(merged, DataType::array(DataType::Integer, true));
        assert!(merged.same_type(&a));
        assert_ne!(merged, a);
    }

    #[test]
    fn merge_structs_by_field_name() {
        let a = DataType::Struct(vec![StructField::new("x", DataType::Integer, false)]);
        let b = DataType::Struct(vec![
            StructField::new("x", DataType::Long, false),
            StructField::new("y", DataType::String, false),
        ]);
        match DataType::merge(&a, &b).unwrap() {
            DataType::Struct(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].data_type, DataType::Long);
                assert!(!fields[0].nullable);
                assert_eq!(fields[1].name, "y");
                assert!(fields[1].nullable);
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn decimal_merge_keeps_integral_digits() {
        let a = DataType::Decimal { precision: 10, scale: 2 };
        let b = DataType::Decimal { precision: 5, scale: 4 };
        assert_eq!(DataType::merge(&a, &b), Some(DataType::Decimal { precision: 12, scale: 4 }));
    }

    #[test]
    fn oversized_decimal_merge_caps_precision() {
        let a = DataType::Decimal { precision: 200, scale: 100 };
        let b = DataType::Decimal { precision: 255, scale: 10 };
        match DataType::merge(&a, &b) {
            Some(DataType::Decimal { precision, scale }) => {
                assert_eq!(precision, DataType::MAX_DECIMAL_PRECISION);
                assert_eq!(scale, 100);
            }
            other => panic!("expected decimal, got {other:?}"),
        }
    }

    #[test]
    fn grouping_id_widths() {
        assert_eq!(DataType::Long.default_size() * 8, 64);
        assert_eq!(DataType::Integer.default_size() * 8, 32);
    }

    #[test]
    fn data_type_round_trips_through_json() {
        let t = DataType::map(DataType::String, DataType::array(DataType::Double, true), false);
        let json = serde_json::to_string(&t).unwrap();
        let back: DataType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
