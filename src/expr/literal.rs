use std::fmt;

use ordered_float::OrderedFloat;

use crate::types::DataType;

/// Constant values that can appear in a plan.
///
/// Doubles are wrapped in `OrderedFloat` so a `NaN` literal compares equal to
/// itself and canonical plan comparison stays reflexive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(OrderedFloat<f64>),
    String(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Boolean(b) => write!(f, "{b}"),
            ScalarValue::Integer(i) => write!(f, "{i}"),
            ScalarValue::Long(l) => write!(f, "{l}"),
            ScalarValue::Double(d) => write!(f, "{}", d.0),
            ScalarValue::String(s) => write!(f, "{s}"),
        }
    }
}

/// A typed constant; a null literal still carries the type of the column it stands in for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub value: ScalarValue,
    pub data_type: DataType,
}

impl Literal {
    pub fn null(data_type: DataType) -> Self {
        Self { value: ScalarValue::Null, data_type }
    }

    pub fn boolean(b: bool) -> Self {
        Self { value: ScalarValue::Boolean(b), data_type: DataType::Boolean }
    }

    pub fn int(i: i32) -> Self {
        Self { value: ScalarValue::Integer(i), data_type: DataType::Integer }
    }

    pub fn long(l: i64) -> Self {
        Self { value: ScalarValue::Long(l), data_type: DataType::Long }
    }

    pub fn double(d: f64) -> Self {
        Self { value: ScalarValue::Double(OrderedFloat(d)), data_type: DataType::Double }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self { value: ScalarValue::String(s.into()), data_type: DataType::String }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, ScalarValue::Null)
    }

    /// Integral value of an integer or long literal.
    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            ScalarValue::Integer(i) => Some(i64::from(i)),
            ScalarValue::Long(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_literals_are_reflexive() {
        assert_eq!(Literal::double(f64::NAN), Literal::double(f64::NAN));
    }

    #[test]
    fn integral_values() {
        assert_eq!(Literal::int(7).as_i64(), Some(7));
        assert_eq!(Literal::long(-3).as_i64(), Some(-3));
        assert_eq!(Literal::string("7").as_i64(), None);
        assert!(Literal::null(DataType::Integer).is_null());
    }
}
