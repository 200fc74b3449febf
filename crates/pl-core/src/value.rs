use std::cmp::Ordering;
use std::fmt;

use crate::error::ParleyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gender {
    Masculine,
    Feminine,
    #[default]
    Neuter,
}

impl Gender {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("masculine") {
            Some(Self::Masculine)
        } else if keyword.eq_ignore_ascii_case("feminine") {
            Some(Self::Feminine)
        } else if keyword.eq_ignore_ascii_case("neuter") {
            Some(Self::Neuter)
        } else {
            None
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Masculine => f.write_str("masculine"),
            Self::Feminine => f.write_str("feminine"),
            Self::Neuter => f.write_str("neuter"),
        }
    }
}

/// A dynamically typed script value.
///
/// `Variable` only ever appears as an operand inside a compiled expression; the
/// evaluator resolves it against the environment before any operator sees it.
/// `Invalid` is what evaluation substitutes after a fault.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Invalid,
    Boolean(bool),
    Int(i32),
    Float(f32),
    Text(String),
    Variable(String),
    Gender(Gender),
}

enum Numeric {
    Int(i32, i32),
    Float(f32, f32),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Boolean(_) => "boolean",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Variable(_) => "variable",
            Self::Gender(_) => "gender",
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_gender(&self) -> Option<Gender> {
        match self {
            Self::Gender(value) => Some(*value),
            _ => None,
        }
    }

    /// Boolean coercion used by `and`, `or`, `not` and edge guards.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Boolean(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::Text(value) => !value.is_empty(),
            Self::Gender(_) => true,
            Self::Invalid | Self::Variable(_) => false,
        }
    }

    pub fn checked_add(&self, rhs: &Value) -> Result<Value, ParleyError> {
        match self.numeric_pair("+", rhs)? {
            Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_add(b))),
            Numeric::Float(a, b) => Ok(Value::Float(a + b)),
        }
    }

    pub fn checked_sub(&self, rhs: &Value) -> Result<Value, ParleyError> {
        match self.numeric_pair("-", rhs)? {
            Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_sub(b))),
            Numeric::Float(a, b) => Ok(Value::Float(a - b)),
        }
    }

    pub fn checked_mul(&self, rhs: &Value) -> Result<Value, ParleyError> {
        match self.numeric_pair("*", rhs)? {
            Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_mul(b))),
            Numeric::Float(a, b) => Ok(Value::Float(a * b)),
        }
    }

    pub fn checked_div(&self, rhs: &Value) -> Result<Value, ParleyError> {
        match self.numeric_pair("/", rhs)? {
            Numeric::Int(_, 0) => Err(division_by_zero()),
            Numeric::Int(a, b) => Ok(Value::Int(a.wrapping_div(b))),
            Numeric::Float(_, b) if b == 0.0 => Err(division_by_zero()),
            Numeric::Float(a, b) => Ok(Value::Float(a / b)),
        }
    }

    /// Ordering for the relational operators: numbers (promoting to float when
    /// mixed) and text (lexicographic).
    pub fn compare(&self, rhs: &Value) -> Result<Ordering, ParleyError> {
        if let (Self::Text(a), Self::Text(b)) = (self, rhs) {
            return Ok(a.cmp(b));
        }
        match self.numeric_pair("comparison", rhs)? {
            Numeric::Int(a, b) => Ok(a.cmp(&b)),
            Numeric::Float(a, b) => a.partial_cmp(&b).ok_or_else(|| {
                ParleyError::new(
                    "VALUE_NOT_COMPARABLE",
                    format!("Cannot order {} and {}.", a, b),
                )
            }),
        }
    }

    /// Equality for `==` and `!=`. Int and Float compare numerically; any other
    /// pair of different types is unequal.
    pub fn loose_eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Self::Int(a), Self::Float(b)) => (*a as f32) == *b,
            (Self::Float(a), Self::Int(b)) => *a == (*b as f32),
            _ => self == rhs,
        }
    }

    fn numeric_pair(&self, operator: &str, rhs: &Value) -> Result<Numeric, ParleyError> {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Ok(Numeric::Int(*a, *b)),
            (Self::Int(a), Self::Float(b)) => Ok(Numeric::Float(*a as f32, *b)),
            (Self::Float(a), Self::Int(b)) => Ok(Numeric::Float(*a, *b as f32)),
            (Self::Float(a), Self::Float(b)) => Ok(Numeric::Float(*a, *b)),
            _ => Err(ParleyError::new(
                "VALUE_TYPE_MISMATCH",
                format!(
                    "Operator \"{}\" is not defined for {} and {}.",
                    operator,
                    self.type_name(),
                    rhs.type_name()
                ),
            )),
        }
    }
}

fn division_by_zero() -> ParleyError {
    ParleyError::new("VALUE_DIVIDE_BY_ZERO", "Division by zero.")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("<invalid>"),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
            Self::Variable(name) => write!(f, "{{{}}}", name),
            Self::Gender(value) => write!(f, "{}", value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Gender> for Value {
    fn from(value: Gender) -> Self {
        Self::Gender(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        assert_eq!(Value::Int(2).checked_add(&Value::Float(0.5)), Ok(Value::Float(2.5)));
        assert_eq!(Value::Float(3.0).checked_mul(&Value::Int(2)), Ok(Value::Float(6.0)));
        assert_eq!(Value::Int(7).checked_div(&Value::Int(2)), Ok(Value::Int(3)));
    }

    #[test]
    fn arithmetic_rejects_non_numeric_operands() {
        let error = Value::text("a").checked_add(&Value::Int(1)).expect_err("text + int");
        assert_eq!(error.code, "VALUE_TYPE_MISMATCH");
        let error = Value::Boolean(true)
            .checked_sub(&Value::Boolean(false))
            .expect_err("bool - bool");
        assert_eq!(error.code, "VALUE_TYPE_MISMATCH");
    }

    #[test]
    fn division_by_zero_is_a_fault_for_both_number_kinds() {
        assert_eq!(
            Value::Int(1).checked_div(&Value::Int(0)).expect_err("int").code,
            "VALUE_DIVIDE_BY_ZERO"
        );
        assert_eq!(
            Value::Float(1.0)
                .checked_div(&Value::Float(0.0))
                .expect_err("float")
                .code,
            "VALUE_DIVIDE_BY_ZERO"
        );
    }

    #[test]
    fn compare_orders_numbers_and_text() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Ok(Ordering::Less));
        assert_eq!(
            Value::text("apple").compare(&Value::text("banana")),
            Ok(Ordering::Less)
        );
        assert!(Value::text("a").compare(&Value::Int(1)).is_err());
    }

    #[test]
    fn loose_equality_is_numeric_across_int_and_float() {
        assert!(Value::Int(5).loose_eq(&Value::Float(5.0)));
        assert!(!Value::Int(5).loose_eq(&Value::text("5")));
        assert!(Value::Gender(Gender::Feminine).loose_eq(&Value::Gender(Gender::Feminine)));
        assert!(!Value::Invalid.loose_eq(&Value::Boolean(false)));
    }

    #[test]
    fn truthiness_follows_zero_and_empty_rules() {
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Float(0.1).is_truthy());
        assert!(!Value::text("").is_truthy());
        assert!(Value::text("x").is_truthy());
        assert!(!Value::Invalid.is_truthy());
    }
}
