use std::fmt;

use crate::error::ParleyError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
    Or,
    Not,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LParen,
    RParen,
}

impl Operator {
    /// Binding strength, higher binds tighter. Parentheses are handled
    /// structurally by the parser and report 0.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal
            | Self::NotEqual
            | Self::Less
            | Self::LessEqual
            | Self::Greater
            | Self::GreaterEqual => 3,
            Self::Add | Self::Subtract => 4,
            Self::Multiply | Self::Divide => 5,
            Self::Not => 6,
            Self::LParen | Self::RParen => 0,
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Self::Not)
    }

    pub fn is_left_associative(self) -> bool {
        !matches!(self, Self::Not)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LParen => "(",
            Self::RParen => ")",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionItem {
    Operand(Value),
    Operator(Operator),
}

/// A compiled expression: the postfix queue produced by the parser.
///
/// A valid expression always leaves exactly one operand on the stack and never
/// underflows; `from_postfix` checks this. An invalid expression keeps its
/// source for diagnostics but must never be evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    source: String,
    queue: Vec<ExpressionItem>,
    valid: bool,
}

impl Expression {
    pub fn from_postfix(
        source: impl Into<String>,
        queue: Vec<ExpressionItem>,
    ) -> Result<Self, ParleyError> {
        let source = source.into();
        let mut depth = 0usize;
        for item in &queue {
            let (pops, pushes) = match item {
                ExpressionItem::Operand(_) => (0, 1),
                ExpressionItem::Operator(operator) if operator.is_unary() => (1, 1),
                ExpressionItem::Operator(Operator::LParen | Operator::RParen) => {
                    return Err(malformed(&source, "parenthesis in postfix queue"));
                }
                ExpressionItem::Operator(_) => (2, 1),
            };
            depth = depth
                .checked_sub(pops)
                .ok_or_else(|| malformed(&source, "operator without enough operands"))?
                + pushes;
        }
        if depth != 1 {
            return Err(malformed(&source, "queue does not reduce to one value"));
        }
        Ok(Self {
            source,
            queue,
            valid: true,
        })
    }

    pub fn invalid(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            queue: Vec::new(),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn queue(&self) -> &[ExpressionItem] {
        &self.queue
    }
}

fn malformed(source: &str, reason: &str) -> ParleyError {
    ParleyError::new(
        "EXPR_MALFORMED_QUEUE",
        format!("Postfix queue for \"{}\" is malformed: {}.", source, reason),
    )
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for item in &self.queue {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            match item {
                ExpressionItem::Operand(Value::Text(text)) => write!(f, "\"{}\"", text)?,
                ExpressionItem::Operand(value) => write!(f, "{}", value)?,
                ExpressionItem::Operator(operator) => write!(f, "{}", operator)?,
            }
        }
        Ok(())
    }
}
