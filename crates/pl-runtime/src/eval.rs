use std::cmp::Ordering;
use std::collections::BTreeMap;

use pl_core::{
    Diagnostic, DiagnosticSink, Expression, ExpressionItem, Operator, ParleyError, Value,
};

/// Run a compiled postfix queue against `variables`.
///
/// Evaluation faults (missing variables, operator type mismatches, division by
/// zero) are reported to `sink` and replaced by `Value::Invalid`; the caller
/// always gets a value back.
///
/// # Panics
///
/// Panics when `expression` is not valid. Invalid expressions come out of a
/// failed parse and must be rejected before they reach the runtime.
pub fn evaluate_expression(
    expression: &Expression,
    variables: &BTreeMap<String, Value>,
    sink: &dyn DiagnosticSink,
) -> Value {
    assert!(
        expression.is_valid(),
        "evaluate_expression called on invalid expression \"{}\"",
        expression.source()
    );

    let mut evaluator = Evaluator {
        expression,
        variables,
        sink,
        stack: Vec::with_capacity(expression.queue().len()),
    };
    for item in expression.queue() {
        match item {
            ExpressionItem::Operand(value) => evaluator.stack.push(value.clone()),
            ExpressionItem::Operator(operator) => evaluator.apply(*operator),
        }
    }
    let result = evaluator.pop();
    debug_assert!(
        evaluator.stack.is_empty(),
        "postfix queue left extra operands"
    );
    result
}

struct Evaluator<'a> {
    expression: &'a Expression,
    variables: &'a BTreeMap<String, Value>,
    sink: &'a dyn DiagnosticSink,
    stack: Vec<Value>,
}

impl Evaluator<'_> {
    fn apply(&mut self, operator: Operator) {
        let result = if operator.is_unary() {
            let operand = self.pop();
            unary(operator, &operand)
        } else {
            let rhs = self.pop();
            let lhs = self.pop();
            binary(operator, &lhs, &rhs)
        };
        match result {
            Ok(value) => self.stack.push(value),
            Err(error) => {
                self.report(error);
                self.stack.push(Value::Invalid);
            }
        }
    }

    /// Pop the top operand, resolving a variable reference to its stored value.
    fn pop(&mut self) -> Value {
        let value = self
            .stack
            .pop()
            .expect("valid postfix queue never underflows");
        let Value::Variable(name) = value else {
            return value;
        };
        match self.variables.get(&name) {
            Some(stored) if !stored.is_variable() => stored.clone(),
            Some(_) => {
                self.report(ParleyError::new(
                    "EVAL_VARIABLE_INDIRECT",
                    format!("Variable \"{}\" holds another variable reference.", name),
                ));
                Value::Invalid
            }
            None => {
                self.report(ParleyError::new(
                    "EVAL_VARIABLE_MISSING",
                    format!("Variable \"{}\" is not set.", name),
                ));
                Value::Invalid
            }
        }
    }

    fn report(&self, error: ParleyError) {
        self.sink
            .report(Diagnostic::error(error).with_context(self.expression.source()));
    }
}

fn unary(operator: Operator, operand: &Value) -> Result<Value, ParleyError> {
    match operator {
        Operator::Not => Ok(Value::Boolean(!operand.is_truthy())),
        other => Err(not_an_operation(other)),
    }
}

fn binary(operator: Operator, lhs: &Value, rhs: &Value) -> Result<Value, ParleyError> {
    match operator {
        Operator::And => return Ok(Value::Boolean(lhs.is_truthy() && rhs.is_truthy())),
        Operator::Or => return Ok(Value::Boolean(lhs.is_truthy() || rhs.is_truthy())),
        Operator::Equal => return Ok(Value::Boolean(lhs.loose_eq(rhs))),
        Operator::NotEqual => return Ok(Value::Boolean(!lhs.loose_eq(rhs))),
        _ => {}
    }

    // An operand that already failed has been reported once.
    if lhs.is_invalid() || rhs.is_invalid() {
        return Ok(Value::Invalid);
    }

    match operator {
        Operator::Add => lhs.checked_add(rhs),
        Operator::Subtract => lhs.checked_sub(rhs),
        Operator::Multiply => lhs.checked_mul(rhs),
        Operator::Divide => lhs.checked_div(rhs),
        Operator::Less => ordered(lhs, rhs, Ordering::is_lt),
        Operator::LessEqual => ordered(lhs, rhs, Ordering::is_le),
        Operator::Greater => ordered(lhs, rhs, Ordering::is_gt),
        Operator::GreaterEqual => ordered(lhs, rhs, Ordering::is_ge),
        other => Err(not_an_operation(other)),
    }
}

fn ordered(lhs: &Value, rhs: &Value, test: fn(Ordering) -> bool) -> Result<Value, ParleyError> {
    lhs.compare(rhs).map(|ordering| Value::Boolean(test(ordering)))
}

fn not_an_operation(operator: Operator) -> ParleyError {
    ParleyError::new(
        "EVAL_OPERATOR_UNSUPPORTED",
        format!("Operator \"{}\" cannot be applied here.", operator.symbol()),
    )
}
