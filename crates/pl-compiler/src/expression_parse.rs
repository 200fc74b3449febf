use std::sync::OnceLock;

use pl_core::{
    Diagnostic, DiagnosticSink, Expression, ExpressionItem, Operator, ParleyError, Value,
};
use regex::Regex;

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    column: usize,
    recognised: bool,
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Variable references, two-character symbols, single-character
        // operators and parentheses, numbers, quoted text, bare words.
        Regex::new(
            r#"\{[\w.]+\}|&&|\|\||<>|!=|<=|>=|==|[-+*/()<>=!]|\d+(?:\.\d*)?|"[^"]*"|[A-Za-z_]\w*"#,
        )
        .expect("token pattern should compile")
    })
}

fn quoted_text_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"^"([^"]*)"$"#).expect("text pattern should compile"))
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\{([^}]*)\}$").expect("variable pattern should compile"))
}

/// Compile `source` into a postfix expression. Every problem is reported to
/// `sink` tagged with `context`; any problem makes the result invalid.
pub fn parse_expression(source: &str, context: &str, sink: &dyn DiagnosticSink) -> Expression {
    match try_parse_expression(source) {
        Ok(expression) => expression,
        Err(errors) => {
            for error in errors {
                sink.report(Diagnostic::error(error).with_context(context));
            }
            Expression::invalid(source)
        }
    }
}

/// Shunting-yard over the token stream. Keeps going after the first problem so
/// that all of them are returned together.
pub fn try_parse_expression(source: &str) -> Result<Expression, Vec<ParleyError>> {
    let mut errors = Vec::new();
    let tokens = tokenize(source);
    if tokens.is_empty() {
        return Err(vec![ParleyError::new(
            "EXPR_EMPTY",
            "Expression is empty.",
        )]);
    }

    let mut output = Vec::new();
    let mut operators: Vec<Operator> = Vec::new();
    let mut expect_operand = true;
    // Set after an unrecognised token so that its neighbours do not also
    // report misplaced operands or operators.
    let mut recovering = false;
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        let lenient = std::mem::take(&mut recovering);
        if !token.recognised {
            errors.push(unrecognised(token.text, token.column));
            expect_operand = false;
            recovering = true;
            continue;
        }

        if let Some(operator) = parse_operator(token.text) {
            match operator {
                Operator::LParen => {
                    if !expect_operand && !lenient {
                        errors.push(out_of_place(token, false));
                    }
                    operators.push(operator);
                    expect_operand = true;
                }
                Operator::RParen => {
                    if expect_operand && !lenient {
                        errors.push(out_of_place(token, true));
                    }
                    loop {
                        match operators.pop() {
                            Some(Operator::LParen) => break,
                            Some(top) => output.push(ExpressionItem::Operator(top)),
                            None => {
                                errors.push(mismatched(token.column));
                                break;
                            }
                        }
                    }
                    expect_operand = false;
                }
                Operator::Subtract if expect_operand => {
                    let negative = iter
                        .peek()
                        .and_then(|next| parse_number(&format!("-{}", next.text)));
                    match negative {
                        Some(value) => {
                            iter.next();
                            output.push(ExpressionItem::Operand(value));
                            expect_operand = false;
                        }
                        None if lenient => {}
                        None => errors.push(out_of_place(token, true)),
                    }
                }
                _ => {
                    if operator.is_unary() != expect_operand && !lenient {
                        errors.push(out_of_place(token, expect_operand));
                    }
                    while let Some(&top) = operators.last() {
                        if top == Operator::LParen {
                            break;
                        }
                        let takes_priority = top.precedence() > operator.precedence()
                            || (top.precedence() == operator.precedence()
                                && operator.is_left_associative());
                        if !takes_priority {
                            break;
                        }
                        operators.pop();
                        output.push(ExpressionItem::Operator(top));
                    }
                    operators.push(operator);
                    expect_operand = true;
                }
            }
            continue;
        }

        match parse_operand(token.text) {
            Some(value) => {
                if !expect_operand && !lenient {
                    errors.push(out_of_place(token, false));
                }
                output.push(ExpressionItem::Operand(value));
            }
            None => {
                errors.push(unrecognised(token.text, token.column));
                recovering = true;
            }
        }
        expect_operand = false;
    }

    if expect_operand {
        errors.push(ParleyError::new(
            "EXPR_MISSING_OPERAND",
            "Expression ends where an operand was expected.",
        ));
    }

    while let Some(top) = operators.pop() {
        if top == Operator::LParen {
            errors.push(mismatched(source.len() + 1));
            continue;
        }
        output.push(ExpressionItem::Operator(top));
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Expression::from_postfix(source, output).map_err(|error| vec![error])
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0usize;
    for found in token_pattern().find_iter(source) {
        push_gap(source, cursor, found.start(), &mut tokens);
        tokens.push(Token {
            text: found.as_str(),
            column: found.start() + 1,
            recognised: true,
        });
        cursor = found.end();
    }
    push_gap(source, cursor, source.len(), &mut tokens);
    tokens
}

/// Input between two matches that is not whitespace becomes one unrecognised
/// token, so the parser can report it in order.
fn push_gap<'a>(source: &'a str, start: usize, end: usize, tokens: &mut Vec<Token<'a>>) {
    let gap = &source[start..end];
    let trimmed = gap.trim();
    if trimmed.is_empty() {
        return;
    }
    let offset = gap.len() - gap.trim_start().len();
    tokens.push(Token {
        text: trimmed,
        column: start + offset + 1,
        recognised: false,
    });
}

fn parse_operator(text: &str) -> Option<Operator> {
    let operator = match text {
        "+" => Operator::Add,
        "-" => Operator::Subtract,
        "*" => Operator::Multiply,
        "/" => Operator::Divide,
        "and" | "&&" => Operator::And,
        "or" | "||" => Operator::Or,
        "not" | "!" => Operator::Not,
        "==" | "=" => Operator::Equal,
        "!=" | "<>" => Operator::NotEqual,
        "<" => Operator::Less,
        "<=" => Operator::LessEqual,
        ">" => Operator::Greater,
        ">=" => Operator::GreaterEqual,
        "(" => Operator::LParen,
        ")" => Operator::RParen,
        _ => return None,
    };
    Some(operator)
}

/// Literal recognition, first match wins: booleans, genders, quoted text,
/// variable references, integers, decimals.
pub fn parse_operand(text: &str) -> Option<Value> {
    if text.eq_ignore_ascii_case("true") {
        return Some(Value::Boolean(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Some(Value::Boolean(false));
    }
    if let Some(gender) = pl_core::Gender::from_keyword(text) {
        return Some(Value::Gender(gender));
    }
    if let Some(captures) = quoted_text_pattern().captures(text) {
        return Some(Value::text(&captures[1]));
    }
    if let Some(captures) = variable_pattern().captures(text) {
        return Some(Value::variable(&captures[1]));
    }
    parse_number(text)
}

fn parse_number(text: &str) -> Option<Value> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(value) = text.parse::<i32>() {
        return Some(Value::Int(value));
    }
    text.parse::<f32>().ok().map(Value::Float)
}

fn out_of_place(token: &Token<'_>, expected_operand: bool) -> ParleyError {
    let (code, wanted) = if expected_operand {
        ("EXPR_MISSING_OPERAND", "expected an operand")
    } else {
        ("EXPR_MISSING_OPERATOR", "expected an operator")
    };
    ParleyError::new(
        code,
        format!(
            "Unexpected \"{}\" at column {}: {}.",
            token.text, token.column, wanted
        ),
    )
}

fn unrecognised(text: &str, column: usize) -> ParleyError {
    ParleyError::new(
        "EXPR_UNRECOGNISED_TOKEN",
        format!("Unrecognised token \"{}\" at column {}.", text, column),
    )
}

fn mismatched(column: usize) -> ParleyError {
    ParleyError::new(
        "EXPR_MISMATCHED_PARENS",
        format!("Mismatched parentheses at column {}.", column),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_core::{CollectingSink, Gender};

    fn postfix(source: &str) -> String {
        try_parse_expression(source)
            .unwrap_or_else(|errors| panic!("{} should parse: {:?}", source, errors))
            .to_string()
    }

    fn error_codes(source: &str) -> Vec<String> {
        try_parse_expression(source)
            .expect_err("expression should fail")
            .into_iter()
            .map(|error| error.code)
            .collect()
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        assert_eq!(postfix("2 + 3 * 4"), "2 3 4 * +");
        assert_eq!(postfix("(2 + 3) * 4"), "2 3 + 4 *");
    }

    #[test]
    fn equal_precedence_is_left_associative() {
        assert_eq!(postfix("10 - 3 - 2"), "10 3 - 2 -");
        assert_eq!(postfix("8 / 4 * 2"), "8 4 / 2 *");
    }

    #[test]
    fn not_is_unary_prefix_and_right_associative() {
        assert_eq!(postfix("not true"), "true not");
        assert_eq!(postfix("not not false"), "false not not");
        assert_eq!(postfix("not false and true"), "false not true and");
        assert_eq!(postfix("!{a} || {b}"), "{a} not {b} or");
    }

    #[test]
    fn logical_and_comparison_ladder() {
        assert_eq!(
            postfix("{x} + 1 > 2 and {y} or {z}"),
            "{x} 1 + 2 > {y} and {z} or"
        );
        assert_eq!(postfix("{a} = 1 && {b} <> 2"), "{a} 1 == {b} 2 != and");
        assert_eq!(postfix("1 <= 2 == true"), "1 2 <= true ==");
    }

    #[test]
    fn operands_are_recognised_in_order() {
        let literal = |source: &str| {
            try_parse_expression(source)
                .expect("literal should parse")
                .queue()[0]
                .clone()
        };
        assert_eq!(literal("TRUE"), ExpressionItem::Operand(Value::Boolean(true)));
        assert_eq!(
            literal("Feminine"),
            ExpressionItem::Operand(Value::Gender(Gender::Feminine))
        );
        assert_eq!(
            literal("\"Hello world\""),
            ExpressionItem::Operand(Value::text("Hello world"))
        );
        assert_eq!(
            literal("{SpeakerName.Player}"),
            ExpressionItem::Operand(Value::variable("SpeakerName.Player"))
        );
        assert_eq!(literal("42"), ExpressionItem::Operand(Value::Int(42)));
        assert_eq!(literal("12.5"), ExpressionItem::Operand(Value::Float(12.5)));
        assert_eq!(literal("3."), ExpressionItem::Operand(Value::Float(3.0)));
    }

    #[test]
    fn quoted_text_keeps_inner_spaces_and_operators() {
        let expression = try_parse_expression("\"a + b\" == {x}").expect("parse");
        assert_eq!(
            expression.queue()[0],
            ExpressionItem::Operand(Value::text("a + b"))
        );
    }

    #[test]
    fn leading_minus_folds_into_negative_literal() {
        assert_eq!(postfix("-5"), "-5");
        assert_eq!(postfix("3 * -2"), "3 -2 *");
        assert_eq!(postfix("3 - 2"), "3 2 -");
        assert_eq!(postfix("(-1.5)"), "-1.5");
        assert_eq!(error_codes("-{x}"), vec!["EXPR_MISSING_OPERAND"]);
    }

    #[test]
    fn mismatched_parentheses_are_invalid() {
        assert_eq!(error_codes("(1 + 2"), vec!["EXPR_MISMATCHED_PARENS"]);
        assert_eq!(error_codes("1 + 2)"), vec!["EXPR_MISMATCHED_PARENS"]);
        assert!(error_codes("((1)").contains(&"EXPR_MISMATCHED_PARENS".to_string()));
    }

    #[test]
    fn malformed_operator_sequences_are_rejected() {
        assert_eq!(error_codes("1 +"), vec!["EXPR_MISSING_OPERAND"]);
        assert_eq!(error_codes("* 2"), vec!["EXPR_MISSING_OPERAND"]);
        assert_eq!(error_codes("1 2"), vec!["EXPR_MISSING_OPERATOR"]);
        assert_eq!(
            error_codes("true not"),
            vec!["EXPR_MISSING_OPERATOR", "EXPR_MISSING_OPERAND"]
        );
        assert_eq!(error_codes("1 (2)"), vec!["EXPR_MISSING_OPERATOR"]);
        assert!(!error_codes("()").is_empty());
    }

    #[test]
    fn unknown_input_is_reported_and_parsing_continues() {
        let codes = error_codes("1 $ 2 + banana");
        assert_eq!(
            codes,
            vec!["EXPR_UNRECOGNISED_TOKEN", "EXPR_UNRECOGNISED_TOKEN"]
        );
        assert!(!error_codes("inf").is_empty());
        assert!(!error_codes("android").is_empty());
    }

    #[test]
    fn empty_input_is_invalid() {
        assert_eq!(error_codes(""), vec!["EXPR_EMPTY"]);
        assert_eq!(error_codes("   "), vec!["EXPR_EMPTY"]);
    }

    #[test]
    fn parse_expression_reports_every_error_with_context() {
        let sink = CollectingSink::new();
        let expression = parse_expression("(1 + ? ", "nodes[2] set x", &sink);
        assert!(!expression.is_valid());
        assert_eq!(expression.source(), "(1 + ? ");
        let diagnostics = sink.diagnostics();
        assert!(diagnostics.len() >= 2);
        assert!(diagnostics
            .iter()
            .all(|diagnostic| diagnostic.context.as_deref() == Some("nodes[2] set x")));
        assert!(sink.contains("EXPR_UNRECOGNISED_TOKEN"));
        assert!(sink.contains("EXPR_MISMATCHED_PARENS"));
    }
}
