//! Arithmetic evaluator
//!
//! Small recursive-descent evaluator for infix arithmetic, used by the tool
//! executor's `calculate` built-in. Supports `+ - * /`, parentheses, unary
//! minus, and decimal numbers. Division by zero and malformed input are
//! errors, never panics.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("Unexpected character '{0}' in expression")]
    UnexpectedCharacter(char),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Expected ')' in expression")]
    UnbalancedParenthesis,

    #[error("Trailing input after expression: '{0}'")]
    TrailingInput(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Malformed number '{0}'")]
    MalformedNumber(String),
}

/// Evaluate an infix arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let mut parser = Parser {
        chars: expression.chars().collect(),
        position: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.position < parser.chars.len() {
        return Err(CalcError::TrailingInput(
            parser.chars[parser.position..].iter().collect(),
        ));
    }
    Ok(value)
}

/// Render a result the way a person would write it: integers without a
/// decimal point, everything else as-is.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct Parser {
    chars: Vec<char>,
    position: usize,
}

impl Parser {
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.position += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('+') => {
                    self.position += 1;
                    value += self.term()?;
                }
                Some('-') => {
                    self.position += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('*') => {
                    self.position += 1;
                    value *= self.factor()?;
                }
                Some('/') => {
                    self.position += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // factor := '-' factor | '(' expression ')' | number
    fn factor(&mut self) -> Result<f64, CalcError> {
        self.skip_whitespace();
        match self.peek() {
            Some('-') => {
                self.position += 1;
                Ok(-self.factor()?)
            }
            Some('(') => {
                self.position += 1;
                let value = self.expression()?;
                self.skip_whitespace();
                if self.peek() != Some(')') {
                    return Err(CalcError::UnbalancedParenthesis);
                }
                self.position += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(CalcError::UnexpectedCharacter(c)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.position;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.position += 1;
        }
        let text: String = self.chars[start..self.position].iter().collect();
        text.parse().map_err(|_| CalcError::MalformedNumber(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("3 * 312").unwrap(), 936.0);
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
    }

    #[test]
    fn unary_minus_and_decimals() {
        assert_eq!(evaluate("-3 + 1.5").unwrap(), -1.5);
        assert_eq!(evaluate("-(2 * 3)").unwrap(), -6.0);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(matches!(evaluate("2 +"), Err(CalcError::UnexpectedEnd)));
        assert!(matches!(evaluate("(1 + 2"), Err(CalcError::UnbalancedParenthesis)));
        assert!(matches!(evaluate("2 ^ 3"), Err(CalcError::TrailingInput(_))));
        assert!(matches!(evaluate("hello"), Err(CalcError::UnexpectedCharacter('h'))));
        assert!(matches!(evaluate("1..2"), Err(CalcError::MalformedNumber(_))));
    }

    #[test]
    fn integer_results_format_without_decimal_point() {
        assert_eq!(format_number(936.0), "936");
        assert_eq!(format_number(-4.0), "-4");
        assert_eq!(format_number(1.5), "1.5");
    }
}
