//! Condition strings used by `IF_BEGIN`, `WHILE_CHECK` and `ASSERT`
//!
//! Two forms are understood:
//!
//! - `left op right` (three or more whitespace separated tokens, extras
//!   ignored): integer comparison where `right` is a literal or a register
//! - anything shorter: a flag, true when the string register holds `true`
//!   (any case) or the integer register is non-zero
//!
//! Malformed input evaluates to false; evaluation never fails.

use pyrium_vm_bytecode::Opcode;

/// Register lookups a condition needs
pub trait Scope {
    /// Integer register value, 0 when unwritten
    fn int(&self, name: &str) -> i64;

    /// String register value, if written
    fn string(&self, name: &str) -> Option<&str>;
}

/// Integer comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparison {
    /// Parse an operator token, symbolic or as spelled by the compiler
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "==" | "Eq" => Self::Eq,
            "!=" | "NotEq" => Self::Ne,
            "<" | "Lt" => Self::Lt,
            "<=" | "LtE" => Self::Le,
            ">" | "Gt" => Self::Gt,
            ">=" | "GtE" => Self::Ge,
            _ => return None,
        })
    }

    /// Comparison performed by a `COMP_*` opcode
    pub fn for_opcode(opcode: Opcode) -> Option<Self> {
        Some(match opcode {
            Opcode::CompEq => Self::Eq,
            Opcode::CompNe => Self::Ne,
            Opcode::CompLt => Self::Lt,
            Opcode::CompLe => Self::Le,
            Opcode::CompGt => Self::Gt,
            Opcode::CompGe => Self::Ge,
            _ => return None,
        })
    }

    /// Apply the comparison
    #[inline]
    pub fn apply(self, left: i64, right: i64) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'a> {
    /// Integer literal
    Literal(i64),
    /// Integer register name
    Register(&'a str),
}

/// A parsed condition string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition<'a> {
    /// Single register truth test
    Flag(&'a str),
    /// `left op right`
    Compare {
        /// Integer register on the left
        left: &'a str,
        /// Operator
        op: Comparison,
        /// Literal or register on the right
        right: Operand<'a>,
    },
    /// Unparseable input, always false
    Never,
}

impl<'a> Condition<'a> {
    /// Parse a condition string
    pub fn parse(text: &'a str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::Never;
        }

        let mut tokens = text.split_whitespace();
        let (Some(left), Some(op), Some(right)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Self::Flag(text);
        };

        let Some(op) = Comparison::parse(op) else {
            return Self::Never;
        };

        let right = if is_integer_literal(right) {
            match right.parse() {
                Ok(v) => Operand::Literal(v),
                Err(_) => return Self::Never,
            }
        } else {
            Operand::Register(right)
        };

        Self::Compare { left, op, right }
    }

    /// Evaluate against a register scope
    pub fn evaluate<S: Scope + ?Sized>(&self, scope: &S) -> bool {
        match *self {
            Self::Never => false,
            Self::Flag(name) => {
                scope
                    .string(name)
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"))
                    || scope.int(name) != 0
            }
            Self::Compare { left, op, right } => {
                let r = match right {
                    Operand::Literal(v) => v,
                    Operand::Register(name) => scope.int(name),
                };
                op.apply(scope.int(left), r)
            }
        }
    }
}

/// Parse and evaluate in one step
pub fn evaluate<S: Scope + ?Sized>(text: &str, scope: &S) -> bool {
    Condition::parse(text).evaluate(scope)
}

fn is_integer_literal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    struct MapScope {
        ints: FxHashMap<&'static str, i64>,
        strings: FxHashMap<&'static str, &'static str>,
    }

    impl Scope for MapScope {
        fn int(&self, name: &str) -> i64 {
            self.ints.get(name).copied().unwrap_or(0)
        }

        fn string(&self, name: &str) -> Option<&str> {
            self.strings.get(name).copied()
        }
    }

    fn scope() -> MapScope {
        let mut s = MapScope::default();
        s.ints.insert("x", 5);
        s.ints.insert("y", 7);
        s.ints.insert("on", 1);
        s.strings.insert("flag", "TRUE");
        s.strings.insert("other", "yes");
        s
    }

    fn eval(text: &str) -> bool {
        evaluate(text, &scope())
    }

    #[test]
    fn test_comparisons() {
        assert!(eval("x == 5"));
        assert!(eval("x != 6"));
        assert!(eval("x < y"));
        assert!(eval("x <= 5"));
        assert!(eval("y > x"));
        assert!(eval("y >= -3"));
        assert!(!eval("x > y"));
        assert!(eval("missing == 0"));
    }

    #[test]
    fn test_compiler_operator_names() {
        assert!(eval("x Eq 5"));
        assert!(eval("x NotEq 4"));
        assert!(eval("x Lt y"));
        assert!(eval("x LtE 5"));
        assert!(eval("y Gt x"));
        assert!(eval("y GtE 7"));
    }

    #[test]
    fn test_flags() {
        assert!(eval("flag"));
        assert!(eval("on"));
        assert!(!eval("other"));
        assert!(!eval("missing"));
        assert!(eval("  on  "));
    }

    #[test]
    fn test_malformed_is_false() {
        assert!(!eval(""));
        assert!(!eval("   "));
        assert!(!eval("x ~= 5"));
        assert!(!eval("x == 99999999999999999999"));
        assert_eq!(Condition::parse("x =="), Condition::Flag("x =="));
    }

    #[test]
    fn test_extra_tokens_ignored() {
        assert!(eval("x == 5 and more"));
    }

    #[test]
    fn test_literal_detection() {
        assert_eq!(
            Condition::parse("x == -12"),
            Condition::Compare {
                left: "x",
                op: Comparison::Eq,
                right: Operand::Literal(-12),
            }
        );
        assert_eq!(
            Condition::parse("x == -"),
            Condition::Compare {
                left: "x",
                op: Comparison::Eq,
                right: Operand::Register("-"),
            }
        );
    }
}
