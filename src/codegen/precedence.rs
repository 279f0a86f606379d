//! # Operator Precedence
//!
//! Python operator strength, used to decide when a nested expression needs
//! parentheses.

/// Binding strength of a rendered expression, tightest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Literals, names, parenthesised or bracketed forms
    Atomic,
    /// `x.attr`, `x[i]`
    Member,
    /// `f(x)`
    FunctionCall,
    /// `**`
    Exponentiation,
    /// Unary `-` and `+`
    UnarySign,
    /// `*`, `/`, `//`, `%`
    Multiplicative,
    /// `+`, `-`
    Additive,
    /// Comparisons and `in`
    Relational,
    /// `not`
    LogicalNot,
    /// `and`
    LogicalAnd,
    /// `or`
    LogicalOr,
    /// `x if c else y`
    Conditional,
    /// No surrounding operator (call arguments, statements)
    None,
}

impl Order {
    fn rank(self) -> u8 {
        match self {
            Order::Atomic => 0,
            Order::Member | Order::FunctionCall => 1,
            Order::Exponentiation => 2,
            Order::UnarySign => 3,
            Order::Multiplicative => 4,
            Order::Additive => 5,
            Order::Relational => 6,
            Order::LogicalNot => 7,
            Order::LogicalAnd => 8,
            Order::LogicalOr => 9,
            Order::Conditional => 10,
            Order::None => 11,
        }
    }
}

/// How an operand position treats a child of equal strength
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Equal strength is fine (left operands, associative positions)
    Loose,
    /// Child must bind strictly tighter (right operands of `-`, `/`, `%`,
    /// both sides of a comparison, the base of `**`)
    Strict,
}

/// Whether `child` must be wrapped in parentheses when placed in a
/// position expecting `context`
pub fn needs_parens(child: Order, context: Order, binding: Binding) -> bool {
    match binding {
        Binding::Loose => child.rank() > context.rank(),
        Binding::Strict => child.rank() >= context.rank() && context != Order::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tighter_child_is_bare() {
        assert!(!needs_parens(Order::Multiplicative, Order::Additive, Binding::Loose));
        assert!(!needs_parens(Order::Atomic, Order::Relational, Binding::Strict));
    }

    #[test]
    fn test_looser_child_is_wrapped() {
        assert!(needs_parens(Order::Additive, Order::Multiplicative, Binding::Loose));
        assert!(needs_parens(Order::LogicalOr, Order::LogicalAnd, Binding::Loose));
    }

    #[test]
    fn test_equal_strength_depends_on_binding() {
        assert!(!needs_parens(Order::Additive, Order::Additive, Binding::Loose));
        assert!(needs_parens(Order::Additive, Order::Additive, Binding::Strict));
        assert!(needs_parens(Order::Relational, Order::Relational, Binding::Strict));
    }

    #[test]
    fn test_member_and_call_share_strength() {
        assert!(!needs_parens(Order::FunctionCall, Order::Member, Binding::Loose));
        assert!(!needs_parens(Order::Member, Order::FunctionCall, Binding::Loose));
    }

    #[test]
    fn test_nothing_is_wrapped_without_an_operator() {
        assert!(!needs_parens(Order::Conditional, Order::None, Binding::Loose));
        assert!(!needs_parens(Order::None, Order::None, Binding::Strict));
    }
}
