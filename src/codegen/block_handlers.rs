//! # Block Handlers
//!
//! Generation rules for every block kind. Dispatch is an exhaustive `match`
//! on [`BlockKind`], so a kind without a rule does not compile.

use super::precedence::{Binding, Order};
use super::python_codegen::PythonCodeGenerator;
use crate::catalog::BlockKind;
use crate::graph::{BlockInstance, FieldValue};

/// Output of a single generation rule
#[derive(Debug, Clone, PartialEq)]
pub enum Generated {
    /// Expression text and how tightly it binds
    Expr(String, Order),
    /// One or more complete lines, each ending in `\n`
    Stmt(String),
    /// Rendered elsewhere (procedure definitions) or not at all
    Nothing,
}

/// Builtins and module names a block's output relies on. User names are
/// kept clear of these for the pass.
pub fn reserved_names(block: &BlockInstance) -> &'static [&'static str] {
    use BlockKind::*;
    match block.kind() {
        ControlsRepeatExt => &["range", "int"],
        ControlsFor => &["range"],
        MathNumber => match block.field("NUM") {
            Some(FieldValue::Number(value)) if !value.is_finite() => &["float"],
            _ => &[],
        },
        MathSingle => &["math", "abs"],
        MathConstant => &["math", "float"],
        MathRound => &["math", "round"],
        MathRandomInt | MathRandomFloat => &["random"],
        MathOnList => match block.choice("OP") {
            Some("MIN") => &["min"],
            Some("MAX") => &["max"],
            Some("AVERAGE") => &["sum", "len", "float", "isinstance", "Number"],
            Some("RANDOM") => &["random"],
            _ => &["sum"],
        },
        TextJoin => &["str", "map"],
        TextPrint => &["print"],
        TextLength | ListsLength | ListsIsEmpty => &["len"],
        ListsSetIndex => &["list"],
        _ => &[],
    }
}

impl PythonCodeGenerator<'_> {
    /// Apply the generation rule for `block`
    pub(super) fn generate_block(&mut self, block: &BlockInstance) -> Generated {
        use BlockKind::*;
        tracing::debug!("[CODEGEN] Generating {} ({})", block.id(), block.kind());

        match block.kind() {
            // Logic
            ControlsIf => self.generate_if(block),
            LogicCompare => self.generate_compare(block),
            LogicOperation => self.generate_logic_operation(block),
            LogicNegate => {
                let value = self.value_or(block, "BOOL", Order::LogicalNot, Binding::Loose, "True");
                Generated::Expr(format!("not {}", value), Order::LogicalNot)
            }
            LogicBoolean => {
                let value = if block.choice("BOOL") == Some("FALSE") { "False" } else { "True" };
                Generated::Expr(value.to_string(), Order::Atomic)
            }
            LogicNull => Generated::Expr("None".to_string(), Order::Atomic),
            LogicTernary => {
                let condition = self.value_or(block, "IF", Order::Conditional, Binding::Strict, "False");
                let then = self.value_or(block, "THEN", Order::Conditional, Binding::Strict, "None");
                let otherwise = self.value_or(block, "ELSE", Order::Conditional, Binding::Loose, "None");
                Generated::Expr(
                    format!("{} if {} else {}", then, condition, otherwise),
                    Order::Conditional,
                )
            }

            // Loops
            ControlsRepeatExt => self.generate_repeat(block),
            ControlsWhileUntil => self.generate_while(block),
            ControlsFor => self.generate_for(block),
            ControlsForEach => {
                let variable = self.variable_name(block, "VAR").unwrap_or_else(|| "_".to_string());
                let list = self.value_or(block, "LIST", Order::Relational, Binding::Loose, "[]");
                let body = self.loop_body_to_code(block, "DO");
                Generated::Stmt(format!("for {} in {}:\n{}", variable, list, body))
            }
            ControlsFlowStatements => {
                let keyword = match block.choice("FLOW") {
                    Some("CONTINUE") => "continue",
                    _ => "break",
                };
                if self.loop_depth == 0 {
                    tracing::debug!("[CODEGEN] {} outside a loop dropped ({})", keyword, block.id());
                    return Generated::Stmt(String::new());
                }
                Generated::Stmt(format!("{}\n", keyword))
            }

            // Math
            MathNumber => {
                let value = match block.field("NUM") {
                    Some(FieldValue::Number(value)) => *value,
                    _ => 0.0,
                };
                let (code, order) = format_number(value);
                Generated::Expr(code, order)
            }
            MathArithmetic => self.generate_arithmetic(block),
            MathAssignment => self.generate_assignment(block),
            MathSingle => self.generate_math_single(block),
            MathConstant => self.generate_constant(block),
            MathModulo => {
                let dividend = self.value_or(block, "DIVIDEND", Order::Multiplicative, Binding::Loose, "0");
                let divisor = self.value_or(block, "DIVISOR", Order::Multiplicative, Binding::Strict, "0");
                Generated::Expr(format!("{} % {}", dividend, divisor), Order::Multiplicative)
            }
            MathRound => {
                let value = self.value_or(block, "NUM", Order::None, Binding::Loose, "0");
                let code = match block.choice("OP") {
                    Some("ROUNDUP") => {
                        self.context.add_import("import math");
                        format!("math.ceil({})", value)
                    }
                    Some("ROUNDDOWN") => {
                        self.context.add_import("import math");
                        format!("math.floor({})", value)
                    }
                    _ => format!("round({})", value),
                };
                Generated::Expr(code, Order::FunctionCall)
            }
            MathRandomInt => {
                self.context.add_import("import random");
                let from = self.value_or(block, "FROM", Order::None, Binding::Loose, "0");
                let to = self.value_or(block, "TO", Order::None, Binding::Loose, "0");
                Generated::Expr(format!("random.randint({}, {})", from, to), Order::FunctionCall)
            }
            MathRandomFloat => {
                self.context.add_import("import random");
                Generated::Expr("random.random()".to_string(), Order::FunctionCall)
            }
            MathOnList => self.generate_on_list(block),

            // Text
            CommentBlock => {
                let text = match block.field("TEXT") {
                    Some(FieldValue::Text(text)) => text.as_str(),
                    _ => "",
                };
                Generated::Stmt(comment(text))
            }
            Text => {
                let text = match block.field("TEXT") {
                    Some(FieldValue::Text(text)) => text.as_str(),
                    _ => "",
                };
                Generated::Expr(quote(text), Order::Atomic)
            }
            TextJoin => self.generate_text_join(block),
            TextPrint => {
                let value = self.value_or(block, "TEXT", Order::None, Binding::Loose, "''");
                Generated::Stmt(format!("print({})\n", value))
            }
            TextLength => {
                let value = self.value_or(block, "VALUE", Order::None, Binding::Loose, "''");
                Generated::Expr(format!("len({})", value), Order::FunctionCall)
            }

            // Lists
            ListsCreateWith => {
                let items: Vec<String> = (0..block.mutation().items)
                    .map(|i| self.value_or(block, &format!("ADD{}", i), Order::None, Binding::Loose, "None"))
                    .collect();
                Generated::Expr(format!("[{}]", items.join(", ")), Order::Atomic)
            }
            ListsLength => {
                let list = self.value_or(block, "VALUE", Order::None, Binding::Loose, "[]");
                Generated::Expr(format!("len({})", list), Order::FunctionCall)
            }
            ListsIsEmpty => {
                let list = self.value_or(block, "VALUE", Order::None, Binding::Loose, "[]");
                Generated::Expr(format!("not len({})", list), Order::LogicalNot)
            }
            ListsGetIndex => self.generate_get_index(block),
            ListsSetIndex => self.generate_set_index(block),

            // Variables
            VariablesGet => {
                let name = self.variable_name(block, "VAR").unwrap_or_else(|| "None".to_string());
                Generated::Expr(name, Order::Atomic)
            }
            VariablesSet => {
                let name = self.variable_name(block, "VAR").unwrap_or_else(|| "_".to_string());
                let value = self.value_or(block, "VALUE", Order::None, Binding::Loose, "None");
                Generated::Stmt(format!("{} = {}\n", name, value))
            }

            // Functions
            ProceduresDefNoReturn | ProceduresDefReturn => Generated::Nothing,
            ProceduresCallNoReturn | ProceduresCallReturn => self.generate_call(block),
        }
    }

    fn generate_if(&mut self, block: &BlockInstance) -> Generated {
        let mutation = block.mutation();
        let mut code = String::new();
        for n in 0..=mutation.items {
            let condition = self.value_or(block, &format!("IF{}", n), Order::None, Binding::Loose, "False");
            let body = self.statement_to_code(block, &format!("DO{}", n));
            let keyword = if n == 0 { "if" } else { "elif" };
            code.push_str(&format!("{} {}:\n{}", keyword, condition, body));
        }
        if mutation.has_else {
            let body = self.statement_to_code(block, "ELSE");
            code.push_str(&format!("else:\n{}", body));
        }
        Generated::Stmt(code)
    }

    fn generate_compare(&mut self, block: &BlockInstance) -> Generated {
        let operator = match block.choice("OP") {
            Some("NEQ") => "!=",
            Some("LT") => "<",
            Some("LTE") => "<=",
            Some("GT") => ">",
            Some("GTE") => ">=",
            _ => "==",
        };
        // Python chains comparisons, so neither side may be one
        let a = self.value_or(block, "A", Order::Relational, Binding::Strict, "0");
        let b = self.value_or(block, "B", Order::Relational, Binding::Strict, "0");
        Generated::Expr(format!("{} {} {}", a, operator, b), Order::Relational)
    }

    fn generate_logic_operation(&mut self, block: &BlockInstance) -> Generated {
        let (operator, order) = match block.choice("OP") {
            Some("OR") => ("or", Order::LogicalOr),
            _ => ("and", Order::LogicalAnd),
        };
        let a = self.value_to_code(block, "A", order, Binding::Loose);
        let b = self.value_to_code(block, "B", order, Binding::Loose);
        let (a, b) = match (a, b) {
            (None, None) => ("False".to_string(), "False".to_string()),
            (a, b) => {
                // A single missing operand must not change the other's value
                let neutral = if operator == "and" { "True" } else { "False" };
                (
                    a.unwrap_or_else(|| neutral.to_string()),
                    b.unwrap_or_else(|| neutral.to_string()),
                )
            }
        };
        Generated::Expr(format!("{} {} {}", a, operator, b), order)
    }

    fn generate_repeat(&mut self, block: &BlockInstance) -> Generated {
        let times = match self.value_to_code(block, "TIMES", Order::None, Binding::Loose) {
            Some(code) => match code.parse::<f64>() {
                Ok(value) if (i64::MIN as f64..i64::MAX as f64).contains(&value.trunc()) => {
                    format!("{}", value.trunc() as i64)
                }
                _ => format!("int({})", code),
            },
            None => "0".to_string(),
        };
        let counter = self.names.helper("count");
        let body = self.loop_body_to_code(block, "DO");
        Generated::Stmt(format!("for {} in range({}):\n{}", counter, times, body))
    }

    fn generate_while(&mut self, block: &BlockInstance) -> Generated {
        let condition = if block.choice("MODE") == Some("UNTIL") {
            let value = self.value_or(block, "BOOL", Order::LogicalNot, Binding::Loose, "False");
            format!("not {}", value)
        } else {
            self.value_or(block, "BOOL", Order::None, Binding::Loose, "False")
        };
        let body = self.loop_body_to_code(block, "DO");
        Generated::Stmt(format!("while {}:\n{}", condition, body))
    }

    /// Counting loop, collapsed to the shortest `range(...)` form
    fn generate_for(&mut self, block: &BlockInstance) -> Generated {
        let variable = self.variable_name(block, "VAR").unwrap_or_else(|| "_".to_string());
        let from = self.value_or(block, "FROM", Order::None, Binding::Loose, "0");
        let to = self.value_or(block, "TO", Order::Additive, Binding::Loose, "0");
        let step = self.value_or(block, "BY", Order::None, Binding::Loose, "1");

        let range = match (from.as_str(), step.as_str()) {
            ("0", "1") => format!("range({})", to),
            (_, "1") => format!("range({}, {})", from, to),
            _ => format!("range({}, {}, {})", from, to, step),
        };
        let body = self.loop_body_to_code(block, "DO");
        Generated::Stmt(format!("for {} in {}:\n{}", variable, range, body))
    }

    fn generate_arithmetic(&mut self, block: &BlockInstance) -> Generated {
        let (operator, order, left, right) = match block.choice("OP") {
            Some("MINUS") => ("-", Order::Additive, Binding::Loose, Binding::Strict),
            Some("MULTIPLY") => ("*", Order::Multiplicative, Binding::Loose, Binding::Strict),
            Some("DIVIDE") => ("/", Order::Multiplicative, Binding::Loose, Binding::Strict),
            // Right-associative: the base binds strictly, the exponent loosely
            Some("POWER") => ("**", Order::Exponentiation, Binding::Strict, Binding::Loose),
            _ => ("+", Order::Additive, Binding::Loose, Binding::Loose),
        };
        let a = self.value_or(block, "A", order, left, "0");
        let b = self.value_or(block, "B", order, right, "0");
        Generated::Expr(format!("{} {} {}", a, operator, b), order)
    }

    fn generate_assignment(&mut self, block: &BlockInstance) -> Generated {
        let variable = self.variable_name(block, "VAR").unwrap_or_else(|| "_".to_string());
        let operator = match block.choice("OP") {
            Some("MINUS") => "-=",
            Some("MULTIPLY") => "*=",
            Some("DIVIDE") => "/=",
            _ => "+=",
        };
        let delta = self.value_or(block, "DELTA", Order::Additive, Binding::Loose, "0");
        Generated::Stmt(format!("{} {} {}\n", variable, operator, delta))
    }

    fn generate_math_single(&mut self, block: &BlockInstance) -> Generated {
        let op = block.choice("OP").unwrap_or("ROOT");
        if op == "NEG" {
            let value = self.value_or(block, "NUM", Order::UnarySign, Binding::Loose, "0");
            // Keep `- -x` from reading as a decrement
            let spacer = if value.starts_with('-') { " " } else { "" };
            return Generated::Expr(format!("-{}{}", spacer, value), Order::UnarySign);
        }

        let value = self.value_or(block, "NUM", Order::None, Binding::Loose, "0");
        let code = match op {
            "ABS" => return Generated::Expr(format!("abs({})", value), Order::FunctionCall),
            "LN" => format!("math.log({})", value),
            "LOG10" => format!("math.log10({})", value),
            "EXP" => format!("math.exp({})", value),
            "POW10" => format!("math.pow(10, {})", value),
            _ => format!("math.sqrt({})", value),
        };
        self.context.add_import("import math");
        Generated::Expr(code, Order::FunctionCall)
    }

    fn generate_constant(&mut self, block: &BlockInstance) -> Generated {
        let (code, order) = match block.choice("CONSTANT") {
            Some("E") => ("math.e", Order::Member),
            Some("GOLDEN_RATIO") => ("(1 + math.sqrt(5)) / 2", Order::Multiplicative),
            Some("SQRT2") => ("math.sqrt(2)", Order::FunctionCall),
            Some("SQRT1_2") => ("math.sqrt(1.0 / 2)", Order::FunctionCall),
            Some("INFINITY") => return Generated::Expr("float('inf')".to_string(), Order::FunctionCall),
            _ => ("math.pi", Order::Member),
        };
        self.context.add_import("import math");
        Generated::Expr(code.to_string(), order)
    }

    fn generate_on_list(&mut self, block: &BlockInstance) -> Generated {
        let list = self.value_or(block, "LIST", Order::None, Binding::Loose, "[]");
        let code = match block.choice("OP") {
            Some("MIN") => format!("min({})", list),
            Some("MAX") => format!("max({})", list),
            Some("AVERAGE") => {
                self.context.add_import("from numbers import Number");
                let mean = self.provide_function("math_mean", |name, indent| {
                    format!(
                        "def {name}(myList):\n\
                         {indent}localList = [e for e in myList if isinstance(e, Number)]\n\
                         {indent}if not localList: return\n\
                         {indent}return float(sum(localList)) / len(localList)\n",
                        name = name,
                        indent = indent
                    )
                });
                format!("{}({})", mean, list)
            }
            Some("RANDOM") => {
                self.context.add_import("import random");
                format!("random.choice({})", list)
            }
            _ => format!("sum({})", list),
        };
        Generated::Expr(code, Order::FunctionCall)
    }

    fn generate_text_join(&mut self, block: &BlockInstance) -> Generated {
        let mut parts: Vec<String> = (0..block.mutation().items)
            .map(|i| self.value_or(block, &format!("ADD{}", i), Order::None, Binding::Loose, "''"))
            .collect();
        match parts.len() {
            0 => Generated::Expr("''".to_string(), Order::Atomic),
            1 => Generated::Expr(format!("str({})", parts.remove(0)), Order::FunctionCall),
            2 => Generated::Expr(
                format!("str({}) + str({})", parts[0], parts[1]),
                Order::Additive,
            ),
            _ => Generated::Expr(
                format!("''.join(map(str, [{}]))", parts.join(", ")),
                Order::FunctionCall,
            ),
        }
    }

    /// Index lookup; only `FROM_START` positions are honoured, 0-based
    fn generate_get_index(&mut self, block: &BlockInstance) -> Generated {
        let list = self.value_or(block, "VALUE", Order::Member, Binding::Loose, "[]");
        if block.choice("WHERE") != Some("FROM_START") {
            return Generated::Expr(format!("{}[0]", list), Order::Member);
        }
        let at = self.value_or(block, "AT", Order::None, Binding::Loose, "0");
        match block.choice("MODE") {
            Some("GET_REMOVE") | Some("REMOVE") => {
                Generated::Expr(format!("{}.pop({})", list, at), Order::FunctionCall)
            }
            _ => Generated::Expr(format!("{}[{}]", list, at), Order::Member),
        }
    }

    fn generate_set_index(&mut self, block: &BlockInstance) -> Generated {
        let list = self.value_or(block, "LIST", Order::Member, Binding::Loose, "list");
        let value = self.value_or(block, "TO", Order::None, Binding::Loose, "None");
        if block.choice("WHERE") != Some("FROM_START") {
            return Generated::Stmt(format!("{}[0] = {}\n", list, value));
        }
        let at = self.value_or(block, "AT", Order::None, Binding::Loose, "0");
        match block.choice("MODE") {
            Some("INSERT") => Generated::Stmt(format!("{}.insert({}, {})\n", list, at, value)),
            _ => Generated::Stmt(format!("{}[{}] = {}\n", list, at, value)),
        }
    }

    fn generate_call(&mut self, block: &BlockInstance) -> Generated {
        let returns = block.kind() == BlockKind::ProceduresCallReturn;
        let name = match self.procedure_name(block, "NAME") {
            Some(name) => name,
            None if returns => return Generated::Expr("None".to_string(), Order::Atomic),
            None => return Generated::Stmt(String::new()),
        };
        let args: Vec<String> = (0..block.mutation().items)
            .map(|i| self.value_or(block, &format!("ARG{}", i), Order::None, Binding::Loose, "None"))
            .collect();
        let call = format!("{}({})", name, args.join(", "));
        if returns {
            Generated::Expr(call, Order::FunctionCall)
        } else {
            Generated::Stmt(format!("{}\n", call))
        }
    }
}

/// Python literal for a number
pub fn format_number(value: f64) -> (String, Order) {
    if value.is_nan() {
        return ("float('nan')".to_string(), Order::FunctionCall);
    }
    if value.is_infinite() {
        return if value > 0.0 {
            ("float('inf')".to_string(), Order::FunctionCall)
        } else {
            ("-float('inf')".to_string(), Order::UnarySign)
        };
    }
    let code = if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    };
    let order = if code.starts_with('-') {
        Order::UnarySign
    } else {
        Order::Atomic
    };
    (code, order)
}

/// Python string literal, preferring single quotes
pub fn quote(text: &str) -> String {
    let mut escaped = text
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    let mut delimiter = '\'';
    if escaped.contains('\'') {
        if escaped.contains('"') {
            escaped = escaped.replace('\'', "\\'");
        } else {
            delimiter = '"';
        }
    }
    format!("{}{}{}", delimiter, escaped, delimiter)
}

fn comment(text: &str) -> String {
    if text.trim().is_empty() {
        return "#\n".to_string();
    }
    let mut code = String::new();
    for line in text.lines() {
        code.push_str(format!("# {}", line).trim_end());
        code.push('\n');
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), ("5".to_string(), Order::Atomic));
        assert_eq!(format_number(2.5), ("2.5".to_string(), Order::Atomic));
        assert_eq!(format_number(-3.0), ("-3".to_string(), Order::UnarySign));
        assert_eq!(format_number(-0.0), ("0".to_string(), Order::Atomic));
        assert_eq!(format_number(f64::INFINITY).0, "float('inf')");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("hello"), "'hello'");
        assert_eq!(quote("it's"), "\"it's\"");
        assert_eq!(quote("say \"it's\""), "'say \"it\\'s\"'");
        assert_eq!(quote("a\nb"), "'a\\nb'");
        assert_eq!(quote("C:\\dir"), "'C:\\\\dir'");
    }

    #[test]
    fn test_comment_lines() {
        assert_eq!(comment("note"), "# note\n");
        assert_eq!(comment("one\ntwo"), "# one\n# two\n");
        assert_eq!(comment(""), "#\n");
    }
}
