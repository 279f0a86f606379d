//! # Block Catalog
//!
//! Static registry of every block kind the editor can place. Each kind knows
//! its Blockly type tag, how it connects (statement, expression or top-level),
//! the value type it produces, and the slots it exposes.
//!
//! The catalog is plain data. Generation rules live next to the Python code
//! generator as an exhaustive `match` over [`BlockKind`], so adding a kind
//! without a rule is a compile error.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How a block plugs into its surroundings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connection {
    /// Chains through `next` links and statement bodies
    Statement,
    /// Fills an input slot and yields a value
    Expression,
    /// Always a root (procedure definitions)
    TopLevel,
}

/// Value-kind constraint on inputs and outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Array,
}

/// Editable literal slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldShape {
    /// Free text with its default
    Text(&'static str),
    /// Number with its default
    Number(f64),
    /// One of a fixed set of options; the first one is the default
    Dropdown(&'static [&'static str]),
    /// Reference to a variable by stable id
    Variable,
    /// Reference to a procedure by stable id
    Procedure,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotKind {
    Field(FieldShape),
    /// Nested expression, optionally type-checked
    Input(Option<ValueType>),
    /// Nested statement chain
    Body,
}

impl SlotKind {
    pub fn describe(&self) -> &'static str {
        match self {
            SlotKind::Field(_) => "field",
            SlotKind::Input(_) => "value input",
            SlotKind::Body => "statement body",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotShape {
    pub name: Cow<'static, str>,
    pub kind: SlotKind,
}

const fn field(name: &'static str, shape: FieldShape) -> SlotShape {
    SlotShape {
        name: Cow::Borrowed(name),
        kind: SlotKind::Field(shape),
    }
}

const fn input(name: &'static str, check: Option<ValueType>) -> SlotShape {
    SlotShape {
        name: Cow::Borrowed(name),
        kind: SlotKind::Input(check),
    }
}

const fn body(name: &'static str) -> SlotShape {
    SlotShape {
        name: Cow::Borrowed(name),
        kind: SlotKind::Body,
    }
}

/// Promotes a slot list to a `'static` constant
macro_rules! slots {
    ($($slot:expr),* $(,)?) => {{
        const SLOTS: &[SlotShape] = &[$($slot),*];
        SLOTS
    }};
}

const NUMBER: Option<ValueType> = Some(ValueType::Number);
const BOOLEAN: Option<ValueType> = Some(ValueType::Boolean);
const ARRAY: Option<ValueType> = Some(ValueType::Array);
const ANY: Option<ValueType> = None;

const WHERE_OPTIONS: &[&str] = &["FROM_START", "FROM_END", "FIRST", "LAST", "RANDOM"];

/// Most dynamic slots (items, else-if branches, arguments) one block may grow
pub const MAX_ITEMS: usize = 1024;

/// Per-instance shape for kinds with a variable number of slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutation {
    /// Item count (`ADDn`), argument count (`ARGn`) or else-if count (`IFn`/`DOn`, n >= 1)
    pub items: usize,
    /// `controls_if` only: whether an `ELSE` body exists
    pub has_else: bool,
}

/// Which family of dynamic slots a kind grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variadic {
    /// `ADD0..ADDn`, resized by the editor
    Items,
    /// `ARG0..ARGn`, follows the bound procedure's parameters
    Arguments,
    /// `IF1/DO1..`, plus an optional `ELSE`
    Branches,
}

/// Every registered block kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    // Logic
    ControlsIf,
    LogicCompare,
    LogicOperation,
    LogicNegate,
    LogicBoolean,
    LogicNull,
    LogicTernary,
    // Loops
    ControlsRepeatExt,
    ControlsWhileUntil,
    ControlsFor,
    ControlsForEach,
    ControlsFlowStatements,
    // Math
    MathNumber,
    MathArithmetic,
    MathAssignment,
    MathSingle,
    MathConstant,
    MathModulo,
    MathRound,
    MathRandomInt,
    MathRandomFloat,
    MathOnList,
    // Text
    CommentBlock,
    Text,
    TextJoin,
    TextPrint,
    TextLength,
    // Lists
    ListsCreateWith,
    ListsLength,
    ListsIsEmpty,
    ListsGetIndex,
    ListsSetIndex,
    // Variables
    VariablesGet,
    VariablesSet,
    // Functions
    ProceduresDefNoReturn,
    ProceduresDefReturn,
    ProceduresCallNoReturn,
    ProceduresCallReturn,
}

impl BlockKind {
    pub const ALL: &'static [BlockKind] = &[
        BlockKind::ControlsIf,
        BlockKind::LogicCompare,
        BlockKind::LogicOperation,
        BlockKind::LogicNegate,
        BlockKind::LogicBoolean,
        BlockKind::LogicNull,
        BlockKind::LogicTernary,
        BlockKind::ControlsRepeatExt,
        BlockKind::ControlsWhileUntil,
        BlockKind::ControlsFor,
        BlockKind::ControlsForEach,
        BlockKind::ControlsFlowStatements,
        BlockKind::MathNumber,
        BlockKind::MathArithmetic,
        BlockKind::MathAssignment,
        BlockKind::MathSingle,
        BlockKind::MathConstant,
        BlockKind::MathModulo,
        BlockKind::MathRound,
        BlockKind::MathRandomInt,
        BlockKind::MathRandomFloat,
        BlockKind::MathOnList,
        BlockKind::CommentBlock,
        BlockKind::Text,
        BlockKind::TextJoin,
        BlockKind::TextPrint,
        BlockKind::TextLength,
        BlockKind::ListsCreateWith,
        BlockKind::ListsLength,
        BlockKind::ListsIsEmpty,
        BlockKind::ListsGetIndex,
        BlockKind::ListsSetIndex,
        BlockKind::VariablesGet,
        BlockKind::VariablesSet,
        BlockKind::ProceduresDefNoReturn,
        BlockKind::ProceduresDefReturn,
        BlockKind::ProceduresCallNoReturn,
        BlockKind::ProceduresCallReturn,
    ];

    /// Blockly type tag, used in snapshots
    pub fn id(&self) -> &'static str {
        match self {
            BlockKind::ControlsIf => "controls_if",
            BlockKind::LogicCompare => "logic_compare",
            BlockKind::LogicOperation => "logic_operation",
            BlockKind::LogicNegate => "logic_negate",
            BlockKind::LogicBoolean => "logic_boolean",
            BlockKind::LogicNull => "logic_null",
            BlockKind::LogicTernary => "logic_ternary",
            BlockKind::ControlsRepeatExt => "controls_repeat_ext",
            BlockKind::ControlsWhileUntil => "controls_whileUntil",
            BlockKind::ControlsFor => "controls_for",
            BlockKind::ControlsForEach => "controls_forEach",
            BlockKind::ControlsFlowStatements => "controls_flow_statements",
            BlockKind::MathNumber => "math_number",
            BlockKind::MathArithmetic => "math_arithmetic",
            BlockKind::MathAssignment => "math_assignment",
            BlockKind::MathSingle => "math_single",
            BlockKind::MathConstant => "math_constant",
            BlockKind::MathModulo => "math_modulo",
            BlockKind::MathRound => "math_round",
            BlockKind::MathRandomInt => "math_random_int",
            BlockKind::MathRandomFloat => "math_random_float",
            BlockKind::MathOnList => "math_on_list",
            BlockKind::CommentBlock => "comment_block",
            BlockKind::Text => "text",
            BlockKind::TextJoin => "text_join",
            BlockKind::TextPrint => "text_print",
            BlockKind::TextLength => "text_length",
            BlockKind::ListsCreateWith => "lists_create_with",
            BlockKind::ListsLength => "lists_length",
            BlockKind::ListsIsEmpty => "lists_isEmpty",
            BlockKind::ListsGetIndex => "lists_getIndex",
            BlockKind::ListsSetIndex => "lists_setIndex",
            BlockKind::VariablesGet => "variables_get",
            BlockKind::VariablesSet => "variables_set",
            BlockKind::ProceduresDefNoReturn => "procedures_defnoreturn",
            BlockKind::ProceduresDefReturn => "procedures_defreturn",
            BlockKind::ProceduresCallNoReturn => "procedures_callnoreturn",
            BlockKind::ProceduresCallReturn => "procedures_callreturn",
        }
    }

    pub fn from_id(id: &str) -> Option<BlockKind> {
        BlockKind::ALL.iter().copied().find(|kind| kind.id() == id)
    }

    pub fn connection(&self) -> Connection {
        use BlockKind::*;
        match self {
            ProceduresDefNoReturn | ProceduresDefReturn => Connection::TopLevel,
            ControlsIf | ControlsRepeatExt | ControlsWhileUntil | ControlsFor | ControlsForEach
            | ControlsFlowStatements | MathAssignment | CommentBlock | TextPrint
            | ListsSetIndex | VariablesSet | ProceduresCallNoReturn => Connection::Statement,
            LogicCompare | LogicOperation | LogicNegate | LogicBoolean | LogicNull
            | LogicTernary | MathNumber | MathArithmetic | MathSingle | MathConstant
            | MathModulo | MathRound | MathRandomInt | MathRandomFloat | MathOnList | Text
            | TextJoin | TextLength | ListsCreateWith | ListsLength | ListsIsEmpty
            | ListsGetIndex | VariablesGet | ProceduresCallReturn => Connection::Expression,
        }
    }

    /// Declared output type of an expression kind; `None` means unchecked
    pub fn output(&self) -> Option<ValueType> {
        use BlockKind::*;
        match self {
            LogicCompare | LogicOperation | LogicNegate | LogicBoolean | ListsIsEmpty => {
                Some(ValueType::Boolean)
            }
            MathNumber | MathArithmetic | MathSingle | MathConstant | MathModulo | MathRound
            | MathRandomInt | MathRandomFloat | MathOnList | TextLength | ListsLength => {
                Some(ValueType::Number)
            }
            Text | TextJoin => Some(ValueType::String),
            ListsCreateWith => Some(ValueType::Array),
            _ => None,
        }
    }

    pub fn is_definition(&self) -> bool {
        matches!(self, BlockKind::ProceduresDefNoReturn | BlockKind::ProceduresDefReturn)
    }

    pub fn is_call(&self) -> bool {
        matches!(self, BlockKind::ProceduresCallNoReturn | BlockKind::ProceduresCallReturn)
    }

    pub fn variadic(&self) -> Option<Variadic> {
        match self {
            BlockKind::ControlsIf => Some(Variadic::Branches),
            BlockKind::TextJoin | BlockKind::ListsCreateWith => Some(Variadic::Items),
            BlockKind::ProceduresCallNoReturn | BlockKind::ProceduresCallReturn => {
                Some(Variadic::Arguments)
            }
            _ => None,
        }
    }

    /// Mutation a freshly created instance starts with
    pub fn default_mutation(&self) -> Mutation {
        match self {
            BlockKind::ListsCreateWith => Mutation { items: 3, has_else: false },
            BlockKind::TextJoin => Mutation { items: 2, has_else: false },
            _ => Mutation::default(),
        }
    }

    /// Slots that exist regardless of the instance's mutation
    pub fn fixed_slots(&self) -> &'static [SlotShape] {
        use BlockKind::*;
        use FieldShape as F;
        match self {
            ControlsIf | LogicNull | MathRandomFloat | TextJoin | ListsCreateWith => &[],
            LogicCompare => slots![
                field("OP", F::Dropdown(&["EQ", "NEQ", "LT", "LTE", "GT", "GTE"])),
                input("A", ANY),
                input("B", ANY),
            ],
            LogicOperation => slots![
                field("OP", F::Dropdown(&["AND", "OR"])),
                input("A", BOOLEAN),
                input("B", BOOLEAN),
            ],
            LogicNegate => slots![input("BOOL", BOOLEAN)],
            LogicBoolean => slots![field("BOOL", F::Dropdown(&["TRUE", "FALSE"]))],
            LogicTernary => slots![input("IF", BOOLEAN), input("THEN", ANY), input("ELSE", ANY)],
            ControlsRepeatExt => slots![input("TIMES", NUMBER), body("DO")],
            ControlsWhileUntil => slots![
                field("MODE", F::Dropdown(&["WHILE", "UNTIL"])),
                input("BOOL", BOOLEAN),
                body("DO"),
            ],
            ControlsFor => slots![
                field("VAR", F::Variable),
                input("FROM", NUMBER),
                input("TO", NUMBER),
                input("BY", NUMBER),
                body("DO"),
            ],
            ControlsForEach => slots![field("VAR", F::Variable), input("LIST", ARRAY), body("DO")],
            ControlsFlowStatements => slots![field("FLOW", F::Dropdown(&["BREAK", "CONTINUE"]))],
            MathNumber => slots![field("NUM", F::Number(0.0))],
            MathArithmetic => slots![
                field("OP", F::Dropdown(&["ADD", "MINUS", "MULTIPLY", "DIVIDE", "POWER"])),
                input("A", NUMBER),
                input("B", NUMBER),
            ],
            MathAssignment => slots![
                field("VAR", F::Variable),
                field("OP", F::Dropdown(&["ADD", "MINUS", "MULTIPLY", "DIVIDE"])),
                input("DELTA", NUMBER),
            ],
            MathSingle => slots![
                field("OP", F::Dropdown(&["ROOT", "ABS", "NEG", "LN", "LOG10", "EXP", "POW10"])),
                input("NUM", NUMBER),
            ],
            MathConstant => slots![field(
                "CONSTANT",
                F::Dropdown(&["PI", "E", "GOLDEN_RATIO", "SQRT2", "SQRT1_2", "INFINITY"]),
            )],
            MathModulo => slots![input("DIVIDEND", NUMBER), input("DIVISOR", NUMBER)],
            MathRound => slots![
                field("OP", F::Dropdown(&["ROUND", "ROUNDUP", "ROUNDDOWN"])),
                input("NUM", NUMBER),
            ],
            MathRandomInt => slots![input("FROM", NUMBER), input("TO", NUMBER)],
            MathOnList => slots![
                field("OP", F::Dropdown(&["SUM", "MIN", "MAX", "AVERAGE", "RANDOM"])),
                input("LIST", ARRAY),
            ],
            CommentBlock => slots![field("TEXT", F::Text("write note here"))],
            Text => slots![field("TEXT", F::Text(""))],
            TextPrint => slots![input("TEXT", ANY)],
            TextLength | ListsLength | ListsIsEmpty => slots![input("VALUE", ANY)],
            ListsGetIndex => slots![
                field("MODE", F::Dropdown(&["GET", "GET_REMOVE", "REMOVE"])),
                field("WHERE", F::Dropdown(WHERE_OPTIONS)),
                input("VALUE", ARRAY),
                input("AT", NUMBER),
            ],
            ListsSetIndex => slots![
                field("MODE", F::Dropdown(&["SET", "INSERT"])),
                field("WHERE", F::Dropdown(WHERE_OPTIONS)),
                input("LIST", ARRAY),
                input("AT", NUMBER),
                input("TO", ANY),
            ],
            VariablesGet => slots![field("VAR", F::Variable)],
            VariablesSet => slots![field("VAR", F::Variable), input("VALUE", ANY)],
            ProceduresDefNoReturn => slots![field("NAME", F::Procedure), body("STACK")],
            ProceduresDefReturn => slots![
                field("NAME", F::Procedure),
                body("STACK"),
                input("RETURN", ANY),
            ],
            ProceduresCallNoReturn | ProceduresCallReturn => {
                slots![field("NAME", F::Procedure)]
            }
        }
    }

    /// Full ordered slot list for an instance with the given mutation
    pub fn slots(&self, mutation: &Mutation) -> Vec<SlotShape> {
        let mut slots = self.fixed_slots().to_vec();
        match self.variadic() {
            None => {}
            Some(Variadic::Items) => {
                for i in 0..mutation.items {
                    slots.push(dynamic(format!("ADD{}", i), SlotKind::Input(ANY)));
                }
            }
            Some(Variadic::Arguments) => {
                for i in 0..mutation.items {
                    slots.push(dynamic(format!("ARG{}", i), SlotKind::Input(ANY)));
                }
            }
            Some(Variadic::Branches) => {
                for i in 0..=mutation.items {
                    slots.push(dynamic(format!("IF{}", i), SlotKind::Input(BOOLEAN)));
                    slots.push(dynamic(format!("DO{}", i), SlotKind::Body));
                }
                if mutation.has_else {
                    slots.push(body("ELSE"));
                }
            }
        }
        slots
    }

    pub fn slot(&self, mutation: &Mutation, name: &str) -> Option<SlotKind> {
        self.slots(mutation)
            .into_iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.kind)
    }
}

fn dynamic(name: String, kind: SlotKind) -> SlotShape {
    SlotShape {
        name: Cow::Owned(name),
        kind,
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
