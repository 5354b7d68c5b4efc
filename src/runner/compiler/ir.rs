//! Expression IR.
//!
//! A closed expression-tree algebra produced by lowering and consumed once by
//! the code generator. Every node yields a value; statement-like nodes yield
//! `undefined` unless noted. Variables are numbered per function; captured
//! variables are only marked here, the generator decides where they live.

use std::sync::Arc;

pub type VarId = u32;
pub type LabelId = u32;

/// Where a variable lives from the point of view of one function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    /// One of the function's own variables.
    Local(VarId),
    /// The n-th cell captured from the enclosing function.
    Env(u32),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Script,
    Normal,
    Arrow,
    Method,
    Generator,
    Async,
    AsyncArrow,
    ClassConstructor,
    DerivedConstructor,
}

impl FunctionKind {
    pub fn is_constructor(&self) -> bool {
        matches!(
            self,
            FunctionKind::Normal | FunctionKind::ClassConstructor | FunctionKind::DerivedConstructor
        )
    }

    pub fn is_class_constructor(&self) -> bool {
        matches!(
            self,
            FunctionKind::ClassConstructor | FunctionKind::DerivedConstructor
        )
    }

    pub fn is_derived_constructor(&self) -> bool {
        matches!(self, FunctionKind::DerivedConstructor)
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, FunctionKind::Generator)
    }

    pub fn is_async(&self) -> bool {
        matches!(self, FunctionKind::Async | FunctionKind::AsyncArrow)
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self, FunctionKind::Arrow | FunctionKind::AsyncArrow)
    }

    /// Generators and async functions run as resumable state machines.
    pub fn is_resumable(&self) -> bool {
        self.is_generator() || self.is_async()
    }
}

#[derive(Clone, Debug)]
pub struct VarInfo {
    pub name: String,
    pub captured: bool,
}

#[derive(Debug)]
pub struct IrFunction {
    pub name: String,
    pub kind: FunctionKind,
    /// Parameters before the first default or rest parameter.
    pub arity: u32,
    pub vars: Vec<VarInfo>,
    /// Bindings in the enclosing function that this function captures, in `Env` order.
    pub captures: Vec<Binding>,
    pub body: Expr,
    /// Binding through which the function refers to itself, used for self tail calls.
    pub self_binding: Option<Binding>,
    pub source_start: u32,
    pub source_end: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Arc<str>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    /// `ToNumeric`, used by update expressions.
    ToNumeric,
    /// `ToString`, used by template literals.
    ToStr,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
    InstanceOf,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 8] = [
        UnaryOp::Minus,
        UnaryOp::Plus,
        UnaryOp::Not,
        UnaryOp::BitNot,
        UnaryOp::TypeOf,
        UnaryOp::Void,
        UnaryOp::ToNumeric,
        UnaryOp::ToStr,
    ];
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 22] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Exp,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::UShr,
        BinaryOp::BitAnd,
        BinaryOp::BitOr,
        BinaryOp::BitXor,
        BinaryOp::Eq,
        BinaryOp::NotEq,
        BinaryOp::StrictEq,
        BinaryOp::StrictNotEq,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::LtEq,
        BinaryOp::GtEq,
        BinaryOp::In,
        BinaryOp::InstanceOf,
    ];
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug)]
pub enum MemberKey {
    Named(Arc<str>),
    Computed(Box<Expr>),
}

#[derive(Debug)]
pub enum Callee {
    /// `f(...)`: `this` is undefined.
    Plain(Box<Expr>),
    /// `o.m(...)`: `o` is evaluated once and becomes `this`.
    Member { object: Box<Expr>, key: MemberKey },
    /// `super.m(...)`: looked up on `home`, called with `this`.
    Super {
        home: Box<Expr>,
        key: MemberKey,
        this: Box<Expr>,
    },
}

#[derive(Debug)]
pub enum Args {
    List(Vec<Expr>),
    /// An expression producing an array of the spread-expanded arguments.
    Spread(Box<Expr>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

#[derive(Debug)]
pub enum PropertyInit {
    Value { key: MemberKey, value: Expr },
    Method {
        key: MemberKey,
        function: Expr,
        kind: MethodKind,
    },
    Spread(Expr),
}

#[derive(Debug)]
pub enum ArrayElement {
    Hole,
    Item(Expr),
    Spread(Expr),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    TypeError,
    ReferenceError,
    SyntaxError,
}

#[derive(Debug)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Expr,
}

#[derive(Debug)]
pub struct CatchClause {
    pub binding: Option<Binding>,
    pub body: Expr,
}

#[derive(Debug)]
pub enum Expr {
    Constant(Literal),
    Var(Binding),
    Assign(Binding, Box<Expr>),
    This,
    NewTarget,
    /// The n-th invocation argument, `undefined` when absent.
    Argument(u32),
    /// Array of the invocation arguments from index n on.
    RestArguments(u32),
    Arguments,

    GlobalGet(Arc<str>),
    GlobalTypeOf(Arc<str>),
    GlobalSet(Arc<str>, Box<Expr>),
    /// Defines a global property if absent (hoisted `var`), or overwrites it (function declarations).
    GlobalDeclare {
        name: Arc<str>,
        value: Option<Box<Expr>>,
    },

    Member {
        object: Box<Expr>,
        key: MemberKey,
    },
    SetMember {
        object: Box<Expr>,
        key: MemberKey,
        value: Box<Expr>,
    },
    DeleteMember {
        object: Box<Expr>,
        key: MemberKey,
    },
    /// `super.key` read with an explicit receiver.
    SuperMember {
        home: Box<Expr>,
        key: MemberKey,
        this: Box<Expr>,
    },

    Call {
        callee: Callee,
        args: Args,
    },
    New {
        callee: Box<Expr>,
        args: Args,
    },
    SuperCall {
        constructor: Box<Expr>,
        new_target: Box<Expr>,
        args: Args,
    },

    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },

    /// Evaluates in order; the value is the last expression's.
    Block(Vec<Expr>),
    /// Block whose variables get fresh storage on every entry.
    Scope {
        vars: Vec<VarId>,
        body: Box<Expr>,
    },
    /// Gives the listed captured variables fresh cells holding their current values.
    RenewCells(Vec<VarId>),
    /// Repeats forever; left only through `Goto`, `Return` or a throw.
    Loop(Box<Expr>),
    /// `Goto(label)` inside `body` continues after the label.
    Label(LabelId, Box<Expr>),
    Goto(LabelId),
    Return(Box<Expr>),
    Throw(Box<Expr>),
    ThrowError(ErrorKind, Arc<str>),
    Try {
        block: Box<Expr>,
        catch: Option<Box<CatchClause>>,
        finally: Option<Box<Expr>>,
    },
    /// Tests run in order; a match jumps into its body and bodies fall through.
    Switch {
        discriminant: Box<Expr>,
        cases: Vec<SwitchCase>,
    },

    Yield(Box<Expr>),
    Await(Box<Expr>),

    Function(Box<IrFunction>),
    Object(Vec<PropertyInit>),
    Array(Vec<ArrayElement>),
    TemplateObject {
        cooked: Vec<Option<Arc<str>>>,
        raw: Vec<Arc<str>>,
    },

    GetIterator(Box<Expr>),
    /// Advances `iter`; stores the produced value in `value` and yields true, or yields false when done.
    IteratorStep {
        iter: Binding,
        value: Binding,
    },
    /// Next value, or `undefined` once the iterator is exhausted.
    IteratorValue(Binding),
    IteratorRest(Binding),
    IteratorClose(Binding),
    ForInKeys(Box<Expr>),
    CopyDataProperties {
        target: Box<Expr>,
        source: Box<Expr>,
        excluded: Vec<Expr>,
    },
    DefineMethod {
        target: Box<Expr>,
        key: MemberKey,
        function: Box<Expr>,
        kind: MethodKind,
    },
    /// Wires `constructor` to `parent` (or to the base prototypes) and yields the constructor.
    CreateClass {
        constructor: Box<Expr>,
        parent: Option<Box<Expr>>,
    },
    /// Result of a derived constructor's `return value`: the value if it is an object, else `this`.
    DerivedResult {
        value: Box<Expr>,
        this: Box<Expr>,
    },
}

impl Expr {
    pub fn undefined() -> Expr {
        Expr::Constant(Literal::Undefined)
    }

    pub fn string(s: &str) -> Expr {
        Expr::Constant(Literal::String(Arc::from(s)))
    }

    pub fn number(n: f64) -> Expr {
        Expr::Constant(Literal::Number(n))
    }

    pub fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }

    pub fn is_pure(&self) -> bool {
        matches!(self, Expr::Constant(_) | Expr::Var(_))
    }
}
