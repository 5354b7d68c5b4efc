//! Arena-allocated syntax tree.
//!
//! Nodes live in per-kind pools owned by [`Ast`] and refer to each other by
//! typed index. Truncating a pool back to an earlier length discards every
//! node allocated since, which is how speculative parses are abandoned.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Meta {
    pub start_index: usize,
    pub end_index: usize,
    pub line: u32,
    pub column: u32,
}

/// Index of a node in its pool.
pub struct NodeId<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> NodeId<T> {
    fn new(index: usize) -> Self {
        NodeId {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl<T> Copy for NodeId<T> {}

impl<T> Clone for NodeId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for NodeId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for NodeId<T> {}

impl<T> fmt::Debug for NodeId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

pub struct Pool<T> {
    nodes: Vec<T>,
}

impl<T> Pool<T> {
    fn new() -> Self {
        Pool { nodes: Vec::new() }
    }

    fn alloc(&mut self, node: T) -> NodeId<T> {
        self.nodes.push(node);
        NodeId::new(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }
}

pub type ExprId = NodeId<ExpressionNode>;
pub type StmtId = NodeId<StatementNode>;
pub type PatId = NodeId<PatternNode>;
pub type FuncId = NodeId<FunctionData>;

#[derive(Debug)]
pub struct ExpressionNode {
    pub meta: Meta,
    pub kind: ExpressionType,
}

#[derive(Debug)]
pub struct StatementNode {
    pub meta: Meta,
    pub kind: StatementType,
}

#[derive(Debug)]
pub struct PatternNode {
    pub meta: Meta,
    pub kind: PatternType,
}

/// All nodes of one parse.
pub struct Ast {
    expressions: Pool<ExpressionNode>,
    statements: Pool<StatementNode>,
    patterns: Pool<PatternNode>,
    functions: Pool<FunctionData>,
}

/// Pool sizes at some point of a parse.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AstMark {
    expressions: usize,
    statements: usize,
    patterns: usize,
    functions: usize,
}

impl Ast {
    pub fn new() -> Self {
        Ast {
            expressions: Pool::new(),
            statements: Pool::new(),
            patterns: Pool::new(),
            functions: Pool::new(),
        }
    }

    pub fn add_expression(&mut self, meta: Meta, kind: ExpressionType) -> ExprId {
        self.expressions.alloc(ExpressionNode { meta, kind })
    }

    pub fn add_statement(&mut self, meta: Meta, kind: StatementType) -> StmtId {
        self.statements.alloc(StatementNode { meta, kind })
    }

    pub fn add_pattern(&mut self, meta: Meta, kind: PatternType) -> PatId {
        self.patterns.alloc(PatternNode { meta, kind })
    }

    pub fn add_function(&mut self, function: FunctionData) -> FuncId {
        self.functions.alloc(function)
    }

    pub fn expression(&self, id: ExprId) -> &ExpressionNode {
        &self.expressions.nodes[id.index()]
    }

    pub fn statement(&self, id: StmtId) -> &StatementNode {
        &self.statements.nodes[id.index()]
    }

    pub fn pattern(&self, id: PatId) -> &PatternNode {
        &self.patterns.nodes[id.index()]
    }

    pub fn function(&self, id: FuncId) -> &FunctionData {
        &self.functions.nodes[id.index()]
    }

    pub(crate) fn function_mut(&mut self, id: FuncId) -> &mut FunctionData {
        &mut self.functions.nodes[id.index()]
    }

    pub fn mark(&self) -> AstMark {
        AstMark {
            expressions: self.expressions.len(),
            statements: self.statements.len(),
            patterns: self.patterns.len(),
            functions: self.functions.len(),
        }
    }

    /// Drops every node allocated after `mark`.
    pub fn reset(&mut self, mark: AstMark) {
        self.expressions.truncate(mark.expressions);
        self.statements.truncate(mark.statements);
        self.patterns.truncate(mark.patterns);
        self.functions.truncate(mark.functions);
    }

    pub fn node_count(&self) -> usize {
        self.expressions.len() + self.statements.len() + self.patterns.len() + self.functions.len()
    }

    /// Names bound by a pattern, in source order.
    pub fn bound_names(&self, pattern: PatId, out: &mut Vec<Arc<str>>) {
        match &self.pattern(pattern).kind {
            PatternType::Identifier(name) => out.push(name.clone()),
            PatternType::Member(_) => {}
            PatternType::ObjectPattern { properties, rest } => {
                for property in properties {
                    self.bound_names(property.value, out);
                }
                if let Some(rest) = rest {
                    self.bound_names(*rest, out);
                }
            }
            PatternType::ArrayPattern { elements, rest } => {
                for element in elements.iter().flatten() {
                    self.bound_names(*element, out);
                }
                if let Some(rest) = rest {
                    self.bound_names(*rest, out);
                }
            }
            PatternType::AssignmentPattern { target, .. } => self.bound_names(*target, out),
        }
    }
}

impl Default for Ast {
    fn default() -> Self {
        Ast::new()
    }
}

impl fmt::Debug for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ast")
            .field("expressions", &self.expressions.len())
            .field("statements", &self.statements.len())
            .field("patterns", &self.patterns.len())
            .field("functions", &self.functions.len())
            .finish()
    }
}

/// A parsed script. The top level is itself a function of form [`FunctionForm::Script`].
#[derive(Debug)]
pub struct ProgramData {
    pub ast: Ast,
    pub script: FuncId,
}

impl ProgramData {
    pub fn body(&self) -> &[StmtId] {
        match &self.ast.function(self.script).body {
            FunctionBody::Block(statements) => statements,
            FunctionBody::Expression(_) => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LiteralType {
    StringLiteral(Arc<str>),
    BooleanLiteral(bool),
    NullLiteral,
    NumberLiteral(f64),
    RegExpLiteral { pattern: Arc<str>, flags: Arc<str> },
}

#[derive(Clone, Debug)]
pub enum PropertyName {
    /// Identifier, string and numeric keys; numbers are held in canonical string form.
    Named(Arc<str>),
    Computed(ExprId),
}

impl PropertyName {
    pub fn as_named(&self) -> Option<&str> {
        match self {
            PropertyName::Named(name) => Some(name),
            PropertyName::Computed(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum ExpressionOrSpreadElement {
    Expression(ExprId),
    SpreadElement(ExprId),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

#[derive(Clone, Debug)]
pub enum PropertyData {
    Value {
        key: PropertyName,
        value: ExprId,
        shorthand: bool,
    },
    Method {
        key: PropertyName,
        function: FuncId,
        kind: PropertyKind,
    },
    Spread(ExprId),
}

#[derive(Clone, Debug)]
pub struct TemplateElementData {
    pub cooked: Option<Arc<str>>,
    pub raw: Arc<str>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    LogicalNot,
    BitwiseNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateOperator {
    PlusPlus,
    MinusMinus,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    LooselyEqual,
    LooselyUnequal,
    StrictlyEqual,
    StrictlyUnequal,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    BitwiseLeftShift,
    BitwiseRightShift,
    BitwiseUnsignedRightShift,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    In,
    InstanceOf,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOperator {
    Or,
    And,
    NullishCoalescing,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignmentOperator {
    Equals,
    Binary(BinaryOperator),
    Logical(LogicalOperator),
}

#[derive(Clone, Debug)]
pub enum MemberProperty {
    Named(Arc<str>),
    Computed(ExprId),
}

#[derive(Debug)]
pub enum ExpressionType {
    Literal(LiteralType),
    Identifier(Arc<str>),
    ThisExpression,
    ArrayExpression(Vec<Option<ExpressionOrSpreadElement>>),
    ObjectExpression(Vec<PropertyData>),
    FunctionExpression(FuncId),
    ClassExpression(Box<ClassData>),
    UnaryExpression {
        operator: UnaryOperator,
        argument: ExprId,
    },
    UpdateExpression {
        operator: UpdateOperator,
        argument: ExprId,
        prefix: bool,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: ExprId,
        right: ExprId,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: ExprId,
        right: ExprId,
    },
    AssignmentExpression {
        operator: AssignmentOperator,
        left: PatId,
        right: ExprId,
    },
    ConditionalExpression {
        test: ExprId,
        consequent: ExprId,
        alternate: ExprId,
    },
    /// `optional` marks `f?.()`.
    CallExpression {
        callee: ExprId,
        arguments: Vec<ExpressionOrSpreadElement>,
        optional: bool,
    },
    NewExpression {
        callee: ExprId,
        arguments: Vec<ExpressionOrSpreadElement>,
    },
    /// `optional` marks `o?.p`.
    MemberExpression {
        object: ExprId,
        property: MemberProperty,
        optional: bool,
    },
    /// The extent of an optional chain: a short circuit anywhere inside yields `undefined` here.
    OptionalChain(ExprId),
    SuperMember(MemberProperty),
    SuperCall(Vec<ExpressionOrSpreadElement>),
    SequenceExpression(Vec<ExprId>),
    YieldExpression {
        argument: Option<ExprId>,
        delegate: bool,
    },
    AwaitExpression(ExprId),
    TemplateLiteral {
        quasis: Vec<TemplateElementData>,
        expressions: Vec<ExprId>,
    },
    TaggedTemplateExpression {
        tag: ExprId,
        quasis: Vec<TemplateElementData>,
        expressions: Vec<ExprId>,
    },
    NewTarget,
}

#[derive(Clone, Debug)]
pub struct AssignmentPropertyData {
    pub key: PropertyName,
    /// Binding target, possibly an [`PatternType::AssignmentPattern`] carrying a default.
    pub value: PatId,
}

#[derive(Debug)]
pub enum PatternType {
    Identifier(Arc<str>),
    /// A member expression target; only legal in assignments.
    Member(ExprId),
    ObjectPattern {
        properties: Vec<AssignmentPropertyData>,
        rest: Option<PatId>,
    },
    ArrayPattern {
        elements: Vec<Option<PatId>>,
        rest: Option<PatId>,
    },
    AssignmentPattern {
        target: PatId,
        default: ExprId,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VariableDeclarationKind {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug)]
pub struct VariableDeclaratorData {
    pub meta: Meta,
    pub id: PatId,
    pub init: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub struct VariableDeclarationData {
    pub kind: VariableDeclarationKind,
    pub declarations: Vec<VariableDeclaratorData>,
}

#[derive(Clone, Debug)]
pub enum VariableDeclarationOrExpression {
    VariableDeclaration(VariableDeclarationData),
    Expression(ExprId),
}

#[derive(Clone, Debug)]
pub enum VariableDeclarationOrPattern {
    VariableDeclaration(VariableDeclarationKind, PatId),
    Pattern(PatId),
}

#[derive(Debug)]
pub struct SwitchCaseData {
    pub meta: Meta,
    pub test: Option<ExprId>,
    pub consequent: Vec<StmtId>,
}

#[derive(Debug)]
pub struct CatchClauseData {
    pub param: Option<PatId>,
    pub body: Vec<StmtId>,
}

#[derive(Debug)]
pub struct ForIteratorData {
    pub left: VariableDeclarationOrPattern,
    pub right: ExprId,
    pub body: StmtId,
}

#[derive(Debug)]
pub enum StatementType {
    ExpressionStatement(ExprId),
    BlockStatement(Vec<StmtId>),
    EmptyStatement,
    DebuggerStatement,
    ReturnStatement(Option<ExprId>),
    BreakStatement(Option<Arc<str>>),
    ContinueStatement(Option<Arc<str>>),
    LabeledStatement {
        label: Arc<str>,
        body: StmtId,
    },
    IfStatement {
        test: ExprId,
        consequent: StmtId,
        alternate: Option<StmtId>,
    },
    SwitchStatement {
        discriminant: ExprId,
        cases: Vec<SwitchCaseData>,
    },
    ThrowStatement(ExprId),
    TryStatement {
        block: Vec<StmtId>,
        handler: Option<CatchClauseData>,
        finalizer: Option<Vec<StmtId>>,
    },
    WhileStatement {
        test: ExprId,
        body: StmtId,
    },
    DoWhileStatement {
        body: StmtId,
        test: ExprId,
    },
    ForStatement {
        init: Option<VariableDeclarationOrExpression>,
        test: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
    },
    ForInStatement(ForIteratorData),
    ForOfStatement(ForIteratorData),
    /// Parsed so that it can be rejected with a proper diagnostic.
    WithStatement {
        object: ExprId,
        body: StmtId,
    },
    VariableDeclaration(VariableDeclarationData),
    FunctionDeclaration(FuncId),
    ClassDeclaration(Box<ClassData>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FunctionForm {
    Script,
    Declaration,
    Expression,
    Arrow,
    Method,
    Getter,
    Setter,
    ClassConstructor { derived: bool },
}

#[derive(Debug)]
pub enum FunctionBody {
    Block(Vec<StmtId>),
    /// Concise arrow body.
    Expression(ExprId),
}

#[derive(Debug)]
pub struct FunctionData {
    pub meta: Meta,
    pub id: Option<Arc<str>>,
    pub form: FunctionForm,
    pub generator: bool,
    pub is_async: bool,
    pub params: Vec<PatId>,
    pub rest: Option<PatId>,
    pub body: FunctionBody,
    /// `var` names declared anywhere in the body outside nested functions.
    pub hoisted_vars: Vec<Arc<str>>,
}

impl FunctionData {
    /// Parameters are plain identifiers without defaults, rest or patterns.
    pub fn has_simple_params(&self, ast: &Ast) -> bool {
        self.rest.is_none()
            && self
                .params
                .iter()
                .all(|p| matches!(ast.pattern(*p).kind, PatternType::Identifier(_)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MethodDefinitionKind {
    Method,
    Get,
    Set,
}

#[derive(Debug)]
pub struct MethodDefinitionData {
    pub meta: Meta,
    pub key: PropertyName,
    pub value: FuncId,
    pub kind: MethodDefinitionKind,
    pub static_flag: bool,
}

#[derive(Debug)]
pub struct ClassData {
    pub meta: Meta,
    pub id: Option<Arc<str>>,
    pub super_class: Option<ExprId>,
    pub constructor: Option<FuncId>,
    pub body: Vec<MethodDefinitionData>,
}
