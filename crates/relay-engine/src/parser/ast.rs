//! Abstract Syntax Tree for Relay script.
//!
//! Function and class declarations are reference-counted so that runtime
//! function and class values can share them with the tree they came from.

use crate::parser::token::Span;
use std::sync::Arc;

/// A parsed source unit: a component file or an `eval` snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Statement (performs an action)
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let x = 1;` / `const y = 2;`
    Variable(VariableDeclaration),

    /// `function add(a, b) { ... }`
    Function(Arc<FunctionDecl>),

    /// `class Counter extends Base { ... }`
    Class(Arc<ClassDecl>),

    /// `if (cond) { ... } else { ... }`
    If(IfStatement),

    /// `while (cond) { ... }`
    While(WhileStatement),

    /// `for (item of items) { ... }`
    ForOf(ForOfStatement),

    /// `return expr;`
    Return(Option<Expression>, Span),

    /// `break;`
    Break(Span),

    /// `continue;`
    Continue(Span),

    /// `throw expr;`
    Throw(Expression, Span),

    /// `try { ... } catch (e) { ... }`
    Try(TryStatement),

    /// `import geometry.shapes as shapes;`
    Import(ImportDeclaration),

    /// Expression evaluated for its value or side effects
    Expression(Expression),

    /// Stray `;`
    Empty(Span),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Variable(s) => s.span,
            Statement::Function(f) => f.span,
            Statement::Class(c) => c.span,
            Statement::If(s) => s.span,
            Statement::While(s) => s.span,
            Statement::ForOf(s) => s.span,
            Statement::Return(_, span)
            | Statement::Break(span)
            | Statement::Continue(span)
            | Statement::Throw(_, span)
            | Statement::Empty(span) => *span,
            Statement::Try(s) => s.span,
            Statement::Import(s) => s.span,
            Statement::Expression(e) => e.span(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub name: String,
    pub constant: bool,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// Function parameter with optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expression>,
}

/// Function, method, or constructor declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// Class member field: `count = 0;` or `static instances = 0;`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub initializer: Option<Expression>,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<Expression>,
    pub constructor: Option<Arc<FunctionDecl>>,
    pub methods: Vec<Arc<FunctionDecl>>,
    pub static_methods: Vec<Arc<FunctionDecl>>,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Vec<Statement>,
    /// `else if` chains are nested as a single `If` statement here.
    pub else_branch: Option<Vec<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForOfStatement {
    pub binding: String,
    pub iterable: Expression,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: Vec<Statement>,
    pub catch_binding: Option<String>,
    pub handler: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDeclaration {
    /// Dotted component path, e.g. `["geometry", "shapes"]`
    pub path: Vec<String>,
    pub alias: Option<String>,
    pub span: Span,
}

impl ImportDeclaration {
    /// Name the import binds in the importing scope.
    pub fn local_name(&self) -> &str {
        self.alias
            .as_deref()
            .or_else(|| self.path.last().map(String::as_str))
            .unwrap_or_default()
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `null`
    Null(Span),

    /// `true` / `false`
    Bool(bool, Span),

    /// `42`, `0xFF`
    Int(i64, Span),

    /// `3.14`
    Float(f64, Span),

    /// `"hello"`
    Str(String, Span),

    /// `[1, 2, 3]`
    List(Vec<Expression>, Span),

    /// `{ x: 1, "y": 2 }`
    Dict(Vec<(String, Expression)>, Span),

    /// Identifier reference
    Identifier(String, Span),

    /// `this`
    This(Span),

    /// `!x`, `-y`, `typeof z`
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },

    /// `x + y`, `a == b`
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },

    /// `x && y`, `a || b`, `a ?? b` (short-circuiting)
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },

    /// `cond ? a : b`
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
        span: Span,
    },

    /// `x = 1`, `obj.count += 1`, `items[0] = v`
    Assign {
        target: Box<Expression>,
        /// `Some(op)` for compound assignment
        op: Option<BinaryOp>,
        value: Box<Expression>,
        span: Span,
    },

    /// `f(1, step: 2)`
    Call {
        callee: Box<Expression>,
        args: Vec<Argument>,
        span: Span,
    },

    /// `new Point(1, 2)`
    New {
        class: Box<Expression>,
        args: Vec<Argument>,
        span: Span,
    },

    /// `obj.prop`
    Member {
        object: Box<Expression>,
        property: String,
        span: Span,
    },

    /// `arr[0]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },

    /// `function (x) { return x + 1; }`
    Function(Arc<FunctionDecl>),

    /// `super(...)` inside a constructor
    SuperCall { args: Vec<Argument>, span: Span },

    /// `super.method` inside a method
    SuperMember { property: String, span: Span },
}

impl Expression {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expression::Null(span)
            | Expression::Bool(_, span)
            | Expression::Int(_, span)
            | Expression::Float(_, span)
            | Expression::Str(_, span)
            | Expression::List(_, span)
            | Expression::Dict(_, span)
            | Expression::Identifier(_, span)
            | Expression::This(span) => *span,
            Expression::Unary { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Logical { span, .. }
            | Expression::Conditional { span, .. }
            | Expression::Assign { span, .. }
            | Expression::Call { span, .. }
            | Expression::New { span, .. }
            | Expression::Member { span, .. }
            | Expression::Index { span, .. }
            | Expression::SuperCall { span, .. }
            | Expression::SuperMember { span, .. } => *span,
            Expression::Function(decl) => decl.span,
        }
    }

    /// Whether this expression may appear on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(..) | Expression::Member { .. } | Expression::Index { .. }
        )
    }
}

/// Call argument, optionally named: `f(1, step: 2)`
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}
