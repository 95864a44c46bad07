// AST (Abstract Syntax Tree) definitions for the traced script language

/// Source location information for error reporting and line events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    /// Operator symbol as written in source (used in error messages)
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,    // -x
    Pos,    // +x
    Not,    // not x
    BitNot, // ~x
}

/// Short-circuit boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// Comparison operators (may be chained: `a < b <= c`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

/// Piece of an f-string
#[derive(Debug, Clone)]
pub enum FStringPart {
    Literal(String),
    Expr { expr: Expr, spec: Option<String> },
}

/// One `for ... in ... if ...` clause of a comprehension
#[derive(Debug, Clone)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub conditions: Vec<Expr>,
}

/// Function parameter with optional default value
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// Keyword argument at a call site
#[derive(Debug, Clone)]
pub struct Keyword {
    pub name: String,
    pub value: Expr,
}

/// Expressions
#[derive(Debug, Clone)]
pub enum Expr {
    NoneLiteral(SourceLocation),
    BoolLiteral(bool, SourceLocation),
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    StringLiteral(String, SourceLocation),
    FString {
        parts: Vec<FStringPart>,
        location: SourceLocation,
    },
    Name(String, SourceLocation),

    // Displays
    List {
        items: Vec<Expr>,
        location: SourceLocation,
    },
    /// A list display wrapped by the literal rewrite pass; evaluates to an
    /// access-tracked list
    Tracked {
        inner: Box<Expr>,
        location: SourceLocation,
    },
    Tuple {
        items: Vec<Expr>,
        location: SourceLocation,
    },
    Dict {
        entries: Vec<(Expr, Expr)>,
        location: SourceLocation,
    },
    Set {
        items: Vec<Expr>,
        location: SourceLocation,
    },
    ListComp {
        element: Box<Expr>,
        generators: Vec<Comprehension>,
        location: SourceLocation,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
        location: SourceLocation,
    },

    // Operators
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    BoolOp {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CmpOp, Expr)>,
        location: SourceLocation,
    },
    IfExp {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        location: SourceLocation,
    },
    Lambda {
        params: Vec<Param>,
        body: Box<Expr>,
        location: SourceLocation,
    },

    // Postfix
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
        location: SourceLocation,
    },
    Attribute {
        object: Box<Expr>,
        name: String,
        location: SourceLocation,
    },
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
    /// Only valid as the index of a subscript
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
        location: SourceLocation,
    },
}

impl Expr {
    /// Get the source location of this expression
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::NoneLiteral(loc)
            | Expr::BoolLiteral(_, loc)
            | Expr::IntLiteral(_, loc)
            | Expr::FloatLiteral(_, loc)
            | Expr::StringLiteral(_, loc)
            | Expr::Name(_, loc) => *loc,
            Expr::FString { location, .. }
            | Expr::List { location, .. }
            | Expr::Tracked { location, .. }
            | Expr::Tuple { location, .. }
            | Expr::Dict { location, .. }
            | Expr::Set { location, .. }
            | Expr::ListComp { location, .. }
            | Expr::DictComp { location, .. }
            | Expr::BinaryOp { location, .. }
            | Expr::UnaryOp { location, .. }
            | Expr::BoolOp { location, .. }
            | Expr::Compare { location, .. }
            | Expr::IfExp { location, .. }
            | Expr::Lambda { location, .. }
            | Expr::Call { location, .. }
            | Expr::Attribute { location, .. }
            | Expr::Subscript { location, .. }
            | Expr::Slice { location, .. } => *location,
        }
    }

    /// Whether this expression may appear on the left of `=`
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Name(..) | Expr::Attribute { .. } | Expr::Subscript { .. } => true,
            Expr::Tuple { items, .. } | Expr::List { items, .. } => {
                items.iter().all(Expr::is_assignable)
            }
            _ => false,
        }
    }
}

/// Statements
#[derive(Debug, Clone)]
pub enum Stmt {
    Expr {
        expr: Expr,
        location: SourceLocation,
    },
    Assign {
        targets: Vec<Expr>,
        value: Expr,
        location: SourceLocation,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    Pass {
        location: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    FunctionDef {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    ClassDef {
        name: String,
        base: Option<Expr>,
        body: Vec<Stmt>,
        location: SourceLocation,
    },
    Global {
        names: Vec<String>,
        location: SourceLocation,
    },
    Raise {
        exception: Option<Expr>,
        location: SourceLocation,
    },
    Assert {
        condition: Expr,
        message: Option<Expr>,
        location: SourceLocation,
    },
    Delete {
        targets: Vec<Expr>,
        location: SourceLocation,
    },
    Import {
        module: String,
        alias: Option<String>,
        location: SourceLocation,
    },
    ImportFrom {
        module: String,
        names: Vec<(String, Option<String>)>,
        location: SourceLocation,
    },
}

impl Stmt {
    /// Get the source location of this statement
    pub fn location(&self) -> SourceLocation {
        match self {
            Stmt::Expr { location, .. }
            | Stmt::Assign { location, .. }
            | Stmt::AugAssign { location, .. }
            | Stmt::If { location, .. }
            | Stmt::While { location, .. }
            | Stmt::For { location, .. }
            | Stmt::Break { location }
            | Stmt::Continue { location }
            | Stmt::Pass { location }
            | Stmt::Return { location, .. }
            | Stmt::FunctionDef { location, .. }
            | Stmt::ClassDef { location, .. }
            | Stmt::Global { location, .. }
            | Stmt::Raise { location, .. }
            | Stmt::Assert { location, .. }
            | Stmt::Delete { location, .. }
            | Stmt::Import { location, .. }
            | Stmt::ImportFrom { location, .. } => *location,
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
