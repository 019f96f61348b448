//! Abstract Syntax Tree for the sketch subset of JavaScript.
//!
//! Every node carries its byte span in the parsed text. The tree exists for
//! two jobs: proving a block is syntactically valid before it is bound to
//! controls, and giving the formatter exact literal positions to splice.

use std::ops::Range;

/// Root node: one parsed block.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
    /// Byte ranges of `//` and `/* */` comments, in source order.
    pub comments: Vec<Range<usize>>,
    /// Length of the text this program was parsed from.
    pub source_len: usize,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `let speed = 1`, `const f = () => 2`
    Decl {
        kind: DeclKind,
        name: String,
        init: Option<Expr>,
        span: Range<usize>,
    },
    /// `return expr` inside an arrow block body.
    Return { value: Option<Expr>, span: Range<usize> },
    /// Any expression statement, typically a call chain ending in `.out()`.
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

/// Expression node with its span.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Numeric literal. A directly attached unary minus is folded in, so the
    /// span of `-0.5` starts at the sign.
    Number(f64),
    /// String or template literal; contents are never inspected.
    Str,
    /// Identifier: `time`, `o0`, `a`
    Ident(String),
    /// `object.property` or `object?.property`
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `x => body`, `(a, b) => { ... }`
    Arrow { params: Vec<String>, body: ArrowBody },
    /// `-x`, `!x`, `typeof x`, `++x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `x++`, `x--`
    Postfix { op: UnaryOp, operand: Box<Expr> },
    /// `a + b`, `a && b`
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `target = value`, `target += value`
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `[1, 2, 3]`
    Array(Vec<Expr>),
    /// `{ key: value }`
    Object(Vec<(String, Expr)>),
    /// `...items`
    Spread(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    Typeof,
    Increment,
    Decrement,
}

/// Binary operators with standard precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Nullish, // ??
    Or,      // ||
    And,     // &&
    Eq,      // == ===
    NotEq,   // != !==
    Lt,      // <
    LtEq,    // <=
    Gt,      // >
    GtEq,    // >=
    Add,     // +
    Sub,     // -
    Mul,     // *
    Div,     // /
    Rem,     // %
    Pow,     // **
}

impl BinOp {
    /// Precedence level (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Nullish | BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::NotEq => 3,
            BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 6,
            BinOp::Pow => 7,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self == BinOp::Pow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

/// A numeric literal located in the program.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    pub value: f64,
    pub span: Range<usize>,
}

impl Program {
    /// All numeric literals, ordered by start offset.
    pub fn number_literals(&self) -> Vec<NumberLiteral> {
        let mut out = Vec::new();
        for stmt in &self.statements {
            collect_stmt(stmt, &mut out);
        }
        out.sort_by_key(|lit| lit.span.start);
        out
    }

    /// Names of every call in the program, outermost call first. In a chain
    /// `osc().color().out()` that is `out`, `color`, `osc`.
    pub fn call_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for stmt in &self.statements {
            visit_stmt(stmt, &mut |expr| {
                if let ExprKind::Call { callee, .. } = &expr.kind {
                    match &callee.kind {
                        ExprKind::Ident(name) => names.push(name.clone()),
                        ExprKind::Member { property, .. } => names.push(property.clone()),
                        _ => {}
                    }
                }
            });
        }
        names
    }
}

fn collect_stmt(stmt: &Stmt, out: &mut Vec<NumberLiteral>) {
    visit_stmt(stmt, &mut |expr| {
        if let ExprKind::Number(value) = expr.kind {
            out.push(NumberLiteral {
                value,
                span: expr.span.clone(),
            });
        }
    });
}

fn visit_stmt(stmt: &Stmt, f: &mut impl FnMut(&Expr)) {
    match stmt {
        Stmt::Decl { init, .. } => {
            if let Some(init) = init {
                visit_expr(init, f);
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                visit_expr(value, f);
            }
        }
        Stmt::Expr(expr) => visit_expr(expr, f),
    }
}

/// Pre-order walk over an expression tree.
pub fn visit_expr(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::Number(_) | ExprKind::Str | ExprKind::Ident(_) => {}
        ExprKind::Member { object, .. } => visit_expr(object, f),
        ExprKind::Index { object, index } => {
            visit_expr(object, f);
            visit_expr(index, f);
        }
        ExprKind::Call { callee, args } => {
            visit_expr(callee, f);
            for arg in args {
                visit_expr(arg, f);
            }
        }
        ExprKind::Arrow { body, .. } => match body {
            ArrowBody::Expr(e) => visit_expr(e, f),
            ArrowBody::Block(stmts) => {
                for stmt in stmts {
                    visit_stmt(stmt, f);
                }
            }
        },
        ExprKind::Unary { operand, .. } | ExprKind::Postfix { operand, .. } => {
            visit_expr(operand, f)
        }
        ExprKind::Binary { left, right, .. } => {
            visit_expr(left, f);
            visit_expr(right, f);
        }
        ExprKind::Assign { target, value, .. } => {
            visit_expr(target, f);
            visit_expr(value, f);
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            visit_expr(test, f);
            visit_expr(consequent, f);
            visit_expr(alternate, f);
        }
        ExprKind::Array(items) => {
            for item in items {
                visit_expr(item, f);
            }
        }
        ExprKind::Object(entries) => {
            for (_, value) in entries {
                visit_expr(value, f);
            }
        }
        ExprKind::Spread(inner) => visit_expr(inner, f),
    }
}
