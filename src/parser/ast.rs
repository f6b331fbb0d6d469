use std::fmt;

use serde::Serialize;

use crate::span::SourceLocation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub device_ref: Option<String>,
    pub name: Option<String>,
    pub statements: Vec<Stmt>,
    pub location: Option<SourceLocation>,
}

impl Program {
    pub fn consts(&self) -> impl Iterator<Item = &ConstDecl> {
        self.statements.iter().filter_map(|s| match s {
            Stmt::Const(c) => Some(c),
            _ => None,
        })
    }

    pub fn buffers(&self) -> impl Iterator<Item = &BufferDecl> {
        self.statements.iter().filter_map(|s| match s {
            Stmt::Buffer(b) => Some(b),
            _ => None,
        })
    }

    pub fn regions(&self) -> impl Iterator<Item = &RegionDecl> {
        self.statements.iter().filter_map(|s| match s {
            Stmt::Region(r) => Some(r),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Const(ConstDecl),
    Buffer(BufferDecl),
    Region(RegionDecl),
    Let(LetDecl),
}

impl Stmt {
    pub fn name(&self) -> &str {
        match self {
            Stmt::Const(c) => &c.name,
            Stmt::Buffer(b) => &b.name,
            Stmt::Region(r) => &r.name,
            Stmt::Let(l) => &l.name,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Stmt::Const(c) => c.location.as_ref(),
            Stmt::Buffer(b) => b.location.as_ref(),
            Stmt::Region(r) => r.location.as_ref(),
            Stmt::Let(l) => l.location.as_ref(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Const(_) => "const",
            Stmt::Buffer(_) => "buffer",
            Stmt::Region(_) => "region",
            Stmt::Let(_) => "let",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstDecl {
    pub name: String,
    pub value: Expr,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferDecl {
    pub name: String,
    pub mem_level: MemLevel,
    pub size: Option<Expr>,
    pub align: Option<Expr>,
    /// Index expression of `L1[expr]`.
    pub l1_index: Option<Expr>,
    pub decorators: Vec<Decorator>,
    pub location: Option<SourceLocation>,
}

/// `let NAME = region(BUF, offset, extent) ...`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionDecl {
    pub name: String,
    pub buffer_name: String,
    pub offset: Expr,
    pub extent: Expr,
    pub type_attrs: Option<TypeAttrs>,
    pub decorators: Vec<Decorator>,
    pub location: Option<SourceLocation>,
}

/// `let NAME = value` for anything that is not a region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetDecl {
    pub name: String,
    pub value: Expr,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MemLevel {
    #[serde(rename = "DDR")]
    Ddr,
    L2,
    L1,
}

impl MemLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            MemLevel::Ddr => "DDR",
            MemLevel::L2 => "L2",
            MemLevel::L1 => "L1",
        }
    }
}

impl fmt::Display for MemLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElemType {
    I4,
    I8,
    I16,
    I32,
    U8,
    U16,
    U32,
    F16,
    Bf16,
    Tf32,
    F32,
    F64,
    Bool,
}

impl ElemType {
    pub const ALL: [ElemType; 13] = [
        ElemType::I4,
        ElemType::I8,
        ElemType::I16,
        ElemType::I32,
        ElemType::U8,
        ElemType::U16,
        ElemType::U32,
        ElemType::F16,
        ElemType::Bf16,
        ElemType::Tf32,
        ElemType::F32,
        ElemType::F64,
        ElemType::Bool,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElemType::I4 => "i4",
            ElemType::I8 => "i8",
            ElemType::I16 => "i16",
            ElemType::I32 => "i32",
            ElemType::U8 => "u8",
            ElemType::U16 => "u16",
            ElemType::U32 => "u32",
            ElemType::F16 => "f16",
            ElemType::Bf16 => "bf16",
            ElemType::Tf32 => "tf32",
            ElemType::F32 => "f32",
            ElemType::F64 => "f64",
            ElemType::Bool => "bool",
        }
    }

    /// Storage width. `bool` occupies a byte.
    pub fn bit_width(self) -> u32 {
        match self {
            ElemType::I4 => 4,
            ElemType::I8 | ElemType::U8 | ElemType::Bool => 8,
            ElemType::I16 | ElemType::U16 | ElemType::F16 | ElemType::Bf16 => 16,
            ElemType::I32 | ElemType::U32 | ElemType::Tf32 | ElemType::F32 => 32,
            ElemType::F64 => 64,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ElemType::I4 | ElemType::I8 | ElemType::I16 | ElemType::I32 | ElemType::U8 | ElemType::U16 | ElemType::U32
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ElemType::F16 | ElemType::Bf16 | ElemType::Tf32 | ElemType::F32 | ElemType::F64)
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAttrs {
    pub elem: ElemType,
    pub shape: Vec<Expr>,
    pub layout: Option<String>,
    pub strides: Option<Vec<Expr>>,
    pub quant: Option<QuantDesc>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QuantDesc {
    PerTensor {
        scale: Expr,
        zero_point: Expr,
        location: Option<SourceLocation>,
    },
    PerChannel {
        axis: Expr,
        scales: Vec<Expr>,
        zero_points: Vec<Expr>,
        location: Option<SourceLocation>,
    },
    PerGroup {
        axis: Expr,
        group_size: Expr,
        scales: Vec<Expr>,
        zero_points: Vec<Expr>,
        location: Option<SourceLocation>,
    },
}

impl QuantDesc {
    pub fn name(&self) -> &'static str {
        match self {
            QuantDesc::PerTensor { .. } => "per_tensor",
            QuantDesc::PerChannel { .. } => "per_channel",
            QuantDesc::PerGroup { .. } => "per_group",
        }
    }
}

/// Execution units accepted as the first argument of `@resource(...)`.
pub const RESOURCE_UNITS: [&str; 7] = ["NMU", "CSTL", "DMA", "VPU", "SEQ", "sDMA", "WDM"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decorator {
    pub name: String,
    /// `None` for a bare `@name`, `Some(vec![])` for `@name()`.
    pub args: Option<Vec<Expr>>,
    pub location: Option<SourceLocation>,
}

impl Decorator {
    pub fn kind(&self) -> Option<DecoratorKind> {
        DecoratorKind::from_name(&self.name)
    }
}

/// Decorator names with a defined meaning. Other names parse fine and are
/// left to later passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoratorKind {
    Materialized,
    Deterministic,
    Memmove,
    Readonly,
    Writeonly,
    MaxInFlight,
    Resource,
    Debug,
    Profile,
}

impl DecoratorKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "materialized" => DecoratorKind::Materialized,
            "deterministic" => DecoratorKind::Deterministic,
            "memmove" => DecoratorKind::Memmove,
            "readonly" => DecoratorKind::Readonly,
            "writeonly" => DecoratorKind::Writeonly,
            "max_in_flight" => DecoratorKind::MaxInFlight,
            "resource" => DecoratorKind::Resource,
            "debug" => DecoratorKind::Debug,
            "profile" => DecoratorKind::Profile,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    Identifier(String),
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    ParenExpr(Box<Expr>),
    StringLiteral(String),
    ArrayLiteral(Vec<Expr>),
}

impl ExprKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::IntLiteral(_) => "IntLiteral",
            ExprKind::FloatLiteral(_) => "FloatLiteral",
            ExprKind::Identifier(_) => "Identifier",
            ExprKind::BinaryOp { .. } => "BinaryOp",
            ExprKind::UnaryOp { .. } => "UnaryOp",
            ExprKind::ParenExpr(_) => "ParenExpr",
            ExprKind::StringLiteral(_) => "StringLiteral",
            ExprKind::ArrayLiteral(_) => "ArrayLiteral",
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, location: impl Into<Option<SourceLocation>>) -> Self {
        Self { kind, location: location.into() }
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::IntLiteral(value), None)
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Identifier(name.into()), None)
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Self::new(ExprKind::BinaryOp { op, left: Box::new(left), right: Box::new(right) }, None)
    }

    pub fn neg(operand: Expr) -> Self {
        Self::new(ExprKind::UnaryOp { op: UnaryOp::Neg, operand: Box::new(operand) }, None)
    }

    pub fn paren(inner: Expr) -> Self {
        Self::new(ExprKind::ParenExpr(Box::new(inner)), None)
    }

    /// Same tree with every location cleared, for structural comparison.
    pub fn without_locations(&self) -> Expr {
        let kind = match &self.kind {
            ExprKind::BinaryOp { op, left, right } => ExprKind::BinaryOp {
                op: *op,
                left: Box::new(left.without_locations()),
                right: Box::new(right.without_locations()),
            },
            ExprKind::UnaryOp { op, operand } => {
                ExprKind::UnaryOp { op: *op, operand: Box::new(operand.without_locations()) }
            }
            ExprKind::ParenExpr(inner) => ExprKind::ParenExpr(Box::new(inner.without_locations())),
            ExprKind::ArrayLiteral(elements) => {
                ExprKind::ArrayLiteral(elements.iter().map(Expr::without_locations).collect())
            }
            other => other.clone(),
        };
        Expr { kind, location: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "mod",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Neg,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}
