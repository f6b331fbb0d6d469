use crate::parser::ast::*;

/// Pretty-print a `Program` back into canonical NEM source.
///
/// Only what the AST captures is printed: loop markers and anything else
/// the parser skips are not part of the output (see [`Parser::skipped`]).
///
/// [`Parser::skipped`]: crate::parser::Parser::skipped
pub fn pretty_print(program: &Program) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_program(program);
    pp.buf
}

/// Print a single expression the way it appears inside a declaration.
pub fn pretty_print_expr(expr: &Expr) -> String {
    let mut pp = PrettyPrinter::new();
    pp.emit_value(expr);
    pp.buf
}

struct PrettyPrinter {
    buf: String,
}

impl PrettyPrinter {
    fn new() -> Self {
        Self { buf: String::new() }
    }

    fn write(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    // ── Program ──────────────────────────────────────────────────────

    fn emit_program(&mut self, program: &Program) {
        let mut has_output = false;

        if let Some(path) = &program.device_ref {
            self.write("device ");
            self.emit_string(path);
            self.newline();
            has_output = true;
        }
        if let Some(name) = &program.name {
            self.write("program ");
            self.write(name);
            self.write(":");
            self.newline();
            has_output = true;
        }

        // A blank line separates the headers and each run of same-kind statements.
        let mut prev_kind = None;
        for stmt in &program.statements {
            let kind = stmt.kind_name();
            if has_output && prev_kind != Some(kind) {
                self.newline();
            }
            has_output = true;
            prev_kind = Some(kind);
            self.emit_stmt(stmt);
            self.newline();
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Const(c) => {
                self.write("const ");
                self.write(&c.name);
                self.write(" = ");
                self.emit_expr(&c.value, 0);
            }
            Stmt::Buffer(b) => self.emit_buffer(b),
            Stmt::Region(r) => self.emit_region(r),
            Stmt::Let(l) => {
                self.write("let ");
                self.write(&l.name);
                self.write(" = ");
                self.emit_value(&l.value);
            }
        }
    }

    fn emit_buffer(&mut self, b: &BufferDecl) {
        self.write("buffer ");
        self.write(&b.name);
        self.write(" : ");
        self.write(b.mem_level.as_str());
        if let Some(index) = &b.l1_index {
            self.write("[");
            self.emit_expr(index, 0);
            self.write("]");
        }

        self.write(" (");
        let mut first = true;
        for (label, value) in [("size", &b.size), ("align", &b.align)] {
            if let Some(value) = value {
                if !first {
                    self.write(", ");
                }
                first = false;
                self.write(label);
                self.write("=");
                self.emit_expr(value, 0);
            }
        }
        self.write(")");
        self.emit_decorators(&b.decorators);
    }

    fn emit_region(&mut self, r: &RegionDecl) {
        self.write("let ");
        self.write(&r.name);
        self.write(" = region(");
        self.write(&r.buffer_name);
        self.write(", ");
        self.emit_expr(&r.offset, 0);
        self.write(", ");
        self.emit_expr(&r.extent, 0);
        self.write(")");

        if let Some(attrs) = &r.type_attrs {
            self.write(" ");
            self.emit_type_attrs(attrs);
        }
        self.emit_decorators(&r.decorators);
    }

    fn emit_type_attrs(&mut self, attrs: &TypeAttrs) {
        self.write("elem=");
        self.write(attrs.elem.as_str());
        self.write(", shape=");
        self.emit_list(&attrs.shape, |pp, e| pp.emit_expr(e, 0));
        if let Some(layout) = &attrs.layout {
            self.write(", layout=");
            self.write(layout);
        }
        if let Some(strides) = &attrs.strides {
            self.write(", strides=");
            self.emit_list(strides, |pp, e| pp.emit_expr(e, 0));
        }
        if let Some(quant) = &attrs.quant {
            self.write(", quant=");
            self.emit_quant(quant);
        }
    }

    fn emit_quant(&mut self, quant: &QuantDesc) {
        self.write(quant.name());
        self.write("(");
        match quant {
            QuantDesc::PerTensor { scale, zero_point, .. } => {
                self.write("scale=");
                self.emit_value(scale);
                self.write(", zero_point=");
                self.emit_value(zero_point);
            }
            QuantDesc::PerChannel { axis, scales, zero_points, .. } => {
                self.write("axis=");
                self.emit_expr(axis, 0);
                self.write(", scales=");
                self.emit_list(scales, Self::emit_value);
                self.write(", zero_points=");
                self.emit_list(zero_points, Self::emit_value);
            }
            QuantDesc::PerGroup { axis, group_size, scales, zero_points, .. } => {
                self.write("axis=");
                self.emit_expr(axis, 0);
                self.write(", group_size=");
                self.emit_expr(group_size, 0);
                self.write(", scales=");
                self.emit_list(scales, Self::emit_value);
                self.write(", zero_points=");
                self.emit_list(zero_points, Self::emit_value);
            }
        }
        self.write(")");
    }

    fn emit_decorators(&mut self, decorators: &[Decorator]) {
        for deco in decorators {
            self.write(" @");
            self.write(&deco.name);
            let Some(args) = &deco.args else { continue };
            self.write("(");
            match args.as_slice() {
                [unit, index] if is_resource_unit(unit) => {
                    self.emit_expr(unit, 0);
                    self.write("[");
                    self.emit_expr(index, 0);
                    self.write("]");
                }
                _ => self.emit_separated(args, Self::emit_value),
            }
            self.write(")");
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Strings and arrays are only legal in value position.
    fn emit_value(&mut self, expr: &Expr) {
        self.emit_expr(expr, 0);
    }

    fn emit_list(&mut self, items: &[Expr], item: fn(&mut Self, &Expr)) {
        self.write("[");
        self.emit_separated(items, item);
        self.write("]");
    }

    fn emit_separated(&mut self, items: &[Expr], item: fn(&mut Self, &Expr)) {
        for (i, e) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            item(self, e);
        }
    }

    fn emit_expr(&mut self, expr: &Expr, parent_prec: u8) {
        match &expr.kind {
            ExprKind::IntLiteral(n) => self.write(&n.to_string()),
            ExprKind::FloatLiteral(f) => self.write(&format_float(*f)),
            ExprKind::Identifier(name) => self.write(name),
            ExprKind::StringLiteral(s) => self.emit_string(s),
            ExprKind::ArrayLiteral(elements) => self.emit_list(elements, Self::emit_value),
            ExprKind::ParenExpr(inner) => {
                self.write("(");
                self.emit_expr(inner, 0);
                self.write(")");
            }
            ExprKind::UnaryOp { op, operand } => {
                self.write(&op.to_string());
                self.emit_expr(operand, UNARY_PREC);
            }
            ExprKind::BinaryOp { op, left, right } => {
                let prec = binop_prec(*op);
                let needs_parens = prec < parent_prec;
                if needs_parens {
                    self.write("(");
                }
                self.emit_expr(left, prec);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                // Left associative: an equal-precedence right operand keeps its grouping.
                self.emit_expr(right, prec + 1);
                if needs_parens {
                    self.write(")");
                }
            }
        }
    }

    fn emit_string(&mut self, s: &str) {
        self.write("\"");
        self.write(&escape_string(s));
        self.write("\"");
    }
}

const UNARY_PREC: u8 = 3;

fn binop_prec(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub => 1,
        BinOp::Mul | BinOp::Div | BinOp::Mod => 2,
    }
}

fn is_resource_unit(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Identifier(name) if RESOURCE_UNITS.contains(&name.as_str()))
}

/// Float literals always carry a fractional part so they lex back as floats.
fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return "1.0e999".to_string();
    }
    let text = value.to_string();
    if text.contains('.') { text } else { format!("{text}.0") }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
