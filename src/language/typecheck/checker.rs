use crate::language::{
    ast::*,
    span::Span,
    typecheck::{TypeDiagnostic, TypeErrorKind},
    types::TypeExpr,
};
use std::collections::HashMap;
use std::rc::Rc;

/// Runs the advisory pass over a parsed program. The walk never executes
/// anything, never aborts, and carries no state between invocations, so
/// checking the same tree twice yields the same diagnostics.
pub fn check_program(program: &Program) -> Vec<TypeDiagnostic> {
    let mut checker = Checker::new();
    checker.check(program);
    checker.diagnostics
}

/// Coarse inferred type. One entry per declaration site; assignments in the
/// same scope overwrite it (flow-insensitive, lint-level inference).
#[derive(Clone, Debug, PartialEq)]
enum Ty {
    Any,
    Number,
    Str,
    Bool,
    Null,
    Array,
    Object,
    /// Host namespace bound by `import`. Member access yields `Any`.
    Module,
    /// `None` means callable with unknown signature.
    Function(Option<Rc<FnTy>>),
}

#[derive(Debug, PartialEq)]
struct FnTy {
    params: Vec<Ty>,
    ret: Option<Ty>,
}

impl Ty {
    fn from_annotation(ty: TypeExpr) -> Ty {
        match ty {
            TypeExpr::Number => Ty::Number,
            TypeExpr::String => Ty::Str,
            TypeExpr::Bool => Ty::Bool,
            TypeExpr::Null => Ty::Null,
            TypeExpr::Array => Ty::Array,
            TypeExpr::Object => Ty::Object,
            TypeExpr::Function => Ty::Function(None),
            TypeExpr::Any => Ty::Any,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Ty::Any => "any",
            Ty::Number => "number",
            Ty::Str => "string",
            Ty::Bool => "bool",
            Ty::Null => "null",
            Ty::Array => "array",
            Ty::Object => "object",
            Ty::Module => "module",
            Ty::Function(_) => "function",
        }
    }

    fn is_numeric_operand(&self) -> bool {
        matches!(self, Ty::Number | Ty::Any)
    }
}

struct Checker {
    scopes: Vec<HashMap<String, Ty>>,
    /// Declared return type of the enclosing function, innermost last.
    return_types: Vec<Option<Ty>>,
    diagnostics: Vec<TypeDiagnostic>,
}

impl Checker {
    fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
            return_types: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn check(&mut self, program: &Program) {
        self.check_statements(&program.statements);
    }

    fn report(&mut self, kind: TypeErrorKind, span: Span, message: impl Into<String>) {
        self.diagnostics.push(TypeDiagnostic::new(kind, span, message));
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, ty: Ty) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    /// Bare assignment: overwrite where the name is visible, otherwise the
    /// name is declared in the innermost scope.
    fn assign_name(&mut self, name: &str, ty: Ty) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = ty;
                return;
            }
        }
        self.declare(name, ty);
    }

    fn lookup(&self, name: &str) -> Option<Ty> {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Some(ty.clone());
            }
        }
        None
    }

    /// Function statements are visible to earlier statements in the same
    /// block, so hoist their names before walking the block body.
    fn check_statements(&mut self, statements: &[Statement]) {
        for stmt in statements {
            if let Statement::Function(func) = stmt {
                if let Some(name) = &func.decl.name {
                    self.declare(name, function_ty(&func.decl));
                }
            }
        }
        for stmt in statements {
            self.check_statement(stmt);
        }
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Import(import) => {
                self.declare(&import.module, Ty::Module);
            }
            Statement::Function(func) => {
                self.check_function_body(&func.decl);
            }
            Statement::Let(stmt) => {
                let inferred = self.infer(&stmt.value);
                let ty = match stmt.ty {
                    Some(annotation) => Ty::from_annotation(annotation.ty),
                    None => inferred,
                };
                self.declare(&stmt.name, ty);
            }
            Statement::Assign(stmt) => {
                let value_ty = self.infer(&stmt.value);
                self.check_assign_target(&stmt.target, value_ty);
            }
            Statement::Expr(stmt) => {
                self.infer(&stmt.expr);
            }
            Statement::If(stmt) => self.check_if(stmt),
            Statement::While(stmt) => {
                self.infer(&stmt.condition);
                self.check_block(&stmt.body);
            }
            Statement::For(stmt) => {
                self.infer(&stmt.iterable);
                self.push_scope();
                self.declare(&stmt.binding, Ty::Any);
                self.check_statements(&stmt.body.statements);
                self.pop_scope();
            }
            Statement::Return(stmt) => self.check_return(stmt),
            Statement::Break(_) | Statement::Continue(_) => {}
            Statement::Block(block) => self.check_block(block),
        }
    }

    fn check_if(&mut self, stmt: &IfStmt) {
        self.infer(&stmt.condition);
        self.check_block(&stmt.then_branch);
        match &stmt.else_branch {
            Some(ElseBranch::Elif(nested)) => self.check_if(nested),
            Some(ElseBranch::Else(block)) => self.check_block(block),
            None => {}
        }
    }

    fn check_block(&mut self, block: &Block) {
        self.push_scope();
        self.check_statements(&block.statements);
        self.pop_scope();
    }

    fn check_return(&mut self, stmt: &ReturnStmt) {
        let declared = self.return_types.last().cloned().flatten();
        match (&stmt.value, declared) {
            (Some(expr), Some(declared)) => {
                let ty = self.infer(expr);
                if !types_agree(&declared, &ty) {
                    self.report(
                        TypeErrorKind::ReturnTypeMismatch,
                        expr_span(expr),
                        format!(
                            "Function declares return type `{}` but returns `{}`",
                            declared.name(),
                            ty.name()
                        ),
                    );
                }
            }
            (Some(expr), None) => {
                self.infer(expr);
            }
            (None, Some(declared)) => {
                if declared != Ty::Null && declared != Ty::Any {
                    self.report(
                        TypeErrorKind::ReturnTypeMismatch,
                        stmt.span,
                        format!(
                            "Function declares return type `{}` but returns nothing",
                            declared.name()
                        ),
                    );
                }
            }
            (None, None) => {}
        }
    }

    fn check_assign_target(&mut self, target: &Expr, value_ty: Ty) {
        match target {
            Expr::Identifier(ident) => {
                self.assign_name(&ident.name, value_ty);
            }
            Expr::FieldAccess { base, field, span } => {
                let base_ty = self.infer(base);
                self.flag_property_base(&base_ty, field, *span);
            }
            Expr::Index { base, index, span } => {
                let base_ty = self.infer(base);
                self.infer(index);
                self.flag_index_base(&base_ty, *span);
            }
            // The parser rejects other targets; nothing further to check.
            _ => {}
        }
    }

    fn check_function_body(&mut self, decl: &FunctionDecl) {
        self.push_scope();
        for param in &decl.params {
            let ty = match param.ty {
                Some(annotation) => Ty::from_annotation(annotation.ty),
                None => Ty::Any,
            };
            self.declare(&param.name, ty);
        }
        self.return_types
            .push(decl.returns.map(|annotation| Ty::from_annotation(annotation.ty)));
        self.check_statements(&decl.body.statements);
        self.return_types.pop();
        self.pop_scope();
    }

    fn infer(&mut self, expr: &Expr) -> Ty {
        match expr {
            Expr::Literal(lit) => match lit {
                Literal::Number(..) => Ty::Number,
                Literal::String(..) => Ty::Str,
                Literal::Bool(..) => Ty::Bool,
                Literal::Null(_) => Ty::Null,
            },
            Expr::Identifier(ident) => match self.lookup(&ident.name) {
                Some(ty) => ty,
                None if ident.name == "print" => Ty::Function(None),
                None => {
                    self.report(
                        TypeErrorKind::UndefinedIdentifier,
                        ident.span,
                        format!("`{}` is not defined", ident.name),
                    );
                    Ty::Any
                }
            },
            Expr::ArrayLiteral(items, _) => {
                for item in items {
                    self.infer(item);
                }
                Ty::Array
            }
            Expr::ObjectLiteral { entries, .. } => {
                for entry in entries {
                    self.infer(&entry.value);
                }
                Ty::Object
            }
            Expr::Function(func) => {
                self.check_function_body(&func.decl);
                function_ty(&func.decl)
            }
            Expr::Unary { op, expr, span } => self.infer_unary(*op, expr, *span),
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => self.infer_binary(*op, left, right, *span),
            Expr::Ternary {
                condition,
                then_value,
                else_value,
                ..
            } => {
                self.infer(condition);
                let then_ty = self.infer(then_value);
                let else_ty = self.infer(else_value);
                if then_ty == else_ty {
                    then_ty
                } else {
                    Ty::Any
                }
            }
            Expr::Call { callee, args, span } => self.infer_call(callee, args, *span),
            Expr::FieldAccess { base, field, span } => {
                let base_ty = self.infer(base);
                self.flag_property_base(&base_ty, field, *span);
                Ty::Any
            }
            Expr::Index { base, index, span } => {
                let base_ty = self.infer(base);
                self.infer(index);
                self.flag_index_base(&base_ty, *span);
                match base_ty {
                    Ty::Str => Ty::Str,
                    _ => Ty::Any,
                }
            }
        }
    }

    fn infer_unary(&mut self, op: UnaryOp, expr: &Expr, span: Span) -> Ty {
        let ty = self.infer(expr);
        match op {
            UnaryOp::Neg | UnaryOp::Pos => {
                if !ty.is_numeric_operand() {
                    self.report(
                        TypeErrorKind::IncompatibleArithmetic,
                        span,
                        format!("Unary arithmetic applied to `{}`", ty.name()),
                    );
                }
                Ty::Number
            }
            UnaryOp::Not => Ty::Bool,
        }
    }

    fn infer_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> Ty {
        let lt = self.infer(left);
        let rt = self.infer(right);
        match op {
            BinaryOp::Add => {
                // `+` doubles as concatenation, so only containers and null
                // are statically wrong operands.
                for ty in [&lt, &rt] {
                    if matches!(ty, Ty::Array | Ty::Object | Ty::Null) {
                        self.report(
                            TypeErrorKind::IncompatibleArithmetic,
                            span,
                            format!("`+` applied to `{}`", ty.name()),
                        );
                    }
                }
                if lt == Ty::Number && rt == Ty::Number {
                    Ty::Number
                } else if lt == Ty::Str || rt == Ty::Str {
                    Ty::Str
                } else {
                    Ty::Any
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                for ty in [&lt, &rt] {
                    if !ty.is_numeric_operand() {
                        self.report(
                            TypeErrorKind::IncompatibleArithmetic,
                            span,
                            format!("Arithmetic operator applied to `{}`", ty.name()),
                        );
                    }
                }
                Ty::Number
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ordered = lt == Ty::Any
                    || rt == Ty::Any
                    || (lt == Ty::Number && rt == Ty::Number)
                    || (lt == Ty::Str && rt == Ty::Str);
                if !ordered {
                    self.report(
                        TypeErrorKind::IncompatibleComparison,
                        span,
                        format!("Cannot order `{}` against `{}`", lt.name(), rt.name()),
                    );
                }
                Ty::Bool
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::And | BinaryOp::Or => Ty::Bool,
        }
    }

    fn infer_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Ty {
        let callee_ty = self.infer(callee);
        let arg_tys: Vec<Ty> = args.iter().map(|arg| self.infer(arg)).collect();
        match callee_ty {
            Ty::Function(Some(fn_ty)) => {
                if arg_tys.len() != fn_ty.params.len() {
                    self.report(
                        TypeErrorKind::ArityMismatch,
                        span,
                        format!(
                            "Call takes {} argument{} but {} {} supplied",
                            fn_ty.params.len(),
                            if fn_ty.params.len() == 1 { "" } else { "s" },
                            arg_tys.len(),
                            if arg_tys.len() == 1 { "was" } else { "were" },
                        ),
                    );
                }
                for (index, (param, arg)) in fn_ty.params.iter().zip(arg_tys.iter()).enumerate() {
                    if !types_agree(param, arg) {
                        self.report(
                            TypeErrorKind::ArgumentTypeMismatch,
                            expr_span(&args[index]),
                            format!(
                                "Argument {} has type `{}` but `{}` is expected",
                                index + 1,
                                arg.name(),
                                param.name()
                            ),
                        );
                    }
                }
                fn_ty.ret.clone().unwrap_or(Ty::Any)
            }
            Ty::Function(None) | Ty::Any | Ty::Module => Ty::Any,
            other => {
                self.report(
                    TypeErrorKind::NotCallable,
                    span,
                    format!("Value of type `{}` is not callable", other.name()),
                );
                Ty::Any
            }
        }
    }

    fn flag_property_base(&mut self, base_ty: &Ty, field: &str, span: Span) {
        match base_ty {
            Ty::Object | Ty::Module | Ty::Any => {}
            Ty::Null => {
                self.report(
                    TypeErrorKind::InvalidPropertyAccess,
                    span,
                    format!("Property `{field}` accessed on `null`"),
                );
            }
            other => {
                self.report(
                    TypeErrorKind::InvalidPropertyAccess,
                    span,
                    format!("Property `{field}` accessed on `{}`", other.name()),
                );
            }
        }
    }

    fn flag_index_base(&mut self, base_ty: &Ty, span: Span) {
        if !matches!(base_ty, Ty::Array | Ty::Str | Ty::Any) {
            self.report(
                TypeErrorKind::InvalidIndexAccess,
                span,
                format!("Value of type `{}` cannot be indexed", base_ty.name()),
            );
        }
    }
}

/// Agreement between an expected type and an inferred one. `any` matches
/// everything, and function values agree at kind level regardless of
/// signature, so a `function` annotation accepts every closure.
fn types_agree(expected: &Ty, actual: &Ty) -> bool {
    match (expected, actual) {
        (Ty::Any, _) | (_, Ty::Any) => true,
        (Ty::Function(_), Ty::Function(_)) => true,
        _ => expected == actual,
    }
}

fn function_ty(decl: &FunctionDecl) -> Ty {
    let params = decl
        .params
        .iter()
        .map(|param| match param.ty {
            Some(annotation) => Ty::from_annotation(annotation.ty),
            None => Ty::Any,
        })
        .collect();
    let ret = decl.returns.map(|annotation| Ty::from_annotation(annotation.ty));
    Ty::Function(Some(Rc::new(FnTy { params, ret })))
}
