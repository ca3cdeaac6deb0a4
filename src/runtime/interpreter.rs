use crate::language::ast::*;
use crate::runtime::{
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
    host::HostRegistry,
    value::{values_equal, ClosureValue, ObjectMap, Value},
};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Control signal produced by statement evaluation, propagated upward until
/// the nearest enclosing loop or function call absorbs it.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Result of executing a whole program. Runtime errors recovered at the top
/// level are collected here rather than aborting the run.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub errors: Vec<RuntimeError>,
}

impl RunOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
enum OutputSink {
    Stdout,
    Capture(Vec<String>),
}

pub struct Interpreter {
    globals: Environment,
    registry: HostRegistry,
    output: OutputSink,
    rng_state: u64,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: Environment::global(),
            registry: HostRegistry::default(),
            output: OutputSink::Stdout,
            rng_state: initial_seed(),
        }
    }

    /// Interpreter whose `print` output is buffered instead of written to
    /// stdout; used by tests and embedders.
    pub fn with_captured_output() -> Self {
        let mut interp = Self::new();
        interp.output = OutputSink::Capture(Vec::new());
        interp
    }

    pub fn take_output(&mut self) -> Vec<String> {
        match &mut self.output {
            OutputSink::Capture(lines) => std::mem::take(lines),
            OutputSink::Stdout => Vec::new(),
        }
    }

    pub fn host_registry_mut(&mut self) -> &mut HostRegistry {
        &mut self.registry
    }

    pub fn seed_random(&mut self, seed: u64) {
        self.rng_state = seed | 1;
    }

    /// Executes top-level statements in file order, recovering after a
    /// runtime error so the rest of the program still runs, then invokes a
    /// global `main` closure if one was defined.
    pub fn run(&mut self, program: &Program) -> RunOutcome {
        log::debug!("executing {} top-level statements", program.statements.len());
        let mut errors = Vec::new();
        let globals = self.globals.clone();
        for stmt in &program.statements {
            match self.exec_statement(stmt, &globals) {
                Ok(_) => {} // stray break/continue/return at top level is inert
                Err(err) => {
                    log::debug!("recovered top-level runtime error: {err}");
                    errors.push(err);
                }
            }
        }

        if let Some(main @ Value::Closure(_)) = globals.get("main") {
            log::debug!("invoking main()");
            if let Err(err) = self.call_value(main, Vec::new()) {
                errors.push(err);
            }
        }

        RunOutcome { errors }
    }

    fn exec_statement(&mut self, stmt: &Statement, env: &Environment) -> RuntimeResult<Flow> {
        match stmt {
            Statement::Import(import) => {
                let namespace = self
                    .registry
                    .resolve(&import.module)
                    .ok_or_else(|| RuntimeError::UnknownModule {
                        name: import.module.clone(),
                    })?;
                log::debug!("import resolved module `{}`", import.module);
                env.declare(&import.module, namespace);
                Ok(Flow::Normal)
            }
            Statement::Function(func) => {
                let name = func
                    .decl
                    .name
                    .clone()
                    .unwrap_or_default();
                let closure = Value::Closure(Rc::new(ClosureValue {
                    decl: func.decl.clone(),
                    env: env.clone(),
                }));
                env.declare(&name, closure);
                Ok(Flow::Normal)
            }
            Statement::Let(stmt) => {
                let value = self.eval_expression(&stmt.value, env)?;
                env.declare(&stmt.name, value);
                Ok(Flow::Normal)
            }
            Statement::Assign(stmt) => {
                let value = self.eval_expression(&stmt.value, env)?;
                self.assign_target(&stmt.target, value, env)?;
                Ok(Flow::Normal)
            }
            Statement::Expr(stmt) => {
                self.eval_expression(&stmt.expr, env)?;
                Ok(Flow::Normal)
            }
            Statement::If(stmt) => self.exec_if(stmt, env),
            Statement::While(stmt) => {
                while self.eval_expression(&stmt.condition, env)?.as_bool() {
                    match self.exec_block(&stmt.body, env)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::For(stmt) => self.exec_for(stmt, env),
            Statement::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.eval_expression(expr, env)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::Break(_) => Ok(Flow::Break),
            Statement::Continue(_) => Ok(Flow::Continue),
            Statement::Block(block) => self.exec_block(block, env),
        }
    }

    fn exec_if(&mut self, stmt: &IfStmt, env: &Environment) -> RuntimeResult<Flow> {
        if self.eval_expression(&stmt.condition, env)?.as_bool() {
            return self.exec_block(&stmt.then_branch, env);
        }
        match &stmt.else_branch {
            Some(ElseBranch::Elif(nested)) => self.exec_if(nested, env),
            Some(ElseBranch::Else(block)) => self.exec_block(block, env),
            None => Ok(Flow::Normal),
        }
    }

    fn exec_for(&mut self, stmt: &ForStmt, env: &Environment) -> RuntimeResult<Flow> {
        let iterable = self.eval_expression(&stmt.iterable, env)?;
        // Snapshot the element handles up front; mutating the collection
        // inside the body does not change the iteration sequence.
        let items: Vec<Value> = match &iterable {
            Value::Array(items) => items.borrow().clone(),
            Value::Object(map) => map.borrow().keys().into_iter().map(Value::string).collect(),
            Value::String(s) => s.chars().map(|ch| Value::string(ch.to_string())).collect(),
            other => {
                return Err(RuntimeError::NotIndexable {
                    type_name: other.type_name(),
                })
            }
        };

        let loop_env = env.child();
        for item in items {
            // One slot for the binding, re-assigned each iteration.
            loop_env.declare(&stmt.binding, item);
            match self.exec_block(&stmt.body, &loop_env)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, block: &Block, env: &Environment) -> RuntimeResult<Flow> {
        let frame = env.child();
        for stmt in &block.statements {
            match self.exec_statement(stmt, &frame)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn assign_target(
        &mut self,
        target: &Expr,
        value: Value,
        env: &Environment,
    ) -> RuntimeResult<()> {
        match target {
            Expr::Identifier(ident) => {
                env.assign(&ident.name, value);
                Ok(())
            }
            Expr::FieldAccess { base, field, .. } => {
                let base_value = self.eval_expression(base, env)?;
                match base_value {
                    Value::Object(map) => {
                        map.borrow_mut().insert(field.clone(), value);
                        Ok(())
                    }
                    other => Err(RuntimeError::InvalidTarget {
                        message: format!(
                            "cannot assign property `{field}` on a value of type `{}`",
                            other.type_name()
                        ),
                    }),
                }
            }
            Expr::Index { base, index, .. } => {
                let base_value = self.eval_expression(base, env)?;
                let index_value = self.eval_expression(index, env)?;
                match base_value {
                    Value::Array(items) => {
                        let mut items = items.borrow_mut();
                        let index = array_index(&index_value, items.len())?;
                        items[index] = value;
                        Ok(())
                    }
                    Value::String(_) => Err(RuntimeError::InvalidTarget {
                        message: "strings are immutable".to_string(),
                    }),
                    other => Err(RuntimeError::InvalidTarget {
                        message: format!(
                            "cannot assign by index into a value of type `{}`",
                            other.type_name()
                        ),
                    }),
                }
            }
            other => Err(RuntimeError::InvalidTarget {
                message: format!("expression `{}` cannot be assigned to", describe_expr(other)),
            }),
        }
    }

    fn eval_expression(&mut self, expr: &Expr, env: &Environment) -> RuntimeResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Number(n, _) => Value::Number(*n),
                Literal::String(s, _) => Value::string(s.clone()),
                Literal::Bool(b, _) => Value::Bool(*b),
                Literal::Null(_) => Value::Null,
            }),
            Expr::Identifier(ident) => {
                env.get(&ident.name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: ident.name.clone(),
                    })
            }
            Expr::ArrayLiteral(items, _) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expression(item, env)?);
                }
                Ok(Value::array(values))
            }
            Expr::ObjectLiteral { entries, .. } => {
                let mut map = ObjectMap::new();
                for entry in entries {
                    let value = self.eval_expression(&entry.value, env)?;
                    map.insert(entry.key.clone(), value);
                }
                Ok(Value::object(map))
            }
            Expr::Function(func) => Ok(Value::Closure(Rc::new(ClosureValue {
                decl: func.decl.clone(),
                env: env.clone(),
            }))),
            Expr::Unary { op, expr, .. } => {
                let value = self.eval_expression(expr, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.as_bool())),
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(RuntimeError::TypeMismatch {
                            message: format!("cannot negate a value of type `{}`", other.type_name()),
                        }),
                    },
                    UnaryOp::Pos => match value {
                        Value::Number(n) => Ok(Value::Number(n)),
                        other => Err(RuntimeError::TypeMismatch {
                            message: format!(
                                "unary `+` requires a number, got `{}`",
                                other.type_name()
                            ),
                        }),
                    },
                }
            }
            Expr::Binary {
                op, left, right, ..
            } => self.eval_binary(*op, left, right, env),
            Expr::Ternary {
                condition,
                then_value,
                else_value,
                ..
            } => {
                // Exactly one branch is evaluated.
                if self.eval_expression(condition, env)?.as_bool() {
                    self.eval_expression(then_value, env)
                } else {
                    self.eval_expression(else_value, env)
                }
            }
            Expr::Call { callee, args, .. } => {
                if let Expr::Identifier(ident) = callee.as_ref() {
                    if ident.name == "print" && !env.is_defined("print") {
                        let mut rendered = Vec::with_capacity(args.len());
                        for arg in args {
                            rendered.push(self.eval_expression(arg, env)?.render());
                        }
                        self.print_line(rendered.join(" "));
                        return Ok(Value::Null);
                    }
                }
                let callee_value = self.eval_expression(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expression(arg, env)?);
                }
                self.call_value(callee_value, values)
            }
            Expr::FieldAccess { base, field, .. } => {
                let base_value = self.eval_expression(base, env)?;
                match base_value {
                    // Absent properties read as null; the corpus's duck-typing
                    // helpers rely on this.
                    Value::Object(map) => Ok(map.borrow().get(field).unwrap_or(Value::Null)),
                    other => Err(RuntimeError::NotAnObject {
                        type_name: other.type_name(),
                    }),
                }
            }
            Expr::Index { base, index, .. } => {
                let base_value = self.eval_expression(base, env)?;
                let index_value = self.eval_expression(index, env)?;
                match base_value {
                    Value::Array(items) => {
                        let items = items.borrow();
                        let index = array_index(&index_value, items.len())?;
                        Ok(items[index].clone())
                    }
                    Value::String(s) => {
                        let chars: Vec<char> = s.chars().collect();
                        let index = array_index(&index_value, chars.len())?;
                        Ok(Value::string(chars[index].to_string()))
                    }
                    other => Err(RuntimeError::NotIndexable {
                        type_name: other.type_name(),
                    }),
                }
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        env: &Environment,
    ) -> RuntimeResult<Value> {
        // Short-circuit forms evaluate the right side lazily.
        match op {
            BinaryOp::And => {
                if !self.eval_expression(left, env)?.as_bool() {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval_expression(right, env)?;
                return Ok(Value::Bool(right.as_bool()));
            }
            BinaryOp::Or => {
                if self.eval_expression(left, env)?.as_bool() {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval_expression(right, env)?;
                return Ok(Value::Bool(right.as_bool()));
            }
            _ => {}
        }

        let lhs = self.eval_expression(left, env)?;
        let rhs = self.eval_expression(right, env)?;
        match op {
            BinaryOp::Add => match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::string(format!("{}{}", lhs.render(), rhs.render())))
                }
                _ => Err(RuntimeError::TypeMismatch {
                    message: format!(
                        "cannot add `{}` and `{}`",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                }),
            },
            BinaryOp::Sub => numeric_op(&lhs, &rhs, "-", |a, b| a - b),
            BinaryOp::Mul => numeric_op(&lhs, &rhs, "*", |a, b| a * b),
            BinaryOp::Div => numeric_op(&lhs, &rhs, "/", |a, b| a / b),
            BinaryOp::Rem => numeric_op(&lhs, &rhs, "%", |a, b| a % b),
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
            BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ordering = match (&lhs, &rhs) {
                    (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    _ => {
                        return Err(RuntimeError::TypeMismatch {
                            message: format!(
                                "cannot order `{}` against `{}`",
                                lhs.type_name(),
                                rhs.type_name()
                            ),
                        })
                    }
                };
                let result = match (op, ordering) {
                    (_, None) => false, // NaN comparisons
                    (BinaryOp::Lt, Some(ord)) => ord.is_lt(),
                    (BinaryOp::LtEq, Some(ord)) => ord.is_le(),
                    (BinaryOp::Gt, Some(ord)) => ord.is_gt(),
                    (_, Some(ord)) => ord.is_ge(),
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    /// Invokes a closure or host function. Parameters bind positionally;
    /// missing arguments bind to null and extras are ignored (arity problems
    /// are the checker's concern, not a runtime trap).
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> RuntimeResult<Value> {
        match callee {
            Value::Closure(closure) => self.call_closure(&closure, args),
            Value::Host(host) => (host.call)(self, args),
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    fn call_closure(&mut self, closure: &ClosureValue, args: Vec<Value>) -> RuntimeResult<Value> {
        let frame = closure.env.child();
        let mut args = args.into_iter();
        for param in &closure.decl.params {
            frame.declare(&param.name, args.next().unwrap_or(Value::Null));
        }
        for stmt in &closure.decl.body.statements {
            match self.exec_statement(stmt, &frame)? {
                Flow::Normal => {}
                Flow::Return(value) => return Ok(value),
                // A stray break/continue is absorbed at the call boundary.
                Flow::Break | Flow::Continue => break,
            }
        }
        Ok(Value::Null)
    }

    fn print_line(&mut self, line: String) {
        match &mut self.output {
            OutputSink::Stdout => println!("{line}"),
            OutputSink::Capture(lines) => lines.push(line),
        }
    }

    /// xorshift64* generator backing the `random` host module.
    pub(crate) fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
        (bits >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn initial_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E37_79B9_7F4A_7C15)
        | 1
}

fn numeric_op(lhs: &Value, rhs: &Value, symbol: &str, op: fn(f64, f64) -> f64) -> RuntimeResult<Value> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(*a, *b))),
        _ => Err(RuntimeError::TypeMismatch {
            message: format!(
                "cannot apply `{symbol}` to `{}` and `{}`",
                lhs.type_name(),
                rhs.type_name()
            ),
        }),
    }
}

fn array_index(index: &Value, len: usize) -> RuntimeResult<usize> {
    match index {
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => {
            let i = *n as i64;
            if i < 0 || i as usize >= len {
                Err(RuntimeError::IndexOutOfRange { index: i, len })
            } else {
                Ok(i as usize)
            }
        }
        Value::Number(_) => Err(RuntimeError::TypeMismatch {
            message: "index must be an integer".to_string(),
        }),
        other => Err(RuntimeError::TypeMismatch {
            message: format!("index must be a number, got `{}`", other.type_name()),
        }),
    }
}

fn describe_expr(expr: &Expr) -> &'static str {
    match expr {
        Expr::Literal(_) => "literal",
        Expr::Identifier(_) => "identifier",
        Expr::ArrayLiteral(..) => "array literal",
        Expr::ObjectLiteral { .. } => "object literal",
        Expr::Function(_) => "function literal",
        Expr::Unary { .. } => "unary expression",
        Expr::Binary { .. } => "binary expression",
        Expr::Ternary { .. } => "ternary expression",
        Expr::Call { .. } => "call",
        Expr::FieldAccess { .. } => "property access",
        Expr::Index { .. } => "index expression",
    }
}
