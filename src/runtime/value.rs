use crate::language::ast::FunctionDecl;
use crate::runtime::environment::Environment;
use crate::runtime::host::HostFunction;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime value. Arrays, objects and closures have reference semantics:
/// cloning a `Value` clones the `Rc` handle, so every alias observes
/// mutations made through any other alias.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Number(f64),
    Bool(bool),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectMap>>),
    Closure(Rc<ClosureValue>),
    Host(HostFunction),
}

#[derive(Debug)]
pub struct ClosureValue {
    pub decl: Rc<FunctionDecl>,
    /// Frame active when the function literal was evaluated. Lookup through
    /// it is deferred to call time, which is what lets a factory's closure
    /// read an outer binding assigned after the closure was created.
    pub env: Environment,
}

impl Value {
    pub fn string(text: impl Into<String>) -> Value {
        Value::String(Rc::from(text.into()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: ObjectMap) -> Value {
        Value::Object(Rc::new(RefCell::new(map)))
    }

    /// Single truthiness rule: `false`, `null`, `0` and `""` are falsy,
    /// everything else is truthy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Closure(_) | Value::Host(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Closure(_) => "function",
            Value::Host(_) => "function",
        }
    }

    /// Canonical rendering used by `print` and string concatenation.
    /// Strings render verbatim at the top level and quoted inside containers.
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.render_nested(&mut Vec::new()),
        }
    }

    /// `seen` holds the containers on the current path; re-entering one is a
    /// cycle and renders as a placeholder instead of recursing.
    fn render_nested(&self, seen: &mut Vec<*const ()>) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => format!("\"{}\"", escape_string(s)),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if seen.contains(&ptr) {
                    return "[...]".to_string();
                }
                seen.push(ptr);
                let rendered: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|v| v.render_nested(seen))
                    .collect();
                seen.pop();
                format!("[{}]", rendered.join(", "))
            }
            Value::Object(map) => {
                let ptr = Rc::as_ptr(map) as *const ();
                if seen.contains(&ptr) {
                    return "{...}".to_string();
                }
                seen.push(ptr);
                let rendered: Vec<String> = map
                    .borrow()
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.render_nested(seen)))
                    .collect();
                seen.pop();
                format!("{{{}}}", rendered.join(", "))
            }
            Value::Closure(closure) => match &closure.decl.name {
                Some(name) => format!("<fn {name}>"),
                None => "<fn>".to_string(),
            },
            Value::Host(host) => format!("<native fn {}.{}>", host.module, host.name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Scalars compare by value, containers and functions by identity. Values of
/// different kinds are unequal, never an error.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Closure(x), Value::Closure(y)) => Rc::ptr_eq(x, y),
        (Value::Host(x), Value::Host(y)) => std::ptr::fn_addr_eq(x.call, y.call),
        _ => false,
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// String-keyed map with insertion order preserved for iteration. Keys are
/// unique; writing an existing key updates the slot in place.
#[derive(Debug, Default)]
pub struct ObjectMap {
    entries: Vec<(String, Value)>,
}

impl ObjectMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        for (k, v) in self.entries.iter_mut() {
            if *k == key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Own keys in insertion order. This is the enumeration primitive behind
    /// `for (key in obj)` and `collections.keys`.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }
}
