use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    interpreter::Interpreter,
    value::{format_number, escape_string, ObjectMap, Value},
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Signature of a host-provided standard-library member. Host functions get
/// the interpreter back so modules like `functional` can invoke script
/// closures; the call is synchronous and yields exactly one value.
pub type NativeFn = fn(&mut Interpreter, Vec<Value>) -> RuntimeResult<Value>;

#[derive(Clone, Copy)]
pub struct HostFunction {
    pub module: &'static str,
    pub name: &'static str,
    pub call: NativeFn,
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunction({}.{})", self.module, self.name)
    }
}

/// Resolves `import <name>;` to a namespace object of host functions. The
/// default registry carries the modules the fixture corpus relies on; an
/// embedder can replace or extend modules before running a program.
pub struct HostRegistry {
    modules: HashMap<String, Value>,
}

impl Default for HostRegistry {
    fn default() -> Self {
        let mut registry = Self {
            modules: HashMap::new(),
        };
        registry.install("string", string_module());
        registry.install("collections", collections_module());
        registry.install("math", math_module());
        registry.install("random", random_module());
        registry.install("json", json_module());
        registry.install("datetime", datetime_module());
        registry.install("functional", functional_module());
        registry
    }
}

impl HostRegistry {
    pub fn empty() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    pub fn install(&mut self, name: impl Into<String>, namespace: Value) {
        self.modules.insert(name.into(), namespace);
    }

    pub fn resolve(&self, name: &str) -> Option<Value> {
        self.modules.get(name).cloned()
    }
}

fn namespace(module: &'static str, members: &[(&'static str, NativeFn)]) -> Value {
    let mut map = ObjectMap::new();
    for (name, call) in members {
        map.insert(
            *name,
            Value::Host(HostFunction {
                module,
                name,
                call: *call,
            }),
        );
    }
    Value::object(map)
}

fn host_err(module: &str, name: &str, message: impl Into<String>) -> RuntimeError {
    RuntimeError::HostError {
        module: module.to_string(),
        name: name.to_string(),
        message: message.into(),
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Null)
}

fn number_arg(args: &[Value], index: usize, module: &str, name: &str) -> RuntimeResult<f64> {
    match arg(args, index) {
        Value::Number(n) => Ok(n),
        other => Err(host_err(
            module,
            name,
            format!("argument {} must be a number, got {}", index + 1, other.type_name()),
        )),
    }
}

fn string_arg(args: &[Value], index: usize, module: &str, name: &str) -> RuntimeResult<Rc<str>> {
    match arg(args, index) {
        Value::String(s) => Ok(s),
        other => Err(host_err(
            module,
            name,
            format!("argument {} must be a string, got {}", index + 1, other.type_name()),
        )),
    }
}

fn array_arg(
    args: &[Value],
    index: usize,
    module: &str,
    name: &str,
) -> RuntimeResult<Rc<RefCell<Vec<Value>>>> {
    match arg(args, index) {
        Value::Array(items) => Ok(items),
        other => Err(host_err(
            module,
            name,
            format!("argument {} must be an array, got {}", index + 1, other.type_name()),
        )),
    }
}

fn callable_arg(args: &[Value], index: usize, module: &str, name: &str) -> RuntimeResult<Value> {
    match arg(args, index) {
        value @ (Value::Closure(_) | Value::Host(_)) => Ok(value),
        other => Err(host_err(
            module,
            name,
            format!("argument {} must be a function, got {}", index + 1, other.type_name()),
        )),
    }
}

// --- string ---

fn string_module() -> Value {
    namespace(
        "string",
        &[
            ("upper", string_upper),
            ("lower", string_lower),
            ("contains", string_contains),
            ("toString", string_to_string),
        ],
    )
}

fn string_upper(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let s = string_arg(&args, 0, "string", "upper")?;
    Ok(Value::string(s.to_uppercase()))
}

fn string_lower(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let s = string_arg(&args, 0, "string", "lower")?;
    Ok(Value::string(s.to_lowercase()))
}

fn string_contains(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let haystack = string_arg(&args, 0, "string", "contains")?;
    let needle = string_arg(&args, 1, "string", "contains")?;
    Ok(Value::Bool(haystack.contains(needle.as_ref())))
}

fn string_to_string(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    Ok(Value::string(arg(&args, 0).render()))
}

// --- collections ---

fn collections_module() -> Value {
    namespace(
        "collections",
        &[
            ("length", collections_length),
            ("append", collections_append),
            ("first", collections_first),
            ("slice", collections_slice),
            ("keys", collections_keys),
        ],
    )
}

fn collections_length(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let len = match arg(&args, 0) {
        Value::Array(items) => items.borrow().len(),
        Value::String(s) => s.chars().count(),
        Value::Object(map) => map.borrow().len(),
        other => {
            return Err(host_err(
                "collections",
                "length",
                format!("expected an array, string or object, got {}", other.type_name()),
            ))
        }
    };
    Ok(Value::Number(len as f64))
}

fn collections_append(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let items = array_arg(&args, 0, "collections", "append")?;
    items.borrow_mut().push(arg(&args, 1));
    Ok(Value::Array(items))
}

fn collections_first(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let items = array_arg(&args, 0, "collections", "first")?;
    let first = items.borrow().first().cloned();
    Ok(first.unwrap_or(Value::Null))
}

fn collections_slice(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let start = number_arg(&args, 1, "collections", "slice")?.max(0.0) as usize;
    match arg(&args, 0) {
        Value::Array(items) => {
            let items = items.borrow();
            let end = match args.get(2) {
                Some(Value::Number(n)) => (*n).max(0.0) as usize,
                _ => items.len(),
            };
            let end = end.min(items.len());
            let start = start.min(end);
            Ok(Value::array(items[start..end].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let end = match args.get(2) {
                Some(Value::Number(n)) => (*n).max(0.0) as usize,
                _ => chars.len(),
            };
            let end = end.min(chars.len());
            let start = start.min(end);
            Ok(Value::string(chars[start..end].iter().collect::<String>()))
        }
        other => Err(host_err(
            "collections",
            "slice",
            format!("expected an array or string, got {}", other.type_name()),
        )),
    }
}

fn collections_keys(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    match arg(&args, 0) {
        Value::Object(map) => {
            let keys = map.borrow().keys().into_iter().map(Value::string).collect();
            Ok(Value::array(keys))
        }
        other => Err(host_err(
            "collections",
            "keys",
            format!("expected an object, got {}", other.type_name()),
        )),
    }
}

// --- math ---

fn math_module() -> Value {
    namespace(
        "math",
        &[
            ("pi", math_pi),
            ("e", math_e),
            ("sqrt", math_sqrt),
            ("pow", math_pow),
        ],
    )
}

fn math_pi(_: &mut Interpreter, _: Vec<Value>) -> RuntimeResult<Value> {
    Ok(Value::Number(std::f64::consts::PI))
}

fn math_e(_: &mut Interpreter, _: Vec<Value>) -> RuntimeResult<Value> {
    Ok(Value::Number(std::f64::consts::E))
}

fn math_sqrt(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let n = number_arg(&args, 0, "math", "sqrt")?;
    Ok(Value::Number(n.sqrt()))
}

fn math_pow(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let base = number_arg(&args, 0, "math", "pow")?;
    let exp = number_arg(&args, 1, "math", "pow")?;
    Ok(Value::Number(base.powf(exp)))
}

// --- random ---

fn random_module() -> Value {
    namespace(
        "random",
        &[("random", random_random), ("choice", random_choice)],
    )
}

fn random_random(interp: &mut Interpreter, _: Vec<Value>) -> RuntimeResult<Value> {
    Ok(Value::Number(interp.next_random()))
}

fn random_choice(interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let items = array_arg(&args, 0, "random", "choice")?;
    let items = items.borrow();
    if items.is_empty() {
        return Err(host_err("random", "choice", "cannot choose from an empty array"));
    }
    let index = (interp.next_random() * items.len() as f64) as usize;
    Ok(items[index.min(items.len() - 1)].clone())
}

// --- json ---

fn json_module() -> Value {
    namespace("json", &[("dumps", json_dumps)])
}

fn json_dumps(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let rendered = json_render(&arg(&args, 0), &mut Vec::new())?;
    Ok(Value::string(rendered))
}

/// `seen` holds the containers on the current path; JSON has no notation for
/// a cycle, so re-entering one is an error.
fn json_render(value: &Value, seen: &mut Vec<*const ()>) -> RuntimeResult<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) if n.is_finite() => Ok(format_number(*n)),
        Value::Number(_) => Ok("null".to_string()),
        Value::String(s) => Ok(format!("\"{}\"", escape_string(s))),
        Value::Array(items) => {
            let ptr = Rc::as_ptr(items) as *const ();
            if seen.contains(&ptr) {
                return Err(host_err(
                    "json",
                    "dumps",
                    "circular structures are not serializable",
                ));
            }
            seen.push(ptr);
            let mut rendered = Vec::new();
            for item in items.borrow().iter() {
                rendered.push(json_render(item, seen)?);
            }
            seen.pop();
            Ok(format!("[{}]", rendered.join(", ")))
        }
        Value::Object(map) => {
            let ptr = Rc::as_ptr(map) as *const ();
            if seen.contains(&ptr) {
                return Err(host_err(
                    "json",
                    "dumps",
                    "circular structures are not serializable",
                ));
            }
            seen.push(ptr);
            let mut rendered = Vec::new();
            for (key, value) in map.borrow().iter() {
                rendered.push(format!(
                    "\"{}\": {}",
                    escape_string(key),
                    json_render(value, seen)?
                ));
            }
            seen.pop();
            Ok(format!("{{{}}}", rendered.join(", ")))
        }
        Value::Closure(_) | Value::Host(_) => Err(host_err(
            "json",
            "dumps",
            "function values are not serializable",
        )),
    }
}

// --- datetime ---

fn datetime_module() -> Value {
    namespace(
        "datetime",
        &[
            ("createTimestamp", datetime_create_timestamp),
            ("addTimedelta", datetime_add_timedelta),
            ("startOfDay", datetime_start_of_day),
        ],
    )
}

// Days from 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

fn optional_number(args: &[Value], index: usize, default: f64) -> f64 {
    match args.get(index) {
        Some(Value::Number(n)) => *n,
        _ => default,
    }
}

fn datetime_create_timestamp(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let year = number_arg(&args, 0, "datetime", "createTimestamp")? as i64;
    let month = number_arg(&args, 1, "datetime", "createTimestamp")? as i64;
    let day = number_arg(&args, 2, "datetime", "createTimestamp")? as i64;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(host_err(
            "datetime",
            "createTimestamp",
            format!("invalid calendar date {year}-{month}-{day}"),
        ));
    }
    let hours = optional_number(&args, 3, 0.0);
    let minutes = optional_number(&args, 4, 0.0);
    let seconds = optional_number(&args, 5, 0.0);
    let ts = days_from_civil(year, month, day) as f64 * 86_400.0
        + hours * 3_600.0
        + minutes * 60.0
        + seconds;
    Ok(Value::Number(ts))
}

fn datetime_add_timedelta(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let ts = number_arg(&args, 0, "datetime", "addTimedelta")?;
    let days = optional_number(&args, 1, 0.0);
    let hours = optional_number(&args, 2, 0.0);
    let minutes = optional_number(&args, 3, 0.0);
    let seconds = optional_number(&args, 4, 0.0);
    Ok(Value::Number(
        ts + days * 86_400.0 + hours * 3_600.0 + minutes * 60.0 + seconds,
    ))
}

fn datetime_start_of_day(_: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let ts = number_arg(&args, 0, "datetime", "startOfDay")?;
    Ok(Value::Number(ts - ts.rem_euclid(86_400.0)))
}

// --- functional ---

fn functional_module() -> Value {
    namespace(
        "functional",
        &[
            ("map", functional_map),
            ("filter", functional_filter),
            ("reduce", functional_reduce),
        ],
    )
}

fn functional_map(interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let items = array_arg(&args, 0, "functional", "map")?;
    let func = callable_arg(&args, 1, "functional", "map")?;
    // Snapshot the element handles so the callback may mutate the array.
    let snapshot: Vec<Value> = items.borrow().clone();
    let mut mapped = Vec::with_capacity(snapshot.len());
    for item in snapshot {
        mapped.push(interp.call_value(func.clone(), vec![item])?);
    }
    Ok(Value::array(mapped))
}

fn functional_filter(interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let items = array_arg(&args, 0, "functional", "filter")?;
    let func = callable_arg(&args, 1, "functional", "filter")?;
    let snapshot: Vec<Value> = items.borrow().clone();
    let mut kept = Vec::new();
    for item in snapshot {
        if interp.call_value(func.clone(), vec![item.clone()])?.as_bool() {
            kept.push(item);
        }
    }
    Ok(Value::array(kept))
}

fn functional_reduce(interp: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let items = array_arg(&args, 0, "functional", "reduce")?;
    let func = callable_arg(&args, 1, "functional", "reduce")?;
    let snapshot: Vec<Value> = items.borrow().clone();
    let mut iter = snapshot.into_iter();
    let mut acc = match args.get(2) {
        Some(init) => init.clone(),
        None => match iter.next() {
            Some(first) => first,
            None => {
                return Err(host_err(
                    "functional",
                    "reduce",
                    "cannot reduce an empty array without an initial value",
                ))
            }
        },
    };
    for item in iter {
        acc = interp.call_value(func.clone(), vec![acc, item])?;
    }
    Ok(acc)
}
