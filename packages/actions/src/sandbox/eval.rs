//! Tree-walking evaluator over `serde_json::Value`

use super::ast::*;
use super::error::{ScriptError, ScriptResult};
use super::lexer::TokenSpan;
use super::{Capabilities, ConsoleLevel};
use crate::compare::{is_truthy, loose_cmp, loose_eq, to_number};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

const CAPABILITIES: [&str; 5] = ["state", "visibility", "events", "console", "context"];

/// Deepest array/object nesting a script may build; matches serde_json's
/// own recursion limit so script values always round-trip
pub(crate) const MAX_VALUE_DEPTH: usize = 128;

/// Longest string concatenation may produce, in bytes
pub(crate) const MAX_STRING_LEN: usize = 1 << 20;

struct Binding {
    value: Value,
    mutable: bool,
}

enum Flow {
    Normal,
    Return(Value),
}

enum PathSegment {
    Key(String),
    Index(usize),
}

/// Step budget shared by statements, loop iterations, array padding and
/// copies of nested values
struct Fuel {
    remaining: u64,
    limit: u64,
}

impl Fuel {
    fn burn(&mut self, units: u64) -> ScriptResult<()> {
        if units > self.remaining {
            self.remaining = 0;
            return Err(ScriptError::FuelExhausted(self.limit));
        }
        self.remaining -= units;
        Ok(())
    }
}

pub(crate) struct Evaluator<'a> {
    caps: Capabilities<'a>,
    scopes: Vec<HashMap<String, Binding>>,
    fuel: Fuel,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(caps: Capabilities<'a>, fuel: u64) -> Self {
        Self {
            caps,
            scopes: vec![HashMap::new()],
            fuel: Fuel {
                remaining: fuel,
                limit: fuel,
            },
        }
    }

    /// Run a script; the result is the value of a top-level `return`, or null
    pub(crate) fn run(&mut self, script: &Script) -> ScriptResult<Value> {
        for stmt in &script.body {
            if let Flow::Return(value) = self.exec(stmt)? {
                return Ok(value);
            }
        }
        Ok(Value::Null)
    }

    fn tick(&mut self) -> ScriptResult<()> {
        self.fuel.burn(1)
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn exec(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        self.tick()?;

        match stmt {
            Stmt::Let {
                name,
                mutable,
                init,
                span,
            } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                self.declare(name, value, *mutable, *span)?;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.eval(condition)?) {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while is_truthy(&self.eval(condition)?) {
                    self.tick()?;
                    if let Flow::Return(value) = self.exec_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Throw(expr) => Err(ScriptError::Thrown(self.eval(expr)?)),
            Stmt::Block(body) => self.exec_block(body),
        }
    }

    fn exec_block(&mut self, body: &[Stmt]) -> ScriptResult<Flow> {
        self.scopes.push(HashMap::new());
        let mut flow = Ok(Flow::Normal);
        for stmt in body {
            match self.exec(stmt) {
                Ok(Flow::Normal) => continue,
                other => {
                    flow = other;
                    break;
                }
            }
        }
        self.scopes.pop();
        flow
    }

    fn declare(&mut self, name: &str, value: Value, mutable: bool, span: TokenSpan) -> ScriptResult<()> {
        let Some(scope) = self.scopes.last_mut() else {
            return Err(ScriptError::runtime(span, "No scope to declare in"));
        };
        if scope.contains_key(name) {
            return Err(ScriptError::runtime(
                span,
                format!("Identifier '{}' has already been declared", name),
            ));
        }
        scope.insert(name.to_string(), Binding { value, mutable });
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Capability named by `expr`, unless a local binding shadows it
    fn capability<'e>(&self, expr: &'e Expr) -> Option<&'e str> {
        match &expr.kind {
            ExprKind::Ident(name) if CAPABILITIES.contains(&name.as_str()) && self.lookup(name).is_none() => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> ScriptResult<Value> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Ident(name) => self.eval_ident(name, expr.span),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(nest_within(self.eval(item)?, 1, expr.span)?);
                }
                Ok(Value::Array(values))
            }
            ExprKind::Object(props) => {
                let mut map = Map::new();
                for (key, value) in props {
                    let value = nest_within(self.eval(value)?, 1, expr.span)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            ExprKind::Member { object, property } => {
                if let Some(cap) = self.capability(object) {
                    return self.capability_property(cap, property, expr.span);
                }
                let target = self.eval(object)?;
                read_property(&target, property, expr.span)
            }
            ExprKind::Index { object, index } => {
                let target = self.eval(object)?;
                let index = self.eval(index)?;
                read_index(&target, &index, expr.span)
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.span),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!is_truthy(&value)),
                    UnaryOp::Neg => to_number(&value).map(|n| number(-n)).unwrap_or(Value::Null),
                })
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                match binary(*op, &left, &right) {
                    Value::String(s) if s.len() > MAX_STRING_LEN => {
                        Err(ScriptError::runtime(expr.span, "Invalid string length"))
                    }
                    value => Ok(value),
                }
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, is_truthy(&left)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            ExprKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value.clone())?;
                Ok(value)
            }
        }
    }

    fn eval_ident(&mut self, name: &str, span: TokenSpan) -> ScriptResult<Value> {
        if let Some(binding) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            // Reading a variable copies it; nested values pay per element
            self.fuel.burn(nested_size(&binding.value, self.fuel.remaining.saturating_add(1)))?;
            return Ok(binding.value.clone());
        }
        match name {
            "context" => serde_json::to_value(&*self.caps.context)
                .map_err(|e| ScriptError::runtime(span, e.to_string())),
            _ if CAPABILITIES.contains(&name) => Err(ScriptError::runtime(
                span,
                format!("'{}' can only be used through its methods", name),
            )),
            _ => Err(ScriptError::runtime(span, format!("{} is not defined", name))),
        }
    }

    fn capability_property(&self, cap: &str, property: &str, span: TokenSpan) -> ScriptResult<Value> {
        let context = &*self.caps.context;
        match (cap, property) {
            ("context", "pageId") => Ok(Value::String(context.page_id.clone())),
            ("context", "widgetId") => Ok(context.widget_id.clone().map(Value::String).unwrap_or(Value::Null)),
            ("context", "triggerData") => Ok(context.trigger_data.clone().unwrap_or(Value::Null)),
            ("context", "state") => Ok(Value::Object(context.state.clone())),
            ("context", _) => Ok(Value::Null),
            _ => Err(ScriptError::runtime(
                span,
                format!("{}.{} is not a readable property", cap, property),
            )),
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], span: TokenSpan) -> ScriptResult<Value> {
        let ExprKind::Member { object, property } = &callee.kind else {
            return Err(ScriptError::runtime(
                callee.span,
                format!("{} is not a function", describe(callee)),
            ));
        };

        let cap = self.capability(object).map(str::to_string);
        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<ScriptResult<Vec<_>>>()?;

        match cap {
            Some(cap) => self.call_capability(&cap, property, args, span),
            None => {
                let receiver = self.eval(object)?;
                call_method(&receiver, property, &args, span)
            }
        }
    }

    fn call_capability(&mut self, cap: &str, method: &str, args: Vec<Value>, span: TokenSpan) -> ScriptResult<Value> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);

        match (cap, method) {
            ("state", "get") => Ok(self.caps.state.get(&key_arg(arg(0))).unwrap_or(Value::Null)),
            ("state", "set") => {
                self.caps.state.set(key_arg(arg(0)), arg(1));
                Ok(Value::Null)
            }
            ("state", "delete") => Ok(Value::Bool(self.caps.state.remove(&key_arg(arg(0))).is_some())),
            ("state", "has") => Ok(Value::Bool(self.caps.state.contains(&key_arg(arg(0))))),

            ("visibility", "show") => {
                self.caps.visibility.show(&key_arg(arg(0)));
                Ok(Value::Null)
            }
            ("visibility", "hide") => {
                self.caps.visibility.hide(&key_arg(arg(0)));
                Ok(Value::Null)
            }
            ("visibility", "toggle") => {
                self.caps.visibility.toggle(&key_arg(arg(0)));
                Ok(Value::Null)
            }
            ("visibility", "isVisible") => {
                let id = key_arg(arg(0));
                let default_value = match arg(1) {
                    Value::Null => true,
                    other => is_truthy(&other),
                };
                Ok(Value::Bool(self.caps.visibility.is_visible(&id, default_value)))
            }

            ("events", "emit") => {
                self.caps.events.emit(&key_arg(arg(0)), arg(1));
                Ok(Value::Null)
            }

            ("console", "log" | "info" | "warn" | "error") => {
                let level = match method {
                    "info" => ConsoleLevel::Info,
                    "warn" => ConsoleLevel::Warn,
                    "error" => ConsoleLevel::Error,
                    _ => ConsoleLevel::Log,
                };
                let line = args.iter().map(display).collect::<Vec<_>>().join(" ");
                self.caps.console.write(level, &line);
                Ok(Value::Null)
            }

            ("context", "get") => Ok(self
                .caps
                .context
                .state
                .get(&key_arg(arg(0)))
                .cloned()
                .unwrap_or(Value::Null)),
            ("context", "set") => {
                self.caps.context.state.insert(key_arg(arg(0)), arg(1));
                Ok(Value::Null)
            }

            _ => Err(ScriptError::runtime(span, format!("{}.{} is not a function", cap, method))),
        }
    }

    fn assign(&mut self, target: &Expr, value: Value) -> ScriptResult<()> {
        let mut path = Vec::new();
        let mut cursor = target;
        loop {
            match &cursor.kind {
                ExprKind::Ident(_) => break,
                ExprKind::Member { object, property } => {
                    path.push(PathSegment::Key(property.clone()));
                    cursor = object;
                }
                ExprKind::Index { object, index } => {
                    let index = self.eval(index)?;
                    path.push(match index.as_u64().and_then(|i| usize::try_from(i).ok()) {
                        Some(i) => PathSegment::Index(i),
                        None => PathSegment::Key(display(&index)),
                    });
                    cursor = object;
                }
                _ => return Err(ScriptError::runtime(target.span, "Invalid assignment target")),
            }
        }
        path.reverse();

        let ExprKind::Ident(name) = &cursor.kind else {
            return Err(ScriptError::runtime(target.span, "Invalid assignment target"));
        };

        let is_capability = CAPABILITIES.contains(&name.as_str());
        let Some(binding) = self.scopes.iter_mut().rev().find_map(|scope| scope.get_mut(name)) else {
            let message = if is_capability {
                format!("Cannot assign to '{}'", name)
            } else {
                format!("{} is not defined", name)
            };
            return Err(ScriptError::runtime(cursor.span, message));
        };

        if path.is_empty() {
            if !binding.mutable {
                return Err(ScriptError::runtime(
                    target.span,
                    format!("Assignment to constant variable '{}'", name),
                ));
            }
            binding.value = value;
            return Ok(());
        }

        let value = nest_within(value, path.len(), target.span)?;
        write_path(&mut binding.value, &path, value, target.span, &mut self.fuel)
    }
}

/// Reject `value` if placing it `levels` deep would pass [`MAX_VALUE_DEPTH`]
/// Elements held inside `value`'s arrays and objects, counted up to `cap`
fn nested_size(value: &Value, cap: u64) -> u64 {
    let mut total = 0u64;
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => {
                total = total.saturating_add(items.len() as u64);
                pending.extend(items);
            }
            Value::Object(map) => {
                total = total.saturating_add(map.len() as u64);
                pending.extend(map.values());
            }
            _ => {}
        }
        if total >= cap {
            return cap;
        }
    }
    total
}

fn nest_within(value: Value, levels: usize, span: TokenSpan) -> ScriptResult<Value> {
    fn exceeds(value: &Value, budget: usize) -> bool {
        match value {
            Value::Array(items) => budget == 0 || items.iter().any(|item| exceeds(item, budget - 1)),
            Value::Object(map) => budget == 0 || map.values().any(|item| exceeds(item, budget - 1)),
            _ => false,
        }
    }

    match MAX_VALUE_DEPTH.checked_sub(levels) {
        Some(budget) if !exceeds(&value, budget) => Ok(value),
        _ => Err(ScriptError::runtime(span, "Value nested too deeply")),
    }
}

fn write_path(
    root: &mut Value,
    path: &[PathSegment],
    value: Value,
    span: TokenSpan,
    fuel: &mut Fuel,
) -> ScriptResult<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut slot = root;
    for segment in parents {
        slot = match (slot, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map
                .get_mut(key)
                .ok_or_else(|| ScriptError::runtime(span, format!("Cannot set properties of undefined (reading '{}')", key)))?,
            (Value::Array(items), PathSegment::Index(i)) => items
                .get_mut(*i)
                .ok_or_else(|| ScriptError::runtime(span, format!("Index {} is out of bounds", i)))?,
            _ => return Err(ScriptError::runtime(span, "Cannot set properties of a non-object")),
        };
    }

    match (slot, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value);
        }
        (Value::Object(map), PathSegment::Index(i)) => {
            map.insert(i.to_string(), value);
        }
        (Value::Array(items), PathSegment::Index(i)) => {
            if *i >= items.len() {
                // Every padded hole costs a step
                fuel.burn((*i - items.len()) as u64)?;
                items.resize(*i + 1, Value::Null);
            }
            items[*i] = value;
        }
        _ => return Err(ScriptError::runtime(span, "Cannot set properties of a non-object")),
    }
    Ok(())
}

fn key_arg(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => display(&other),
    }
}

fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Member { object, property } => format!("{}.{}", describe(object), property),
        _ => "expression".to_string(),
    }
}

fn read_property(target: &Value, property: &str, span: TokenSpan) -> ScriptResult<Value> {
    match (target, property) {
        (Value::Null, _) => Err(ScriptError::runtime(
            span,
            format!("Cannot read properties of null (reading '{}')", property),
        )),
        (Value::Array(items), "length") => Ok(Value::from(items.len())),
        (Value::String(s), "length") => Ok(Value::from(s.chars().count())),
        (Value::Object(map), _) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        _ => Ok(Value::Null),
    }
}

fn read_index(target: &Value, index: &Value, span: TokenSpan) -> ScriptResult<Value> {
    let position = index.as_u64().map(|i| i as usize);
    match target {
        Value::Null => Err(ScriptError::runtime(
            span,
            format!("Cannot read properties of null (reading '{}')", display(index)),
        )),
        Value::Array(items) => Ok(position.and_then(|i| items.get(i)).cloned().unwrap_or(Value::Null)),
        Value::String(s) => Ok(position
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null)),
        Value::Object(map) => Ok(map.get(&key_arg(index.clone())).cloned().unwrap_or(Value::Null)),
        _ => Ok(Value::Null),
    }
}

fn call_method(receiver: &Value, method: &str, args: &[Value], span: TokenSpan) -> ScriptResult<Value> {
    let arg = args.first().cloned().unwrap_or(Value::Null);
    match (receiver, method) {
        (_, "toString") => Ok(Value::String(display(receiver))),
        (Value::String(s), "includes") => Ok(Value::Bool(s.contains(&key_arg(arg)))),
        (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
        (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
        (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
        (Value::Array(items), "includes") => Ok(Value::Bool(items.iter().any(|item| loose_eq(Some(item), Some(&arg))))),
        (Value::Array(items), "join") => {
            let separator = match arg {
                Value::Null => ",".to_string(),
                other => key_arg(other),
            };
            Ok(Value::String(items.iter().map(display).collect::<Vec<_>>().join(&separator)))
        }
        _ => Err(ScriptError::runtime(span, format!("{} is not a function", method))),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Eq => Value::Bool(loose_eq(Some(left), Some(right))),
        BinaryOp::NotEq => Value::Bool(!loose_eq(Some(left), Some(right))),
        BinaryOp::Lt => Value::Bool(loose_cmp(Some(left), Some(right)) == Some(Ordering::Less)),
        BinaryOp::Lte => Value::Bool(matches!(
            loose_cmp(Some(left), Some(right)),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(loose_cmp(Some(left), Some(right)) == Some(Ordering::Greater)),
        BinaryOp::Gte => Value::Bool(matches!(
            loose_cmp(Some(left), Some(right)),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Add if concatenates(left) || concatenates(right) => {
            Value::String(format!("{}{}", display(left), display(right)))
        }
        _ => {
            let (Some(a), Some(b)) = (to_number(left), to_number(right)) else {
                return Value::Null;
            };
            number(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            })
        }
    }
}

fn concatenates(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

/// Whole numbers become integers; non-finite results become null
fn number(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// String form used by concatenation, keys and console output.
/// Arrays and objects render as JSON.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arithmetic_keeps_integers() {
        assert_eq!(binary(BinaryOp::Add, &json!(1), &json!(2)), json!(3));
        assert_eq!(binary(BinaryOp::Div, &json!(7), &json!(2)), json!(3.5));
        assert_eq!(binary(BinaryOp::Div, &json!(1), &json!(0)), Value::Null);
        assert_eq!(binary(BinaryOp::Rem, &json!(7), &json!(4)), json!(3));
    }

    #[test]
    fn test_plus_concatenates_strings() {
        assert_eq!(binary(BinaryOp::Add, &json!("n="), &json!(2)), json!("n=2"));
        assert_eq!(binary(BinaryOp::Add, &json!(1.0), &json!("x")), json!("1x"));
    }

    #[test]
    fn test_display() {
        assert_eq!(display(&json!(null)), "null");
        assert_eq!(display(&json!(2.0)), "2");
        assert_eq!(display(&json!({ "a": 1 })), r#"{"a":1}"#);
    }

    #[test]
    fn test_write_path_extends_arrays() {
        let mut root = json!({ "items": [1] });
        let mut fuel = Fuel { remaining: 10, limit: 10 };
        write_path(
            &mut root,
            &[PathSegment::Key("items".to_string()), PathSegment::Index(2)],
            json!(3),
            TokenSpan::default(),
            &mut fuel,
        )
        .unwrap();
        assert_eq!(root, json!({ "items": [1, null, 3] }));
        assert_eq!(fuel.remaining, 9);
    }

    #[test]
    fn test_padding_past_the_budget_is_refused() {
        let mut root = json!([]);
        let mut fuel = Fuel { remaining: 100, limit: 100 };
        let result = write_path(
            &mut root,
            &[PathSegment::Index(1_000_000)],
            json!(1),
            TokenSpan::default(),
            &mut fuel,
        );
        assert_eq!(result, Err(ScriptError::FuelExhausted(100)));
        assert_eq!(root, json!([]));
    }

    #[test]
    fn test_nested_size_stops_at_the_cap() {
        assert_eq!(nested_size(&json!(42), 10), 0);
        assert_eq!(nested_size(&json!([1, [2, 3], { "a": 4 }]), 100), 6);
        assert_eq!(nested_size(&json!([1, 2, 3, 4, 5]), 3), 3);
    }

    #[test]
    fn test_nest_within() {
        let mut deep = json!(1);
        for _ in 0..MAX_VALUE_DEPTH {
            deep = json!([deep]);
        }
        assert!(nest_within(deep.clone(), 0, TokenSpan::default()).is_ok());
        assert!(nest_within(deep, 1, TokenSpan::default()).is_err());
        assert!(nest_within(json!("flat"), MAX_VALUE_DEPTH, TokenSpan::default()).is_ok());
    }
}
