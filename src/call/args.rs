// ABOUTME: Argument evaluation — turns parsed literal arguments into JSON values for tools.
// ABOUTME: Only literals evaluate; bare names and nested calls are rejected.

use serde_json::{Map, Number, Value};

use super::parse::{CallExpr, Expr};
use crate::error::EvalError;

/// Evaluated arguments of a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: Map<String, Value>,
}

impl CallArgs {
    pub fn from_call(call: &CallExpr) -> Result<Self, EvalError> {
        let mut args = CallArgs::default();
        for arg in &call.args {
            let value = evaluate(&arg.value)?;
            match &arg.keyword {
                Some(name) => {
                    args.keyword.insert(name.clone(), value);
                }
                None => args.positional.push(value),
            }
        }
        Ok(args)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Look up a parameter by keyword name, falling back to its position.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.keyword.get(name).or_else(|| self.positional.get(index))
    }

    pub fn str(&self, index: usize, name: &str) -> Option<&str> {
        self.get(index, name).and_then(Value::as_str)
    }

    pub fn require_str(&self, index: usize, name: &str) -> anyhow::Result<&str> {
        self.str(index, name)
            .ok_or_else(|| anyhow::anyhow!("missing required string argument `{}`", name))
    }
}

/// Evaluate a literal expression to JSON.
pub fn evaluate(expr: &Expr) -> Result<Value, EvalError> {
    Ok(match expr {
        Expr::Str(s) => Value::String(s.clone()),
        Expr::Int(i) => Value::Number((*i).into()),
        Expr::Float(f) => Value::Number(Number::from_f64(*f).ok_or(EvalError::InvalidNumber(*f))?),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::None => Value::Null,
        Expr::List(items) | Expr::Tuple(items) => {
            Value::Array(items.iter().map(evaluate).collect::<Result<_, _>>()?)
        }
        Expr::Dict(pairs) => {
            let mut map = Map::new();
            for (key, value) in pairs {
                let key = match key {
                    Expr::Str(s) => s.clone(),
                    Expr::Int(i) => i.to_string(),
                    Expr::Float(f) => f.to_string(),
                    Expr::Bool(true) => "True".to_string(),
                    Expr::Bool(false) => "False".to_string(),
                    _ => return Err(EvalError::InvalidKey),
                };
                map.insert(key, evaluate(value)?);
            }
            Value::Object(map)
        }
        Expr::Name(name) => return Err(EvalError::UndefinedName(name.clone())),
        Expr::Call(call) => return Err(EvalError::NestedCall(call.name.clone())),
    })
}
