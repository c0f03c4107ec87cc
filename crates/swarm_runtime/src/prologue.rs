//! The prologue: built-in bindings installed into the root scope.
//!
//! Each binding is a host function with a declared Swarm type, so the
//! analyses check prologue calls like any other call. Prologue symbols are
//! flagged `is_prologue` and are never persisted to a value store; a worker
//! resolves them against its own registry by name.

use std::collections::HashMap;

use swarm_base::{Position, SwarmError};
use swarm_lang::symbol::Symbol;
use swarm_lang::types::Type;

use crate::interpreter::Interpreter;
use crate::value::{Resource, Value};

pub type Handler = fn(&mut Interpreter, &Position, Vec<Value>) -> Result<Value, SwarmError>;

pub struct PrologueFunction {
    pub symbol: Symbol,
    pub arity: usize,
    pub handler: Handler,
}

/// Registry of host bindings, keyed by name.
pub struct Prologue {
    functions: HashMap<String, PrologueFunction>,
}

impl Prologue {
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// The standard bindings.
    pub fn standard() -> Self {
        let mut prologue = Self::empty();
        prologue.install(
            "log",
            Type::lambda(Type::STRING, Type::VOID),
            1,
            builtins::log,
        );
        prologue.install(
            "numberToString",
            Type::lambda(Type::NUMBER, Type::STRING),
            1,
            builtins::number_to_string,
        );
        prologue.install(
            "booleanToString",
            Type::lambda(Type::BOOLEAN, Type::STRING),
            1,
            builtins::boolean_to_string,
        );
        prologue.install(
            "range",
            Type::lambda_of(
                &[Type::NUMBER, Type::NUMBER, Type::NUMBER],
                Type::enumerable(Type::NUMBER),
            ),
            3,
            builtins::range,
        );
        prologue.install(
            "fileContents",
            Type::lambda(Type::STRING, Type::STRING),
            1,
            builtins::file_contents,
        );
        prologue
    }

    fn install(&mut self, name: &str, ty: Type, arity: usize, handler: Handler) {
        self.functions.insert(
            name.to_string(),
            PrologueFunction {
                symbol: Symbol::prologue(name, ty),
                arity,
                handler,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&PrologueFunction> {
        self.functions.get(name)
    }

    /// The symbol records to install into the root scope before name
    /// analysis, sorted by name so scope setup is deterministic.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> =
            self.functions.values().map(|f| f.symbol.clone()).collect();
        symbols.sort_by(|a, b| a.name.cmp(&b.name));
        symbols
    }
}

mod builtins {
    use super::*;

    fn expect_string(value: &Value, pos: &Position, what: &str) -> Result<String, SwarmError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(SwarmError::runtime(
                pos.clone(),
                format!("{what} must be a string, found {}", other.type_name()),
            )),
        }
    }

    fn expect_number(value: &Value, pos: &Position, what: &str) -> Result<f64, SwarmError> {
        match value {
            Value::Number(n) => Ok(*n),
            other => Err(SwarmError::runtime(
                pos.clone(),
                format!("{what} must be a number, found {}", other.type_name()),
            )),
        }
    }

    pub fn log(
        interpreter: &mut Interpreter,
        pos: &Position,
        args: Vec<Value>,
    ) -> Result<Value, SwarmError> {
        let line = expect_string(&args[0], pos, "log argument")?;
        println!("{line}");
        interpreter.output.push(line);
        Ok(Value::Unit)
    }

    pub fn number_to_string(
        _interpreter: &mut Interpreter,
        pos: &Position,
        args: Vec<Value>,
    ) -> Result<Value, SwarmError> {
        let n = expect_number(&args[0], pos, "numberToString argument")?;
        Ok(Value::Str(Value::Number(n).to_string()))
    }

    pub fn boolean_to_string(
        _interpreter: &mut Interpreter,
        pos: &Position,
        args: Vec<Value>,
    ) -> Result<Value, SwarmError> {
        match &args[0] {
            Value::Boolean(b) => Ok(Value::Str(b.to_string())),
            other => Err(SwarmError::runtime(
                pos.clone(),
                format!(
                    "booleanToString argument must be a boolean, found {}",
                    other.type_name()
                ),
            )),
        }
    }

    pub fn range(
        _interpreter: &mut Interpreter,
        pos: &Position,
        args: Vec<Value>,
    ) -> Result<Value, SwarmError> {
        let start = expect_number(&args[0], pos, "range start")?;
        let end = expect_number(&args[1], pos, "range end")?;
        let step = expect_number(&args[2], pos, "range step")?;
        if step <= 0.0 {
            return Err(SwarmError::runtime(pos.clone(), "range step must be positive"));
        }
        let mut items = Vec::new();
        let mut current = start;
        while current <= end {
            items.push(Value::Number(current));
            current += step;
        }
        Ok(Value::Enumeration(items))
    }

    pub fn file_contents(
        _interpreter: &mut Interpreter,
        pos: &Position,
        args: Vec<Value>,
    ) -> Result<Value, SwarmError> {
        let path = expect_string(&args[0], pos, "fileContents path")?;
        Ok(Value::Resource(Resource::FileContents { path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_prologue_declares_flagged_symbols() {
        let prologue = Prologue::standard();
        let symbols = prologue.symbols();
        assert!(symbols.iter().all(|s| s.is_prologue));
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["booleanToString", "fileContents", "log", "numberToString", "range"]
        );
    }

    #[test]
    fn range_symbol_is_fully_curried() {
        let prologue = Prologue::standard();
        let range = prologue.get("range").unwrap();
        assert_eq!(range.arity, 3);
        assert_eq!(
            range.symbol.ty,
            Type::lambda(
                Type::NUMBER,
                Type::lambda(
                    Type::NUMBER,
                    Type::lambda(Type::NUMBER, Type::enumerable(Type::NUMBER))
                )
            )
        );
    }
}
