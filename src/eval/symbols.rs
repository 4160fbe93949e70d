use thiserror::Error;

use super::Value;

/// Fixed number of distinct names the table will hold.
pub const SYMBOL_CAPACITY: usize = 64;

/// Returned by [`SymbolTable::set`] when a new name would exceed the fixed
/// capacity. The table rejects the insert rather than growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("symbol table full")]
pub struct TableFull;

/// Name-to-value bindings consulted by the evaluator. Lookup is a linear scan
/// by exact byte match; no case folding, no scoping, no removal. Names are
/// owned copies because the caller's line buffer is reused on the next read.
pub struct SymbolTable {
    entries: Vec<(String, Value)>,
}

impl SymbolTable {
    /// A table holding only the two built-in constants `e` and `pi`.
    pub fn new() -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(SYMBOL_CAPACITY),
        };
        // seeding two names into an empty table cannot hit the capacity check
        let _ = table.set("e", Value::Real(std::f64::consts::E));
        let _ = table.set("pi", Value::Real(std::f64::consts::PI));
        table
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| *value)
    }

    /// Overwrites the value of an existing entry, or appends a new one.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), TableFull> {
        if let Some(entry) = self.entries.iter_mut().find(|(entry, _)| entry == name) {
            entry.1 = value;
            return Ok(());
        }
        if self.entries.len() == SYMBOL_CAPACITY {
            return Err(TableFull);
        }
        self.entries.push((name.to_string(), value));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
