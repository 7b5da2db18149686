//! Symbol table with stable insertion order.
//!
//! - labels defined in pass one: code labels at `IC + 100`, data labels at
//!   the pass-one `DC`
//! - data labels are shifted by `IC_final + 100` once pass one completes
//! - `.extern` symbols carry value 0 and are never relocated
//! - `.entry` re-kinds an existing symbol in pass two

use std::collections::HashMap;
use std::fmt;

use crate::image::LOAD_ORIGIN;

/// Classification of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Defined by a label on an instruction line.
    Code,
    /// Defined by a label on a `.data` / `.string` line.
    Data,
    /// Declared by `.extern`; resolved by a later link step.
    External,
    /// Re-kinded by `.entry`; exported in the entries file.
    Entry,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Code => write!(f, "code"),
            SymbolKind::Data => write!(f, "data"),
            SymbolKind::External => write!(f, "external"),
            SymbolKind::Entry => write!(f, "entry"),
        }
    }
}

/// A symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Symbol name.
    pub name: String,
    /// Address value. Final for code symbols at insertion time; data
    /// symbols become final after `relocate_data`.
    pub value: u16,
    /// Symbol classification.
    pub kind: SymbolKind,
}

/// Symbol table error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    #[error("the label '{0}' is defined more than once")]
    Duplicate(String),
    #[error("'.entry' names the undefined symbol '{0}'")]
    UndefinedEntry(String),
    #[error("'.entry' may not name the external symbol '{0}'")]
    ExternalEntry(String),
}

/// The symbol table.
///
/// Iteration follows insertion order so that emission is deterministic.
#[derive(Debug, Default)]
pub struct SymbolTable {
    index: HashMap<String, usize>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new symbol. Redefinition of any name is an error.
    pub fn define(&mut self, name: &str, value: u16, kind: SymbolKind) -> Result<(), SymbolError> {
        if self.index.contains_key(name) {
            return Err(SymbolError::Duplicate(name.to_string()));
        }
        self.index.insert(name.to_string(), self.symbols.len());
        self.symbols.push(Symbol {
            name: name.to_string(),
            value,
            kind,
        });
        Ok(())
    }

    /// Look up a symbol by name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    /// Returns `true` if the name is defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Re-kind a defined, non-external symbol as an entry point.
    pub fn mark_entry(&mut self, name: &str) -> Result<(), SymbolError> {
        let index = *self
            .index
            .get(name)
            .ok_or_else(|| SymbolError::UndefinedEntry(name.to_string()))?;
        let symbol = &mut self.symbols[index];
        if symbol.kind == SymbolKind::External {
            return Err(SymbolError::ExternalEntry(name.to_string()));
        }
        symbol.kind = SymbolKind::Entry;
        Ok(())
    }

    /// Shift every data symbol past the code image: run once after pass one.
    pub fn relocate_data(&mut self, ic_final: u16) {
        for symbol in &mut self.symbols {
            if symbol.kind == SymbolKind::Data {
                symbol.value += ic_final + LOAD_ORIGIN as u16;
            }
        }
    }

    /// Iterate symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Number of symbols defined.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------
