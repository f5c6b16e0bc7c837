//! Interned identifiers

use core::fmt;

use lasso::ThreadedRodeo;

/// Interned identifier
pub type Symbol = lasso::Spur;

/// Thread-safe string interner producing [`Symbol`]s
///
/// Interning the same string twice yields the same symbol, so scope lookups
/// compare integers rather than strings.
pub struct SymbolTable {
    rodeo: ThreadedRodeo,
}

impl SymbolTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Symbol for `name`, interning it on first sight
    pub fn intern(&self, name: &str) -> Symbol {
        self.rodeo.get_or_intern(name)
    }

    /// Symbol for `name` if it was interned before
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.rodeo.get(name)
    }

    /// Text of `symbol`
    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.rodeo.resolve(&symbol)
    }

    /// Number of distinct names interned
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Whether nothing has been interned
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.rodeo.len())
            .finish()
    }
}
