//! # mempool-collections
//!
//! Runtime data structures that take their memory from a
//! [`PoolManager`](mempool::PoolManager):
//! - [`Vector`]: growable array of small `Copy` values with a pooled header
//! - [`Text`]: append-only text buffer stored in pool slots
//! - [`Scope`]: stack of symbol frames with staged global definitions,
//!   keyed by symbols from a [`SymbolTable`]
//!
//! ```rust
//! use mempool::PoolManager;
//! use mempool_collections::{Scope, SymbolTable, Text, Vector};
//!
//! let manager = PoolManager::new(256)?;
//!
//! let mut ids = Vector::new(&manager)?;
//! ids.add(7u32);
//! assert_eq!(ids.find(&7), Some(0));
//!
//! let mut name = Text::new(&manager);
//! name.add("main");
//! assert_eq!(name.as_str(), "main");
//!
//! let symbols = SymbolTable::new();
//! let mut scope = Scope::new(&manager)?;
//! scope.push()?;
//! scope.add(symbols.intern("x"), 1);
//! assert_eq!(scope.lookup1(symbols.intern("x")), Some(&1));
//! # Ok::<(), mempool::MemoryError>(())
//! ```

#![allow(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod scope;
pub mod symbol;
pub mod text;
pub mod vector;

pub use crate::scope::Scope;
pub use crate::symbol::{Symbol, SymbolTable};
pub use crate::text::Text;
pub use crate::vector::{MAP_CAP, Vector};
