//! The opaque configuration tree, its parser, and the generic
//! symbol-table / option-resolution machinery built on top of it.
//!
//! Nothing in this crate knows what a "zone" or an "acl" is - that
//! interpretation belongs to `isccfg`. This crate only turns text into a
//! tree and provides the two generic tools (a define-reject-if-exists
//! symbol table, and a stack-walking option resolver) that the validator
//! and assembler both need regardless of which clause they're looking at.

pub mod lexer;
pub mod options;
pub mod parser;
pub mod symtab;
pub mod token;

pub use options::OptionResolver;
pub use parser::{parse, ParseError};
pub use symtab::{Definition, SymbolTable};
pub use token::{find_all, find_one, ConfigTree, Entry, IpPrefix, Location, Token};
