//! SQL processing module
//!
//! This module provides:
//! - `parser`: SQL lexer and bounded-grammar parser
//! - `types`: value and column types
//! - `schema`: table metadata and key layout
//! - `codec`: store rows to typed records
//! - `idgen`: row identifier assignment
//! - `plan`: access-path planning
//! - `executor`: query and mutation execution
//! - `engine`: sessions and the fallback engine

pub mod codec;
pub mod engine;
pub mod executor;
pub mod idgen;
pub mod parser;
pub mod plan;
pub mod schema;
pub mod types;
