//! TableSQL - relational-style SQL on top of a wide-column key-value store
//!
//! This crate provides:
//! - SQL parsing of a bounded statement grammar (lexer, parser, canonical AST)
//! - Access-path planning onto point gets, batch gets and range scans
//! - A fallback path that materializes tables into embedded SQLite
//! - A pluggable store adapter with an in-memory reference store

pub mod config;
pub mod error;
pub mod sql;
pub mod storage;
