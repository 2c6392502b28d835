//! Store adapter boundary
//!
//! - `store`: the primitive operations every backing store provides
//! - `keycode`: order-preserving primary key encoding
//! - `memory`: in-process reference store

pub mod keycode;
pub mod memory;
pub mod store;
