//! Command implementations

pub mod file;
pub mod logs;
pub mod mirror;
pub mod name;
pub mod perm;
pub mod sync;
pub mod user;
