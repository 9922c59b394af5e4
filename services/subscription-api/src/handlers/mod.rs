//! REST API handlers

pub mod access;
pub mod health;
pub mod plans;
pub mod shared;
pub mod subscription;
pub mod usage;

pub use access::*;
pub use health::*;
pub use plans::*;
pub use subscription::*;
pub use usage::*;
