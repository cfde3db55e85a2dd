pub mod build;
mod expr;

pub use expr::*;
