mod adapter;
mod dialect;
mod postgres;
mod regex_op;
mod rendering;
mod standard;

pub mod explain;
pub mod expr;
pub mod tree;

pub use adapter::*;
pub use dialect::*;
pub use postgres::*;
pub use regex_op::*;
pub use rendering::Render;
pub use standard::*;

/// Looks up a built-in dialect by name.
pub fn dialect_by_name(name: &str) -> Option<Box<dyn Dialect>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "standard" | "mysql" | "sqlite" | "default" => Some(Box::new(Standard)),
        "postgres" | "postgresql" | "pg" => Some(Box::new(Postgres)),
        _ => None,
    }
}
