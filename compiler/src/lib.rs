mod adapter;
#[cfg(feature = "batch")]
pub mod batch;
mod cache;
mod compiler;
pub mod document;
mod errors;
mod metrics;
mod options;
mod plugin;
mod policy;
pub mod sql;
mod tests;
mod utils;

pub use adapter::*;
pub use cache::QueryCache;
pub use compiler::*;
pub use errors::{Error, PluginError, Result, Stage};
pub use metrics::{Metrics, MetricsSnapshot};
pub use options::*;
pub use plugin::*;
pub use policy::{FieldPolicy, NamingStrategy};
pub use qfilter_parser as parser;
pub use qfilter_parser::{
    ast::{Document, Expr, Page, Preloads, SortDirection, SortEntry, Value},
    ParseError, RepairError,
};
pub use utils::flex_eq;
