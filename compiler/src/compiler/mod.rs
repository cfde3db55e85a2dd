mod compiler;
mod constants;

pub use compiler::Compiler;
pub use constants::*;
