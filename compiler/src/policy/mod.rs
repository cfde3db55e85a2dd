mod fields;
mod naming;

pub use fields::*;
pub use naming::*;
