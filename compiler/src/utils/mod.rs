mod flex_set;

pub use flex_set::*;
