pub mod result;

pub use result::{FromRow, Results};
