pub mod datum;
pub mod error;
pub mod result;
pub mod row;

pub use datum::*;
pub use error::*;
pub use result::*;
pub use row::*;
