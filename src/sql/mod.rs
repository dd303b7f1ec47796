pub mod builder;
pub mod parser;
pub mod session;

pub use session::Session;
