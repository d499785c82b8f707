pub mod async_inference;
pub mod nodes;
pub mod parser;
pub mod prescan;

pub use nodes::*;
