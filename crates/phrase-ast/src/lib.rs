pub mod ast;
pub mod span;
pub mod types;

pub use ast::*;
pub use span::Span;
pub use types::TypeSet;
