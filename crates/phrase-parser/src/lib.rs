pub mod diagnostics;
pub mod expr;
mod interpolation;
pub mod parser;
pub mod precedence;
pub mod scopes;
pub mod stmt;

use diagnostics::ParseError;
use phrase_ast::Program;

pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<ParseError>,
}

/// Parse a PHP source text into a best-effort tree plus the errors
/// encountered along the way. Parsing never fails outright.
pub fn parse(source: &str) -> ParseResult {
    let mut parser = parser::Parser::new(source);
    let program = parser.parse_program();
    ParseResult {
        program,
        errors: parser.into_errors(),
    }
}
