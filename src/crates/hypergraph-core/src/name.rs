//! Name legality checks shared by nodes, parameters, and output values.

use crate::error::{GraphConfigError, Result};

/// Sentinel decision meaning "no further targets" for a routing gate.
pub const TERMINAL: &str = "__end__";

/// Reserved words that may not be used as node names, parameter names, or
/// output names. `TERMINAL` is reserved implicitly since it would otherwise
/// shadow the terminal sentinel.
const RESERVED: &[&str] = &[
    "self", "Self", "fn", "let", "mut", "match", "if", "else", "loop", "for", "while",
    "return", "struct", "enum", "trait", "impl", "pub", "crate", "super", "async", "await",
    TERMINAL,
];

/// Returns `true` if `name` is a legal identifier: starts with a letter or
/// underscore, contains only letters/digits/underscore, and is non-empty.
pub fn is_legal_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a name is a legal, non-reserved identifier, tagging the error
/// with `kind` (`"node"`, `"input"`, `"output"`) for diagnostics.
pub fn validate_name(name: &str, kind: &str) -> Result<()> {
    if !is_legal_identifier(name) {
        return Err(GraphConfigError::IllegalName {
            name: name.to_string(),
            kind: kind.to_string(),
        }
        .into());
    }
    if RESERVED.contains(&name) {
        return Err(GraphConfigError::ReservedName {
            name: name.to_string(),
            kind: kind.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Validate a graph name: a legal identifier-ish label with no path
/// separators (`.` or `/`), allowing a looser charset than node names.
pub fn validate_graph_name(name: &str) -> Result<()> {
    if name.contains('.') || name.contains('/') {
        return Err(GraphConfigError::IllegalGraphName(name.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_identifiers() {
        assert!(is_legal_identifier("double"));
        assert!(is_legal_identifier("_private"));
        assert!(is_legal_identifier("node_1"));
    }

    #[test]
    fn rejects_identifiers_starting_with_digit() {
        assert!(!is_legal_identifier("1node"));
    }

    #[test]
    fn rejects_reserved_words() {
        assert!(validate_name("match", "node").is_err());
        assert!(validate_name(TERMINAL, "output").is_err());
    }

    #[test]
    fn graph_name_rejects_path_separators() {
        assert!(validate_graph_name("a/b").is_err());
        assert!(validate_graph_name("a.b").is_err());
        assert!(validate_graph_name("a_b").is_ok());
    }
}
