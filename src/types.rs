use std::fmt;

/// A single analyzer finding: which file, which line, and a human-readable
/// message. Unlike the Python-lint ancestor this type replaced, findings
/// here aren't keyed by a rule code — the dialect analyzer's diagnostics
/// are prose, not a closed enum of lint rules.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new("A.bas", 3, "Undefined identifier 'y' in 'S'.");
        assert_eq!(d.to_string(), "A.bas:3: Undefined identifier 'y' in 'S'.");
    }
}
