//! The composed script artifact.
//!
//! A [`Script`] is an append-only sequence of fragments. It is created for one
//! stage invocation, rendered once, and dropped after persistence.

/// Interpreter line written at the top of every composed script.
pub const INTERPRETER: &str = "#!/bin/bash";

/// Joins the interpreter, head comment and body fragments.
pub const SEPARATOR: &str = "\n";

/// First body fragment: abort on the first failing command and trace execution.
pub const STRICT_MODE: &str = "set -xe\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    interpreter: String,
    head_comment: String,
    body: Vec<String>,
}

impl Script {
    pub fn new(head_comment: impl Into<String>) -> Self {
        Self {
            interpreter: INTERPRETER.to_string(),
            head_comment: head_comment.into(),
            body: Vec::new(),
        }
    }

    /// A script whose first fragment is [`STRICT_MODE`].
    pub fn strict(head_comment: impl Into<String>) -> Self {
        let mut script = Self::new(head_comment);
        script.push(STRICT_MODE);
        script
    }

    /// Append a fragment. Empty fragments are no-ops and leave no entry behind.
    pub fn push(&mut self, fragment: impl Into<String>) -> &mut Self {
        let fragment = fragment.into();
        if !fragment.is_empty() {
            self.body.push(fragment);
        }
        self
    }

    pub fn extend<I, S>(&mut self, fragments: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for fragment in fragments {
            self.push(fragment);
        }
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn head_comment(&self) -> &str {
        &self.head_comment
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.interpreter);
        out.push_str(SEPARATOR);
        out.push_str(&self.head_comment);
        out.push_str(SEPARATOR);
        out.push_str(&self.body.join(SEPARATOR));
        out
    }
}
