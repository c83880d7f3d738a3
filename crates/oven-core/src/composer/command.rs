//! Structured Composer command input
//!
//! Commands are described as an ordered map of entries and flattened to a
//! single argv. The same input produces the same logical arguments whether
//! Composer runs as a PHP archive or a native binary; only the spawned
//! program differs.

/// Value of one input entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputValue {
    /// A bare `--flag`.
    Switch,
    /// A string; becomes `--key=value` for flag keys, a positional token
    /// otherwise.
    Str(String),
    /// A positional list; each element becomes its own token.
    List(Vec<String>),
}

/// Ordered Composer input map. Entries whose key begins with `--` render as
/// flags; everything else is positional, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerInput {
    entries: Vec<(String, InputValue)>,
}

impl ComposerInput {
    /// Start an input map with a leading command word (e.g. `require`).
    pub fn command(command: &str) -> Self {
        Self::default().arg(command)
    }

    /// Append a bare `--flag`.
    pub fn flag(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), InputValue::Switch));
        self
    }

    /// Append a `--key=value` option.
    pub fn option(mut self, name: &str, value: impl Into<String>) -> Self {
        self.entries
            .push((name.to_string(), InputValue::Str(value.into())));
        self
    }

    /// Append one positional token.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.entries
            .push((String::new(), InputValue::Str(value.into())));
        self
    }

    /// Append a positional list (e.g. the `packages` argument of `require`).
    pub fn args(mut self, values: Vec<String>) -> Self {
        self.entries.push((String::new(), InputValue::List(values)));
        self
    }

    /// Flatten to the argv handed to the subprocess. Tokens are passed to
    /// the child directly, with no intermediate shell to quote for.
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = Vec::new();

        for (key, value) in &self.entries {
            if key.starts_with("--") {
                match value {
                    InputValue::Switch => argv.push(key.clone()),
                    InputValue::Str(v) => argv.push(format!("{key}={v}")),
                    InputValue::List(values) => {
                        for v in values {
                            argv.push(format!("{key}={v}"));
                        }
                    }
                }
            } else {
                match value {
                    InputValue::Switch => {}
                    InputValue::Str(v) => argv.push(v.clone()),
                    InputValue::List(values) => argv.extend(values.iter().cloned()),
                }
            }
        }

        argv
    }
}
