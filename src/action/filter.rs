use super::shell;

/// Post-processing applied to a macro value: `%{NAME|filter}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// POSIX shell quoting.
    ShellEscape,
    /// Backslash-escape `"` and `\`, then shell-quote.
    JsonEncode,
}

impl Filter {
    pub fn from_name(name: &str) -> Option<Filter> {
        match name {
            "shellescape" => Some(Filter::ShellEscape),
            "jsonencode" => Some(Filter::JsonEncode),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::ShellEscape => "shellescape",
            Filter::JsonEncode => "jsonencode",
        }
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Filter::ShellEscape => shell::quote(value),
            Filter::JsonEncode => {
                let mut escaped = String::with_capacity(value.len());
                for ch in value.chars() {
                    if ch == '"' || ch == '\\' {
                        escaped.push('\\');
                    }
                    escaped.push(ch);
                }
                shell::quote(&escaped)
            }
        }
    }
}
