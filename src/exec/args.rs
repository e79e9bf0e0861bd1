//! Argument vector construction and validation
//!
//! Git is always invoked with a discrete argument vector, never through a
//! shell. The builder records what each token is (flag, option value,
//! positional, path) so that validation can tell a caller-supplied value apart
//! from an option the engine chose to emit.
//!
//! Policy, applied on `build()`:
//! - a NUL byte anywhere is rejected
//! - every flag must appear in [`ALLOWED_FLAGS`]
//! - a positional before `--` may not start with `-` (it would be parsed as an option)

use thiserror::Error;

/// Flags the engine is allowed to emit. `--name=value` tokens are checked by
/// the part before `=`.
pub const ALLOWED_FLAGS: &[&str] = &[
    "--abort",
    "--all",
    "--allow-empty",
    "--amend",
    "--annotate",
    "--author",
    "--bare",
    "--branch",
    "--cached",
    "--continue",
    "--delete",
    "--depth",
    "--detach",
    "--ff-only",
    "--force",
    "--force-with-lease",
    "--format",
    "--grep",
    "--hard",
    "--include-untracked",
    "--initial-branch",
    "--keep-index",
    "--list",
    "--mainline",
    "--max-count",
    "--mixed",
    "--no-commit",
    "--no-edit",
    "--no-ff",
    "--no-gpg-sign",
    "--no-rebase",
    "--no-verify",
    "--onto",
    "--patch-with-stat",
    "--porcelain",
    "--progress",
    "--prune",
    "--push",
    "--quiet",
    "--reason",
    "--rebase",
    "--recurse-submodules",
    "--set-upstream",
    "--set-upstream-to",
    "--short",
    "--since",
    "--single-branch",
    "--skip",
    "--soft",
    "--squash",
    "--stat",
    "--tags",
    "--until",
    "--untracked-files",
    "--update",
    "--verbose",
    "--verify",
    "-D",
    "-L",
    "-S",
    "-b",
    "-d",
    "-m",
    "-q",
    "-v",
    "-vv",
];

/// Reasons an argument vector is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("argument {position} contains a NUL byte")]
    NullByte { position: usize },

    #[error("option {flag} is not in the allow-list")]
    UnknownFlag { flag: String },

    #[error("value {value:?} would be read as an option; use a path argument instead")]
    OptionLike { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Flag(String),
    Value(String),
    Positional(String),
    Separator,
    Path(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Word(s) | Token::Flag(s) | Token::Value(s) | Token::Positional(s) | Token::Path(s) => s,
            Token::Separator => "--",
        }
    }
}

/// Fluent builder for one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgBuilder {
    tokens: Vec<Token>,
}

impl ArgBuilder {
    /// Start a command with its subcommand (`status`, `commit`, ...).
    pub fn new(subcommand: &str) -> Self {
        Self {
            tokens: vec![Token::Word(subcommand.to_string())],
        }
    }

    /// Fixed sub-subcommand word (`stash push`, `worktree add`).
    pub fn word(mut self, word: &str) -> Self {
        self.tokens.push(Token::Word(word.to_string()));
        self
    }

    pub fn flag(mut self, flag: &str) -> Self {
        self.tokens.push(Token::Flag(flag.to_string()));
        self
    }

    pub fn flag_if(self, condition: bool, flag: &str) -> Self {
        if condition {
            self.flag(flag)
        } else {
            self
        }
    }

    /// Flag followed by its value as a separate token (`-m <message>`).
    pub fn option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.tokens.push(Token::Flag(flag.to_string()));
        self.tokens.push(Token::Value(value.into()));
        self
    }

    pub fn option_opt(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.option(flag, value),
            None => self,
        }
    }

    /// Single `--flag=value` token.
    pub fn option_eq(mut self, flag: &str, value: impl std::fmt::Display) -> Self {
        self.tokens.push(Token::Flag(format!("{}={}", flag, value)));
        self
    }

    pub fn option_eq_opt<T: std::fmt::Display>(self, flag: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.option_eq(flag, value),
            None => self,
        }
    }

    /// Ref, name or URL argument. Must not look like an option.
    pub fn positional(mut self, value: impl Into<String>) -> Self {
        self.tokens.push(Token::Positional(value.into()));
        self
    }

    pub fn positional_opt(self, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.positional(value),
            None => self,
        }
    }

    /// Pathspecs, emitted after a single `--` separator. No-op when empty.
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut paths = paths.into_iter().peekable();
        if paths.peek().is_none() {
            return self;
        }
        if !self.tokens.contains(&Token::Separator) {
            self.tokens.push(Token::Separator);
        }
        self.tokens.extend(paths.map(|p| Token::Path(p.into())));
        self
    }

    /// Token texts as given, unvalidated. For diagnostics of a refused build.
    pub fn raw_args(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.text().to_string()).collect()
    }

    /// Validate and return the final argument vector.
    pub fn build(self) -> Result<Vec<String>, ArgError> {
        validate(&self.tokens)?;
        Ok(self.tokens.iter().map(|t| t.text().to_string()).collect())
    }
}

fn validate(tokens: &[Token]) -> Result<(), ArgError> {
    let mut after_separator = false;
    for (position, token) in tokens.iter().enumerate() {
        if token.text().contains('\0') {
            return Err(ArgError::NullByte { position });
        }
        match token {
            Token::Flag(flag) => {
                let name = flag.split_once('=').map_or(flag.as_str(), |(name, _)| name);
                if !ALLOWED_FLAGS.contains(&name) {
                    return Err(ArgError::UnknownFlag {
                        flag: name.to_string(),
                    });
                }
            }
            Token::Positional(value) if !after_separator && value.starts_with('-') => {
                return Err(ArgError::OptionLike {
                    value: value.clone(),
                });
            }
            Token::Separator => after_separator = true,
            _ => {}
        }
    }
    Ok(())
}

/// Reject a caller-supplied string containing NUL before it reaches any builder.
pub fn ensure_no_nul(value: &str) -> Result<(), ArgError> {
    match value.find('\0') {
        Some(position) => Err(ArgError::NullByte { position }),
        None => Ok(()),
    }
}
