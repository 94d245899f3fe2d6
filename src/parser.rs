use crate::error::{Result, ShellError};

/// Upper bound on arguments per pipeline stage.
pub const MAX_ARGS: usize = 128;

/// One stage of a pipeline: the program and its arguments, with the
/// program itself at `argv[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
}

impl Command {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// The command as the user typed it, for job listings.
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// A parsed command line: one or more pipe-connected commands plus a
/// background flag.
#[derive(Debug, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub background: bool,
}

/// Parses the input command line into a [`Pipeline`]. This function handles:
///
/// - Tokenization (including quoted strings)
/// - Pipelines ("|") of any length
/// - Background execution using a trailing "&"
///
/// Redirection characters have no special meaning here; they pass through
/// as ordinary argument text.
pub fn parse_command_line(cmdline: &str) -> Result<Pipeline> {
    let tokens = tokenize(cmdline);
    if tokens.is_empty() {
        return Err(ShellError::new("empty command line"));
    }

    let mut stages: Vec<Vec<String>> = vec![Vec::new()];
    let mut background = false;
    let last = tokens.len() - 1;

    for (i, token) in tokens.into_iter().enumerate() {
        match token.as_str() {
            "|" => {
                if stages.last().map_or(true, |stage| stage.is_empty()) {
                    return Err(ShellError::new("missing command before '|'"));
                }
                stages.push(Vec::new());
            }
            "&" => {
                if i != last {
                    return Err(ShellError::new("'&' must end the command line"));
                }
                background = true;
            }
            _ => {
                let stage = stages.last_mut().expect("at least one stage");
                if stage.len() >= MAX_ARGS {
                    return Err(ShellError::new("too many arguments"));
                }
                stage.push(token);
            }
        }
    }

    if stages.last().map_or(true, |stage| stage.is_empty()) {
        return Err(ShellError::new(if background {
            "'&' needs a command"
        } else {
            "missing command after '|'"
        }));
    }

    Ok(Pipeline {
        commands: stages.into_iter().map(|argv| Command { argv }).collect(),
        background,
    })
}

/// Splits the input command line into a vector of tokens. This function
/// handles:
///
/// - Quoted strings (using single or double quotes)
/// - Special tokens: `|` and `&`
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        // Handle quoted tokens.
        if ch == '"' || ch == '\'' {
            let quote = ch;
            chars.next(); // Consume opening quote.
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c == quote {
                    chars.next(); // Consume closing quote.
                    break;
                } else {
                    token.push(c);
                    chars.next();
                }
            }
            tokens.push(token);
        }
        // Handle special tokens.
        else if ch == '|' || ch == '&' {
            tokens.push(ch.to_string());
            chars.next();
        }
        // Normal unquoted token.
        else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '|' || c == '&' {
                    break;
                }
                token.push(c);
                chars.next();
            }
            tokens.push(token);
        }
    }
    tokens
}
