//! Answer text normalization
//!
//! Converts raw learner input (plain text or LaTeX-style math markup) into a compact,
//! lower-cased linear form that the equivalence strategies compare and parse.
//!
//! Pipeline: strip invisible characters → markup conversion (regex cleanup on failure)
//! → whitespace removal → lower-casing.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// `\frac{a}{b}` with flat arguments
static FRAC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[dt]?frac\s*\{([^{}]*)\}\s*\{([^{}]*)\}").unwrap()
});

/// `\sqrt{x}` with a flat argument
static SQRT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\sqrt\s*\{([^{}]*)\}").unwrap());

static TIMES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(cdot|times|ast)").unwrap());

static DIV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\div").unwrap());

/// Sizing and spacing commands that carry no value
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(left|right|big|Big|bigl|bigr|Bigl|Bigr|quad|qquad)|\\[,;:! ]").unwrap()
});

/// Any remaining command: keep its name
static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([a-zA-Z]+)").unwrap());

/// Malformed markup detected by the converter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unbalanced brace at offset {0}")]
    UnbalancedBrace(usize),

    #[error("missing argument for \\{0}")]
    MissingArgument(String),

    #[error("unterminated group opened with '{0}'")]
    Unterminated(char),

    #[error("markup nested deeper than {} levels", MAX_MARKUP_DEPTH)]
    TooDeep,
}

/// Deepest nesting of groups and commands the converter follows
pub const MAX_MARKUP_DEPTH: usize = 64;

/// Normalize raw answer text into its comparable form.
///
/// Never fails: malformed markup falls back to a regex cleanup, and if every
/// transformation would erase a non-blank input the plain lower-cased text is returned.
pub fn normalize(raw: &str) -> String {
    let cleaned = strip_invisible(raw);

    let linear = if has_markup(&cleaned) {
        match latex_to_linear(&cleaned) {
            Ok(converted) => converted,
            Err(e) => {
                warn!(error = %e, "markup conversion failed, using regex cleanup");
                regex_cleanup(&cleaned)
            }
        }
    } else {
        cleaned.clone()
    };

    let normalized = compact_lowercase(&linear);
    if normalized.is_empty() {
        compact_lowercase(&cleaned)
    } else {
        normalized
    }
}

/// Whether the text contains tokens characteristic of math markup
pub fn has_markup(text: &str) -> bool {
    text.chars().any(|c| matches!(c, '\\' | '{' | '}' | '^' | '_'))
}

/// Drop zero-width characters, BOM, smart quotes and control characters; map
/// non-breaking spaces to spaces and typographic operators to ASCII.
fn strip_invisible(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
            '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' => None,
            '\u{00A0}' | '\u{202F}' | '\u{2007}' => Some(' '),
            '\u{2212}' | '\u{2013}' => Some('-'),
            '\u{00D7}' | '\u{00B7}' | '\u{22C5}' => Some('*'),
            '\u{00F7}' => Some('/'),
            c if c.is_control() && !c.is_whitespace() => None,
            c => Some(c),
        })
        .collect()
}

fn compact_lowercase(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Convert LaTeX-style markup into linear math.
pub fn latex_to_linear(input: &str) -> Result<String, MarkupError> {
    let mut converter = MarkupConverter {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    converter.convert_until(None)
}

/// Best-effort cleanup used when the converter rejects the markup
fn regex_cleanup(input: &str) -> String {
    let mut text = input.to_string();
    // Innermost fractions and roots first, repeated so nested flat groups unwind.
    for _ in 0..8 {
        let next = {
            let without_fracs = FRAC_RE.replace_all(&text, "($1)/($2)");
            SQRT_RE.replace_all(&without_fracs, "sqrt($1)").into_owned()
        };
        if next == text {
            break;
        }
        text = next;
    }
    let text = TIMES_RE.replace_all(&text, "*");
    let text = DIV_RE.replace_all(&text, "/");
    let text = NOISE_RE.replace_all(&text, "");
    let text = COMMAND_RE.replace_all(&text, "$1");
    text.chars()
        .filter_map(|c| match c {
            '{' => Some('('),
            '}' => Some(')'),
            '\\' => None,
            c => Some(c),
        })
        .collect()
}

struct MarkupConverter {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl MarkupConverter {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Run `convert` one nesting level down
    fn nested<T>(
        &mut self,
        convert: impl FnOnce(&mut Self) -> Result<T, MarkupError>,
    ) -> Result<T, MarkupError> {
        if self.depth >= MAX_MARKUP_DEPTH {
            return Err(MarkupError::TooDeep);
        }
        self.depth += 1;
        let converted = convert(self);
        self.depth -= 1;
        converted
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Convert until `stop` (consumed) or end of input when `stop` is `None`
    fn convert_until(&mut self, stop: Option<char>) -> Result<String, MarkupError> {
        let mut out = String::new();

        while let Some(c) = self.peek() {
            if Some(c) == stop {
                self.pos += 1;
                return Ok(out);
            }
            match c {
                '\\' => {
                    let converted = self.command()?;
                    out.push_str(&converted);
                }
                '{' => {
                    let inner = self.group()?;
                    out.push('(');
                    out.push_str(&inner);
                    out.push(')');
                }
                '}' => return Err(MarkupError::UnbalancedBrace(self.pos)),
                '^' | '_' => {
                    self.pos += 1;
                    out.push(c);
                    let script = self.script_argument(c)?;
                    out.push_str(&script);
                }
                c => {
                    self.pos += 1;
                    out.push(c);
                }
            }
        }

        match stop {
            Some(stop) => Err(MarkupError::Unterminated(opening_for(stop))),
            None => Ok(out),
        }
    }

    /// Convert a `{...}` group; the cursor must be on the opening brace
    fn group(&mut self) -> Result<String, MarkupError> {
        self.pos += 1;
        self.nested(|converter| converter.convert_until(Some('}')))
    }

    /// Argument of a superscript or subscript
    fn script_argument(&mut self, op: char) -> Result<String, MarkupError> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => {
                let inner = self.group()?;
                Ok(wrap_unless_simple(&inner))
            }
            Some('\\') => {
                let inner = self.command()?;
                Ok(wrap_unless_simple(&inner))
            }
            Some('}') | None => Err(MarkupError::MissingArgument(op.to_string())),
            Some(c) => {
                self.pos += 1;
                Ok(c.to_string())
            }
        }
    }

    /// Mandatory command argument: a brace group or a single character
    fn required_argument(&mut self, command: &str) -> Result<String, MarkupError> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.group(),
            Some('}') | None => Err(MarkupError::MissingArgument(command.to_string())),
            Some('\\') => self.command(),
            Some(c) => {
                self.pos += 1;
                Ok(c.to_string())
            }
        }
    }

    /// Convert a command; the cursor must be on the backslash
    fn command(&mut self) -> Result<String, MarkupError> {
        self.nested(Self::command_body)
    }

    fn command_body(&mut self) -> Result<String, MarkupError> {
        self.pos += 1;

        let Some(first) = self.peek() else {
            return Err(MarkupError::MissingArgument(String::new()));
        };

        if !first.is_ascii_alphabetic() {
            self.pos += 1;
            return Ok(match first {
                ',' | ';' | ':' | '!' | ' ' | '\\' => String::new(),
                '{' => "(".to_string(),
                '}' => ")".to_string(),
                other => other.to_string(),
            });
        }

        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let numerator = self.required_argument(&name)?;
                let denominator = self.required_argument(&name)?;
                Ok(format!("({numerator})/({denominator})"))
            }
            "sqrt" => {
                self.skip_whitespace();
                let index = if self.peek() == Some('[') {
                    self.pos += 1;
                    Some(self.nested(|converter| converter.convert_until(Some(']')))?)
                } else {
                    None
                };
                let radicand = self.required_argument(&name)?;
                Ok(match index {
                    Some(n) => format!("({radicand})^(1/({n}))"),
                    None => format!("sqrt({radicand})"),
                })
            }
            "cdot" | "times" | "ast" => Ok("*".to_string()),
            "div" => Ok("/".to_string()),
            "left" | "right" | "big" | "Big" | "bigl" | "bigr" | "Bigl" | "Bigr" => {
                // `\left.` is an invisible delimiter
                if self.peek() == Some('.') {
                    self.pos += 1;
                }
                Ok(String::new())
            }
            "quad" | "qquad" => Ok(String::new()),
            "text" | "mathrm" | "textrm" | "textbf" | "mathbf" | "mbox" | "operatorname" => {
                self.required_argument(&name)
            }
            "le" | "leq" => Ok("<=".to_string()),
            "ge" | "geq" => Ok(">=".to_string()),
            "ne" | "neq" => Ok("!=".to_string()),
            _ => Ok(name),
        }
    }
}

fn opening_for(stop: char) -> char {
    match stop {
        ']' => '[',
        _ => '{',
    }
}

fn wrap_unless_simple(inner: &str) -> String {
    if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
        inner.to_string()
    } else {
        format!("({inner})")
    }
}
