//! Suggested step definitions for undefined steps.
//!
//! When no binding matches, the engine proposes a pattern that would: quoted
//! strings and numbers in the step text become capture groups and the rest is
//! matched literally.

use crate::binding::StepCategory;
use crate::value::ParamType;
use std::fmt;

/// A proposed binding for an undefined step.
///
/// # Examples
///
/// ```
/// use stepbind::binding::StepCategory;
/// use stepbind::skeleton::StepSkeleton;
///
/// let skeleton = StepSkeleton::for_step(StepCategory::Given, "I have 42 \"red\" cukes", false, false);
/// assert_eq!(skeleton.pattern(), r#"I have (-?\d+) "([^"]*)" cukes"#);
/// assert_eq!(skeleton.method_name(), "i_have_cukes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSkeleton {
    category: StepCategory,
    pattern: String,
    parameters: Vec<(String, ParamType)>,
    method_name: String,
}

enum Token<'a> {
    Literal(&'a str),
    Quoted { quote: char, inner_len: usize },
    Number { text: &'a str, decimal: bool },
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Length in bytes of a number token starting at `rest`, and whether it has a
/// fractional part.
fn number_len(rest: &str) -> Option<(usize, bool)> {
    let unsigned = rest.strip_prefix('-').unwrap_or(rest);
    let sign = rest.len() - unsigned.len();
    let int_len = unsigned.find(|c: char| !c.is_ascii_digit()).unwrap_or(unsigned.len());
    if int_len == 0 {
        return None;
    }
    let after_int = unsigned.get(int_len..).unwrap_or_default();
    let frac_len = after_int
        .strip_prefix('.')
        .map(|frac| frac.find(|c: char| !c.is_ascii_digit()).unwrap_or(frac.len()))
        .filter(|len| *len > 0)
        .map_or(0, |len| len + 1);
    let total = sign + int_len + frac_len;
    let boundary = rest.get(total..).and_then(|tail| tail.chars().next());
    if boundary.is_some_and(is_word) {
        return None;
    }
    Some((total, frac_len > 0))
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;
    let mut previous: Option<char> = None;
    while let Some(c) = text.get(pos..).and_then(|rest| rest.chars().next()) {
        let rest = text.get(pos..).unwrap_or_default();
        let token = match c {
            '"' | '\'' => rest
                .get(1..)
                .and_then(|tail| tail.find(c))
                .map(|inner_len| (inner_len + 2, Token::Quoted { quote: c, inner_len })),
            '-' | '0'..='9' if !previous.is_some_and(is_word) => {
                number_len(rest).map(|(len, decimal)| {
                    let number = rest.get(..len).unwrap_or_default();
                    (len, Token::Number { text: number, decimal })
                })
            }
            _ => None,
        };
        match token {
            Some((len, found)) => {
                if literal_start < pos {
                    tokens.push(Token::Literal(text.get(literal_start..pos).unwrap_or_default()));
                }
                tokens.push(found);
                pos += len;
                literal_start = pos;
                previous = text.get(..pos).and_then(|head| head.chars().next_back());
            }
            None => {
                pos += c.len_utf8();
                previous = Some(c);
            }
        }
    }
    if literal_start < text.len() {
        tokens.push(Token::Literal(text.get(literal_start..).unwrap_or_default()));
    }
    tokens
}

fn method_name(literals: &[&str]) -> String {
    let words: Vec<String> = literals
        .iter()
        .flat_map(|chunk| chunk.split(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    let joined = words.join("_");
    match joined.chars().next() {
        None => "step".to_owned(),
        Some(first) if first.is_ascii_digit() => format!("step_{joined}"),
        Some(_) => joined,
    }
}

impl StepSkeleton {
    /// Propose a binding for `text`, appending a text block and/or table
    /// parameter when the request supplied one.
    #[must_use]
    pub fn for_step(
        category: StepCategory,
        text: &str,
        has_text_block: bool,
        has_table: bool,
    ) -> Self {
        let mut pattern = String::new();
        let mut parameters = Vec::new();
        let mut literals = Vec::new();
        for token in tokenize(text) {
            match token {
                Token::Literal(chunk) => {
                    pattern.push_str(&regex::escape(chunk));
                    literals.push(chunk);
                }
                Token::Quoted { quote, .. } => {
                    pattern.push(quote);
                    pattern.push_str(&format!("([^{quote}]*)"));
                    pattern.push(quote);
                    parameters.push((format!("p{}", parameters.len()), ParamType::Text));
                }
                Token::Number { decimal, .. } => {
                    let (group, ty) = if decimal {
                        (r"(-?\d+\.\d+)", ParamType::F64)
                    } else {
                        (r"(-?\d+)", ParamType::I32)
                    };
                    pattern.push_str(group);
                    parameters.push((format!("p{}", parameters.len()), ty));
                }
            }
        }
        if has_text_block {
            parameters.push(("text".to_owned(), ParamType::Text));
        }
        if has_table {
            parameters.push(("table".to_owned(), ParamType::Table));
        }
        Self {
            category,
            pattern,
            parameters,
            method_name: method_name(&literals),
        }
    }

    /// Suggested category.
    #[must_use]
    pub const fn category(&self) -> StepCategory {
        self.category
    }

    /// Suggested regex pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Suggested parameters as `(name, type)` pairs.
    #[must_use]
    pub fn parameters(&self) -> &[(String, ParamType)] {
        &self.parameters
    }

    /// Suggested implementation name.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }
}

impl fmt::Display for StepSkeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} r#\"{}\"# => {}(", self.category, self.pattern, self.method_name)?;
        for (index, (name, ty)) in self.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {ty}")?;
        }
        f.write_str(")")
    }
}
