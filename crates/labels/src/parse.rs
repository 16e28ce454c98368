use crate::LabelSet;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("label set must start with '{{' (got {0:?})")]
    MissingOpenBrace(String),
    #[error("label set ended before closing '}}'")]
    Unterminated,
    #[error("expected '=' after label name {0:?}")]
    ExpectedEq(String),
    #[error("expected '\"' to open the value of label {0:?}")]
    ExpectedQuote(String),
    #[error("invalid escape '\\{0}' in value of label {1:?}")]
    InvalidEscape(char, String),
    #[error("duplicate label name {0:?}")]
    Duplicate(String),
    #[error("trailing input after label set: {0:?}")]
    TrailingInput(String),
}

pub type Result<Ok> = std::result::Result<Ok, Error>;

/// Parse the canonical string form produced by `encode::canonical` back into
/// a LabelSet. Label names must not contain `=`, `,` or `}`; values may
/// contain anything once escaped.
pub fn label_set(repr: &str) -> Result<LabelSet> {
    let mut chars = match repr.strip_prefix('{') {
        Some(rest) => rest.chars().peekable(),
        None => return Err(Error::MissingOpenBrace(snippet(repr))),
    };
    let mut set = LabelSet::default();

    if chars.peek() == Some(&'}') {
        chars.next();
    } else {
        loop {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('=') => break,
                    Some(c @ (',' | '}')) => {
                        name.push(c);
                        return Err(Error::ExpectedEq(name));
                    }
                    Some(c) => name.push(c),
                    None => return Err(Error::Unterminated),
                }
            }

            if chars.next() != Some('"') {
                return Err(Error::ExpectedQuote(name));
            }
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('n') => value.push('\n'),
                        Some(c) => return Err(Error::InvalidEscape(c, name)),
                        None => return Err(Error::Unterminated),
                    },
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(Error::Unterminated),
                }
            }

            if set.contains(&name) {
                return Err(Error::Duplicate(name));
            }
            set.set_value(&name, &value);

            match chars.next() {
                Some('}') => break,
                Some(',') => {
                    if chars.peek() == Some(&' ') {
                        chars.next();
                    }
                }
                _ => return Err(Error::Unterminated),
            }
        }
    }

    let rest: String = chars.collect();
    if !rest.is_empty() {
        return Err(Error::TrailingInput(snippet(&rest)));
    }
    Ok(set)
}

fn snippet(s: &str) -> String {
    s.chars().take(32).collect()
}
