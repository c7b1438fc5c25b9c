//! Parses a normalized placeholder body (whitespace-separated tokens) into
//! either a variable reference or a helper call.

#[derive(Debug, Clone, PartialEq)]
pub enum VariablePath {
    Software,
    Provider,
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Str(String),
    /// The bare keyword `prov`: "use the provider the template is being
    /// rendered for" rather than a literal provider name.
    CurrentProvider,
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(i) => Some(*i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    Variable(VariablePath),
    Helper { name: String, args: Vec<Arg> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

/// Tokenize on whitespace, honoring `"…"` quoted segments that may
/// themselves contain spaces.
fn tokenize(body: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut buf = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                buf.push(c);
            }
            if !closed {
                return Err(ParseError("unterminated quoted argument".to_string()));
            }
            tokens.push(format!("\"{}", buf));
        } else {
            let mut buf = String::new();
            while matches!(chars.peek(), Some(c) if !c.is_whitespace()) {
                buf.push(chars.next().unwrap());
            }
            tokens.push(buf);
        }
    }
    Ok(tokens)
}

fn parse_arg(token: &str) -> Arg {
    if let Some(stripped) = token.strip_prefix('"') {
        return Arg::Str(stripped.to_string());
    }
    if let Ok(i) = token.parse::<i64>() {
        return Arg::Int(i);
    }
    if token == "prov" {
        return Arg::CurrentProvider;
    }
    Arg::Str(token.to_string())
}

fn parse_variable_path(body: &str) -> Option<VariablePath> {
    let trimmed = body.trim_start_matches('.');
    if trimmed == "Software" {
        return Some(VariablePath::Software);
    }
    if trimmed == "Provider" {
        return Some(VariablePath::Provider);
    }
    if let Some(key) = trimmed.strip_prefix("Variables.") {
        return Some(VariablePath::Variable(key.to_string()));
    }
    None
}

pub fn parse_placeholder(body: &str) -> Result<Placeholder, ParseError> {
    let trimmed = body.trim();
    if trimmed.starts_with('.') {
        return parse_variable_path(trimmed)
            .map(Placeholder::Variable)
            .ok_or_else(|| ParseError(format!("unknown variable reference: {}", trimmed)));
    }

    let tokens = tokenize(trimmed)?;
    let (name, rest) = tokens
        .split_first()
        .ok_or_else(|| ParseError("empty placeholder".to_string()))?;
    let args = rest.iter().map(|t| parse_arg(t)).collect();
    Ok(Placeholder::Helper {
        name: name.clone(),
        args,
    })
}
