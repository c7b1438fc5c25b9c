//! Legacy function-call-style template syntax normalization.
//!
//! Templates may spell a helper call as `fn(arg1, 'arg2', arg3)`. Before
//! parsing, that is rewritten to the whitespace-separated token form the
//! parser expects: `fn arg1 "arg2" arg3`.

/// Apply the five normalization rules to the body of a single `{{ … }}`
/// placeholder (the caller strips the delimiters first).
pub fn normalize_placeholder_body(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    for ch in body.chars() {
        match ch {
            '(' | ')' | ',' => out.push(' '),
            '\'' => out.push('"'),
            other => out.push(other),
        }
    }
    collapse_spaces(out.trim())
}

fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Walk the whole template, normalizing the contents of every `{{ … }}`
/// placeholder in place. Text outside placeholders is left untouched.
pub fn normalize_template(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let body = normalize_placeholder_body(&after_open[..end]);
                out.push_str("{{ ");
                out.push_str(&body);
                out.push_str(" }}");
                rest = &after_open[end + 2..];
            }
            None => {
                // Unterminated placeholder: copy through verbatim so the
                // parser reports it as unresolved rather than normalize()
                // silently eating content.
                out.push_str("{{");
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}
