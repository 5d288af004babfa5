//! Signal address templates.
//!
//! `{var}` expands to a template variable (`prefix`, `name` or a device
//! parameter). `{{` and `}}` produce literal braces. Expansion happens
//! once, when the definition is built.

use std::collections::BTreeMap;

/// Variable referenced by a template but not defined, or an unclosed `{`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedVariable(pub String);

/// Expand `template` against `vars`.
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> Result<String, UnresolvedVariable> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &template[start + 1..];
                let Some(len) = rest.find('}') else {
                    return Err(UnresolvedVariable(rest.to_string()));
                };
                let variable = &rest[..len];
                match vars.get(variable.trim()) {
                    Some(value) => out.push_str(value),
                    None => return Err(UnresolvedVariable(variable.to_string())),
                }
                // Skip past the closing brace.
                for _ in 0..=variable.chars().count() {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
