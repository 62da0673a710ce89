//! Stylesheet document parser.
//!
//! ```text
//! /* variables: name = light / dark, or name = shared */
//! accent = #000000 / #ffffff
//! #-----#
//! header, selected-header { color: {accent}; bold: true; }
//! header:dark { background: var(accent); }
//! ```
//!
//! The variable section is everything before the separator line. Without a
//! separator the whole document is rules. Any syntax error rejects the whole
//! document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{is_identifier, AttrTemplate, RuleMode, StyleRule, Variable};
use crate::error::{GridError, Result};

/// Line separating variable declarations from rules.
pub const SEPARATOR: &str = "#-----#";

/// Parsed document: rules in declaration order plus variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub rules: Vec<StyleRule>,
    pub variables: Vec<Variable>,
}

pub fn parse_document(text: &str) -> Result<StyleSheet> {
    let text = strip_comments(text)?;

    let mut sheet = StyleSheet::default();
    let separator = text
        .lines()
        .position(|line| is_separator(line.trim()));

    match separator {
        Some(idx) => {
            let header: Vec<&str> = text.lines().take(idx).collect();
            sheet.variables = parse_variables(&header)?;
            let body: String = text.lines().skip(idx + 1).collect::<Vec<_>>().join("\n");
            sheet.rules = parse_rules(&body, idx + 2)?;
        }
        None => {
            sheet.rules = parse_rules(&text, 1)?;
        }
    }

    Ok(sheet)
}

/// `#---#` with any number (>= 1) of dashes.
fn is_separator(line: &str) -> bool {
    line.len() >= 3
        && line.starts_with('#')
        && line.ends_with('#')
        && line[1..line.len() - 1].chars().all(|c| c == '-')
}

/// Remove `/* ... */` comments, keeping newlines so line numbers survive.
fn strip_comments(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut line = 1;

    while let Some(start) = rest.find("/*") {
        let (before, after) = rest.split_at(start);
        out.push_str(before);
        line += before.matches('\n').count();

        let Some(end) = after.find("*/") else {
            return Err(GridError::style(Some(line), "unterminated comment"));
        };
        let comment = &after[..end + 2];
        for _ in comment.matches('\n') {
            out.push('\n');
        }
        line += comment.matches('\n').count();
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn parse_variables(lines: &[&str]) -> Result<Vec<Variable>> {
    let mut variables: Vec<Variable> = Vec::new();

    for (i, raw) in lines.iter().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let Some((name, values)) = line.split_once('=') else {
            return Err(GridError::style(Some(line_no), format!("expected 'name = value', found '{line}'")));
        };
        let name = name.trim();
        if !is_identifier(name) {
            return Err(GridError::style(Some(line_no), format!("invalid variable name '{name}'")));
        }

        let values = values.trim().trim_end_matches(';');
        let parts: Vec<&str> = values.split('/').map(str::trim).collect();
        let variable = match parts.as_slice() {
            [shared] if !shared.is_empty() => Variable::shared(name, *shared),
            [light, dark] if !light.is_empty() && !dark.is_empty() => Variable::new(name, *light, *dark),
            _ => {
                return Err(GridError::style(
                    Some(line_no),
                    format!("variable '{name}' needs 'value' or 'light / dark'"),
                ))
            }
        };

        if variables.iter().any(|v| v.name == variable.name) {
            return Err(GridError::style(Some(line_no), format!("variable '{name}' declared twice")));
        }
        variables.push(variable);
    }

    Ok(variables)
}

/// Character scanner with line tracking.
struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, first_line: usize) -> Self {
        Self { chars: text.chars().peekable(), line: first_line }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume up to (not including) the first char in `stops`.
    fn take_until(&mut self, stops: &[char]) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if stops.contains(&ch) {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    /// Attribute value: runs to `;` or `}`, with `{name}` references kept whole.
    fn take_value(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            match ch {
                ';' | '}' => break,
                '{' => {
                    let line = self.line;
                    self.bump();
                    let inner = self.take_until(&['}', '\n', ';']);
                    if self.peek() != Some('}') {
                        return Err(GridError::style(Some(line), "unterminated variable reference"));
                    }
                    self.bump();
                    out.push('{');
                    out.push_str(&inner);
                    out.push('}');
                }
                _ => {
                    out.push(ch);
                    self.bump();
                }
            }
        }
        Ok(out)
    }
}

fn parse_rules(text: &str, first_line: usize) -> Result<Vec<StyleRule>> {
    let mut scanner = Scanner::new(text, first_line);
    let mut rules = Vec::new();

    loop {
        scanner.skip_ws();
        if scanner.peek().is_none() {
            break;
        }

        let selector_line = scanner.line;
        let selector_text = scanner.take_until(&['{', '}']);
        if scanner.bump() != Some('{') {
            return Err(GridError::style(
                Some(selector_line),
                format!("expected '{{' after selector '{}'", selector_text.trim()),
            ));
        }
        let selectors = parse_selectors(&selector_text, selector_line)?;

        let mut attributes = BTreeMap::new();
        loop {
            scanner.skip_ws();
            match scanner.peek() {
                None => {
                    return Err(GridError::style(Some(selector_line), "unterminated rule block"));
                }
                Some('}') => {
                    scanner.bump();
                    break;
                }
                Some(';') => {
                    scanner.bump();
                    continue;
                }
                Some(_) => {}
            }

            let decl_line = scanner.line;
            let name = scanner.take_until(&[':', ';', '}', '{']);
            if scanner.bump() != Some(':') {
                return Err(GridError::style(
                    Some(decl_line),
                    format!("expected ':' after attribute '{}'", name.trim()),
                ));
            }
            let name = name.trim();
            if !is_identifier(name) {
                return Err(GridError::style(Some(decl_line), format!("invalid attribute name '{name}'")));
            }

            let value = scanner.take_value()?;
            let value = value.trim();
            if value.is_empty() {
                return Err(GridError::style(Some(decl_line), format!("attribute '{name}' has no value")));
            }
            attributes.insert(name.to_string(), AttrTemplate::parse(value));
        }

        for (selector, mode) in selectors {
            rules.push(StyleRule { selector, mode, attributes: attributes.clone() });
        }
    }

    Ok(rules)
}

/// `a, b:dark` -> [(a, Any), (b, Dark)]
fn parse_selectors(text: &str, line: usize) -> Result<Vec<(String, RuleMode)>> {
    let mut out = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        let (name, mode) = match part.split_once(':') {
            Some((name, qualifier)) => {
                let mode = RuleMode::parse(qualifier).ok_or_else(|| {
                    GridError::style(Some(line), format!("unknown mode '{}' (light, dark or any)", qualifier.trim()))
                })?;
                (name.trim(), mode)
            }
            None => (part, RuleMode::Any),
        };
        if !is_identifier(name) {
            return Err(GridError::style(Some(line), format!("invalid selector '{part}'")));
        }
        out.push((name.to_string(), mode));
    }
    Ok(out)
}
