//! Stylesheet model and resolution.
//!
//! A stylesheet is a set of rules (`selector[:mode] { name: value; }`) plus
//! variables that carry one value for light mode and one for dark mode.
//! Resolution turns a style tag and a mode into concrete attributes.

mod document;
mod resolver;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use document::{parse_document, StyleSheet, SEPARATOR};
pub use resolver::{Precedence, StyleResolver};

/// Attribute names the bundled renderers understand. Rules may set any
/// other name too; unknown names are passed through untouched.
pub mod attr {
    pub const COLOR: &str = "color";
    pub const BACKGROUND: &str = "background";
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINE: &str = "underline";
}

/// Style tags the controller layers on top of cell/row tags.
pub mod tags {
    pub const CELL: &str = "cell";
    pub const HEADER: &str = "header";
    pub const SELECTED_HEADER: &str = "selected-header";
    pub const SELECTED_ROW: &str = "selected-row";
    pub const SELECTED_COLUMN: &str = "selected-column";
    pub const SELECTED_CELL: &str = "selected-cell";
    pub const DIRTY: &str = "dirty";
    pub const EDITING: &str = "editing";
    pub const INVALID: &str = "invalid";
}

/// Display mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Light,
    #[default]
    Dark,
}

impl Mode {
    pub(crate) fn index(self) -> usize {
        match self {
            Mode::Light => 0,
            Mode::Dark => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Light => Mode::Dark,
            Mode::Dark => Mode::Light,
        }
    }
}

/// Mode qualifier on a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    Light,
    Dark,
    #[default]
    Any,
}

impl RuleMode {
    pub fn applies_to(self, mode: Mode) -> bool {
        match self {
            RuleMode::Any => true,
            RuleMode::Light => mode == Mode::Light,
            RuleMode::Dark => mode == Mode::Dark,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(RuleMode::Light),
            "dark" => Some(RuleMode::Dark),
            "any" => Some(RuleMode::Any),
            _ => None,
        }
    }
}

/// One piece of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Literal(String),
    Var(String),
}

/// An attribute value with zero or more variable references.
///
/// References are written `{name}` or `var(name)` and may sit inside a
/// longer value, e.g. `1px solid {border}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrTemplate {
    segments: Vec<Segment>,
}

impl AttrTemplate {
    pub fn literal(s: impl Into<String>) -> Self {
        Self { segments: vec![Segment::Literal(s.into())] }
    }

    /// Split `input` into literal and variable segments. Never fails: text
    /// that is not a well-formed reference stays literal.
    pub fn parse(input: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = input;

        while !rest.is_empty() {
            if let Some((name, consumed)) = match_reference(rest) {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Var(name.to_string()));
                rest = &rest[consumed..];
                continue;
            }
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                literal.push(ch);
            }
            rest = chars.as_str();
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of referenced variables, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute variables. `lookup` returns `None` for unknown names,
    /// which is reported back as `Err(name)`.
    pub fn render<'a>(
        &'a self,
        mut lookup: impl FnMut(&str) -> Option<&'a str>,
    ) -> Result<String, &'a str> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Var(name) => out.push_str(lookup(name).ok_or(name.as_str())?),
            }
        }
        Ok(out)
    }
}

impl From<&str> for AttrTemplate {
    fn from(s: &str) -> Self {
        AttrTemplate::parse(s)
    }
}

impl From<String> for AttrTemplate {
    fn from(s: String) -> Self {
        AttrTemplate::parse(&s)
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Match `{name}` or `var(name)` at the start of `s`.
/// Returns the name and the number of bytes consumed.
fn match_reference(s: &str) -> Option<(&str, usize)> {
    let (open, close) = if s.starts_with('{') {
        ("{", '}')
    } else if s.starts_with("var(") {
        ("var(", ')')
    } else {
        return None;
    };

    let body = &s[open.len()..];
    let end = body.find(close)?;
    let name = body[..end].trim();
    if !is_identifier(name) {
        return None;
    }
    Some((name, open.len() + end + 1))
}

/// A rule: selector, mode qualifier, attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRule {
    pub selector: String,
    pub mode: RuleMode,
    pub attributes: BTreeMap<String, AttrTemplate>,
}

impl StyleRule {
    pub fn new(selector: impl Into<String>, mode: RuleMode) -> Self {
        Self { selector: selector.into(), mode, attributes: BTreeMap::new() }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrTemplate>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// A variable with one value per mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub light: String,
    pub dark: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, light: impl Into<String>, dark: impl Into<String>) -> Self {
        Self { name: name.into(), light: light.into(), dark: dark.into() }
    }

    /// Same value in both modes.
    pub fn shared(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self { name: name.into(), light: value.clone(), dark: value }
    }

    pub fn value(&self, mode: Mode) -> &str {
        match mode {
            Mode::Light => &self.light,
            Mode::Dark => &self.dark,
        }
    }
}

/// Concrete attributes after resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedStyle {
    attributes: BTreeMap<String, String>,
}

impl ResolvedStyle {
    /// Built-in attributes used when no rule matches a tag.
    pub fn defaults(mode: Mode) -> Self {
        let (color, background) = match mode {
            Mode::Light => ("#0f172a", "#f1f5f9"),
            Mode::Dark => ("#f1f5f9", "#0f172a"),
        };
        let mut style = Self::default();
        style.set(attr::COLOR, color);
        style.set(attr::BACKGROUND, background);
        style.set(attr::BOLD, "false");
        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Overlay `other` on top of `self`; attributes in `other` win.
    pub fn merge(&mut self, other: &ResolvedStyle) {
        for (name, value) in &other.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn color(&self) -> Option<&str> {
        self.get(attr::COLOR)
    }

    pub fn background(&self) -> Option<&str> {
        self.get(attr::BACKGROUND)
    }

    /// Boolean attribute: `true`, `yes`, `1` or `bold` count as set.
    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
            Some("true" | "yes" | "1" | "bold")
        )
    }
}

impl FromIterator<(String, String)> for ResolvedStyle {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { attributes: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_both_reference_forms() {
        let t = AttrTemplate::parse("1px solid {border} var(accent)");
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal("1px solid ".into()),
                Segment::Var("border".into()),
                Segment::Literal(" ".into()),
                Segment::Var("accent".into()),
            ]
        );
        assert_eq!(t.variables().collect::<Vec<_>>(), vec!["border", "accent"]);
    }

    #[test]
    fn test_template_malformed_reference_stays_literal() {
        let t = AttrTemplate::parse("{not closed");
        assert_eq!(t.segments(), &[Segment::Literal("{not closed".into())]);
        let t = AttrTemplate::parse("{has space}");
        assert_eq!(t.variables().count(), 0);
        let t = AttrTemplate::parse("#ff0000");
        assert_eq!(t.segments(), &[Segment::Literal("#ff0000".into())]);
    }

    #[test]
    fn test_template_render() {
        let t = AttrTemplate::parse("{a}-{b}");
        let out = t.render(|name| match name {
            "a" => Some("x"),
            "b" => Some("y"),
            _ => None,
        });
        assert_eq!(out, Ok("x-y".to_string()));

        let missing = t.render(|_| None);
        assert_eq!(missing, Err("a"));
    }

    #[test]
    fn test_rule_mode() {
        assert!(RuleMode::Any.applies_to(Mode::Dark));
        assert!(RuleMode::Light.applies_to(Mode::Light));
        assert!(!RuleMode::Light.applies_to(Mode::Dark));
        assert_eq!(RuleMode::parse(" DARK "), Some(RuleMode::Dark));
        assert_eq!(RuleMode::parse("dim"), None);
    }

    #[test]
    fn test_resolved_style_merge_and_flag() {
        let mut base = ResolvedStyle::defaults(Mode::Dark);
        let mut overlay = ResolvedStyle::default();
        overlay.set(attr::COLOR, "#ff0000");
        overlay.set(attr::BOLD, "yes");
        base.merge(&overlay);
        assert_eq!(base.color(), Some("#ff0000"));
        assert_eq!(base.background(), Some("#0f172a"));
        assert!(base.flag(attr::BOLD));
        assert!(!base.flag(attr::ITALIC));
    }

    #[test]
    fn test_variable_value_by_mode() {
        let v = Variable::new("accent", "#000", "#fff");
        assert_eq!(v.value(Mode::Light), "#000");
        assert_eq!(v.value(Mode::Dark), "#fff");
        assert_eq!(Variable::shared("gap", "1").value(Mode::Dark), "1");
    }
}
