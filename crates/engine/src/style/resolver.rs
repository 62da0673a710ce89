use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::{parse_document, Mode, ResolvedStyle, RuleMode, StyleRule, Variable};
use crate::error::{GridError, Result};
use crate::trace;

/// How a mode-specific rule and an `any` rule for the same selector combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precedence {
    /// `selector:light` / `selector:dark` override `selector` per attribute.
    #[default]
    ModeSpecific,
    /// The later-declared rule wins, whatever its mode qualifier.
    DeclarationOrder,
}

/// A loaded rule set with every (selector, mode) pair already resolved.
#[derive(Debug, Default)]
struct CompiledTheme {
    rules: Vec<StyleRule>,
    variables: Vec<Variable>,
    /// selector -> resolved style per `Mode::index()`. `None` = no rule applies.
    table: FxHashMap<String, [Option<ResolvedStyle>; 2]>,
}

impl CompiledTheme {
    fn compile(rules: Vec<StyleRule>, variables: Vec<Variable>, precedence: Precedence) -> Result<Self> {
        let mut names = FxHashSet::default();
        for var in &variables {
            if !super::is_identifier(&var.name) {
                return Err(GridError::style(None, format!("invalid variable name '{}'", var.name)));
            }
            if !names.insert(var.name.as_str()) {
                return Err(GridError::style(None, format!("variable '{}' declared twice", var.name)));
            }
        }

        let mut seen = FxHashSet::default();
        for rule in &rules {
            if !super::is_identifier(&rule.selector) {
                return Err(GridError::style(None, format!("invalid selector '{}'", rule.selector)));
            }
            if !seen.insert((rule.selector.as_str(), rule.mode)) {
                return Err(GridError::style(
                    None,
                    format!("duplicate rule for '{}' ({:?})", rule.selector, rule.mode),
                ));
            }
            for template in rule.attributes.values() {
                if let Some(name) = template.variables().find(|v| !names.contains(v)) {
                    return Err(GridError::UnknownVariable {
                        name: name.to_string(),
                        selector: rule.selector.clone(),
                    });
                }
            }
        }

        let mut table: FxHashMap<String, [Option<ResolvedStyle>; 2]> = FxHashMap::default();
        for mode in [Mode::Light, Mode::Dark] {
            let lookup = |name: &str| {
                variables.iter().find(|v| v.name == name).map(|v| v.value(mode))
            };

            let mut ordered: Vec<&StyleRule> = rules.iter().filter(|r| r.mode.applies_to(mode)).collect();
            if precedence == Precedence::ModeSpecific {
                // Stable: declaration order is kept within each group.
                ordered.sort_by_key(|r| r.mode != RuleMode::Any);
            }

            for rule in ordered {
                let slot = &mut table.entry(rule.selector.clone()).or_default()[mode.index()];
                let style = slot.get_or_insert_with(ResolvedStyle::default);
                for (name, template) in &rule.attributes {
                    let value = template.render(&lookup).map_err(|missing| GridError::UnknownVariable {
                        name: missing.to_string(),
                        selector: rule.selector.clone(),
                    })?;
                    style.set(name.clone(), value);
                }
            }
        }

        Ok(Self { rules, variables, table })
    }
}

#[derive(Debug)]
struct Shared {
    theme: Rc<CompiledTheme>,
    precedence: Precedence,
    generation: u64,
}

/// Resolves style tags to concrete attributes.
///
/// Cloning the resolver yields another handle on the same rule set: a reload
/// through any handle is seen by every clone on its next `resolve`. Handles
/// are `!Send`; the grid is driven from one thread.
#[derive(Debug, Clone)]
pub struct StyleResolver {
    shared: Rc<RefCell<Shared>>,
}

impl Default for StyleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleResolver {
    /// Empty rule set: every tag resolves to the built-in defaults.
    pub fn new() -> Self {
        Self::with_precedence(Precedence::default())
    }

    pub fn with_precedence(precedence: Precedence) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                theme: Rc::new(CompiledTheme::default()),
                precedence,
                generation: 0,
            })),
        }
    }

    pub fn precedence(&self) -> Precedence {
        self.shared.borrow().precedence
    }

    /// Change precedence and recompile the current rule set.
    pub fn set_precedence(&self, precedence: Precedence) -> Result<()> {
        let (rules, variables) = {
            let shared = self.shared.borrow();
            if shared.precedence == precedence {
                return Ok(());
            }
            (shared.theme.rules.clone(), shared.theme.variables.clone())
        };
        let theme = CompiledTheme::compile(rules, variables, precedence)?;
        let mut shared = self.shared.borrow_mut();
        shared.precedence = precedence;
        shared.theme = Rc::new(theme);
        shared.generation += 1;
        Ok(())
    }

    /// Replace the rule set. On error the previous rule set stays active.
    pub fn load_rules(&self, rules: Vec<StyleRule>, variables: Vec<Variable>) -> Result<()> {
        let precedence = self.precedence();
        let (rule_count, var_count) = (rules.len(), variables.len());

        let theme = trace::timed("style.compile", || CompiledTheme::compile(rules, variables, precedence));
        let theme = match theme {
            Ok(theme) => theme,
            Err(e) => {
                log::debug!("rejected stylesheet: {e}");
                return Err(e);
            }
        };

        let mut shared = self.shared.borrow_mut();
        shared.theme = Rc::new(theme);
        shared.generation += 1;
        log::debug!(
            "loaded {rule_count} style rules, {var_count} variables (generation {})",
            shared.generation
        );
        Ok(())
    }

    /// Parse a stylesheet document and load it.
    pub fn load_document(&self, text: &str) -> Result<()> {
        let sheet = parse_document(text)?;
        self.load_rules(sheet.rules, sheet.variables)
    }

    /// Attributes for `tag` in `mode`. When no rule applies, the built-in
    /// defaults for the mode.
    pub fn resolve(&self, tag: &str, mode: Mode) -> ResolvedStyle {
        self.matched(tag, mode).unwrap_or_else(|| ResolvedStyle::defaults(mode))
    }

    /// Defaults overlaid with each tag's matched attributes, later tags
    /// winning. Tags without a rule contribute nothing.
    pub fn resolve_layers(&self, tags: &[&str], mode: Mode) -> ResolvedStyle {
        let theme = Rc::clone(&self.shared.borrow().theme);
        let mut style = ResolvedStyle::defaults(mode);
        for tag in tags {
            if let Some(Some(layer)) = theme.table.get(*tag).map(|t| &t[mode.index()]) {
                style.merge(layer);
            }
        }
        style
    }

    /// Whether any rule applies to `tag` in `mode`.
    pub fn has_rule(&self, tag: &str, mode: Mode) -> bool {
        self.matched(tag, mode).is_some()
    }

    fn matched(&self, tag: &str, mode: Mode) -> Option<ResolvedStyle> {
        let shared = self.shared.borrow();
        shared.theme.table.get(tag).and_then(|t| t[mode.index()].clone())
    }

    /// Bumped on every successful reload.
    pub fn generation(&self) -> u64 {
        self.shared.borrow().generation
    }

    pub fn rule_count(&self) -> usize {
        self.shared.borrow().theme.rules.len()
    }

    /// Selectors with at least one rule, sorted.
    pub fn selectors(&self) -> Vec<String> {
        let shared = self.shared.borrow();
        let mut out: Vec<String> = shared.theme.table.keys().cloned().collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::attr;

    fn accent_rules() -> (Vec<StyleRule>, Vec<Variable>) {
        (
            vec![StyleRule::new("header", RuleMode::Any).attr(attr::COLOR, "var(accent)")],
            vec![Variable::new("accent", "#000", "#fff")],
        )
    }

    #[test]
    fn test_variable_resolves_per_mode() {
        let resolver = StyleResolver::new();
        let (rules, vars) = accent_rules();
        resolver.load_rules(rules, vars).unwrap();

        assert_eq!(resolver.resolve("header", Mode::Dark).color(), Some("#fff"));
        assert_eq!(resolver.resolve("header", Mode::Light).color(), Some("#000"));
    }

    #[test]
    fn test_unknown_variable_keeps_previous_rules() {
        let resolver = StyleResolver::new();
        let (rules, vars) = accent_rules();
        resolver.load_rules(rules, vars).unwrap();
        let generation = resolver.generation();

        let bad = vec![StyleRule::new("header", RuleMode::Any).attr(attr::COLOR, "{missing}")];
        let err = resolver.load_rules(bad, vec![]).unwrap_err();
        assert_eq!(
            err,
            GridError::UnknownVariable { name: "missing".into(), selector: "header".into() }
        );

        assert_eq!(resolver.generation(), generation);
        assert_eq!(resolver.resolve("header", Mode::Dark).color(), Some("#fff"));
    }

    #[test]
    fn test_unmatched_tag_gets_defaults() {
        let resolver = StyleResolver::new();
        assert_eq!(resolver.resolve("nothing", Mode::Light), ResolvedStyle::defaults(Mode::Light));

        let rules = vec![StyleRule::new("header", RuleMode::Dark).attr(attr::COLOR, "red")];
        resolver.load_rules(rules, vec![]).unwrap();
        assert_eq!(resolver.resolve("header", Mode::Light), ResolvedStyle::defaults(Mode::Light));
        assert!(!resolver.has_rule("header", Mode::Light));
        assert!(resolver.has_rule("header", Mode::Dark));
    }

    #[test]
    fn test_mode_specific_overrides_any_per_attribute() {
        let resolver = StyleResolver::new();
        let rules = vec![
            StyleRule::new("cell", RuleMode::Dark).attr(attr::COLOR, "white"),
            StyleRule::new("cell", RuleMode::Any).attr(attr::COLOR, "gray").attr(attr::BOLD, "true"),
        ];
        resolver.load_rules(rules, vec![]).unwrap();

        let dark = resolver.resolve("cell", Mode::Dark);
        assert_eq!(dark.color(), Some("white"));
        assert!(dark.flag(attr::BOLD));

        let light = resolver.resolve("cell", Mode::Light);
        assert_eq!(light.color(), Some("gray"));
    }

    #[test]
    fn test_declaration_order_precedence() {
        let resolver = StyleResolver::with_precedence(Precedence::DeclarationOrder);
        let rules = vec![
            StyleRule::new("cell", RuleMode::Dark).attr(attr::COLOR, "white"),
            StyleRule::new("cell", RuleMode::Any).attr(attr::COLOR, "gray"),
        ];
        resolver.load_rules(rules, vec![]).unwrap();
        assert_eq!(resolver.resolve("cell", Mode::Dark).color(), Some("gray"));

        resolver.set_precedence(Precedence::ModeSpecific).unwrap();
        assert_eq!(resolver.resolve("cell", Mode::Dark).color(), Some("white"));
    }

    #[test]
    fn test_duplicates_rejected() {
        let resolver = StyleResolver::new();
        let rules = vec![
            StyleRule::new("cell", RuleMode::Any).attr(attr::COLOR, "a"),
            StyleRule::new("cell", RuleMode::Any).attr(attr::COLOR, "b"),
        ];
        assert!(matches!(resolver.load_rules(rules, vec![]), Err(GridError::StyleParse { .. })));

        let vars = vec![Variable::shared("x", "1"), Variable::shared("x", "2")];
        assert!(matches!(resolver.load_rules(vec![], vars), Err(GridError::StyleParse { .. })));

        let rules = vec![StyleRule::new("", RuleMode::Any)];
        assert!(matches!(resolver.load_rules(rules, vec![]), Err(GridError::StyleParse { .. })));
        assert_eq!(resolver.generation(), 0);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = StyleResolver::new();
        resolver
            .load_document("a = #111 / #eee\n#-----#\nheader { color: {a}; border: 1px solid {a}; }")
            .unwrap();
        let first = resolver.resolve("header", Mode::Light);
        let second = resolver.resolve("header", Mode::Light);
        assert_eq!(first, second);
        assert_eq!(first.get("border"), Some("1px solid #111"));
    }

    #[test]
    fn test_clones_share_rule_set() {
        let resolver = StyleResolver::new();
        let other = resolver.clone();
        resolver.load_document("header { color: red }").unwrap();
        assert_eq!(other.resolve("header", Mode::Dark).color(), Some("red"));
        assert_eq!(other.generation(), 1);
        assert_eq!(other.rule_count(), 1);
    }

    #[test]
    fn test_resolve_layers_merges_in_order() {
        let resolver = StyleResolver::new();
        resolver
            .load_document(
                "cell { color: gray }\nwarn { color: orange; bold: true }\nselected-cell { background: blue }",
            )
            .unwrap();

        let style = resolver.resolve_layers(&["cell", "warn", "missing", "selected-cell"], Mode::Dark);
        assert_eq!(style.color(), Some("orange"));
        assert_eq!(style.background(), Some("blue"));
        assert!(style.flag(attr::BOLD));

        let plain = resolver.resolve_layers(&[], Mode::Light);
        assert_eq!(plain, ResolvedStyle::defaults(Mode::Light));
    }
}
