//! The ordered rewrite-rule table.
//!
//!     Every conversion step is a [`TransformRule`]: a name, an order, the kind of segment it
//!     applies to and a rewrite. A rewrite is either a regex plus a pure handler for each match,
//!     or a whole-segment pass for steps that need lookahead (lists) or context (images, code
//!     listings). Rules run in ascending order and each one sees the complete output of the
//!     previous one.

use crate::diagnostics::Diagnostic;
use crate::options::ConvertOptions;
use crate::stash::Stash;
use crate::transforms::images::ImageLocator;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;

/// Regions pattern rules with `shield: true` never see: inline code spans, inline math and
/// image references.
static SHIELDED_REGIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`[^`\n]+`|\\\$|\$[^$\n]+\$|!\s*\[[^\]\n]*\]\s*\([^)\n]*\)").unwrap()
});

const SHIELD_OPEN: char = '\u{E000}';
const SHIELD_CLOSE: char = '\u{E001}';

pub type PatternHandler = fn(&Captures<'_>) -> String;
pub type PassHandler = fn(&str, &mut RuleContext<'_>) -> String;

/// Which kind of segment a rule rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    Text,
    Code,
}

#[derive(Clone, Copy)]
pub enum Rewrite {
    /// Replace every match of `pattern` with `handler(match)`.
    Pattern {
        pattern: &'static Lazy<Regex>,
        handler: PatternHandler,
        /// Skip inline code spans and inline math
        shield: bool,
    },
    /// Rewrite the whole segment at once.
    Pass(PassHandler),
}

#[derive(Clone)]
pub struct TransformRule {
    pub name: &'static str,
    pub order: u16,
    pub target: RuleTarget,
    pub rewrite: Rewrite,
}

impl TransformRule {
    pub fn pattern(
        name: &'static str,
        order: u16,
        pattern: &'static Lazy<Regex>,
        handler: PatternHandler,
    ) -> Self {
        Self {
            name,
            order,
            target: RuleTarget::Text,
            rewrite: Rewrite::Pattern {
                pattern,
                handler,
                shield: true,
            },
        }
    }

    pub fn pass(name: &'static str, order: u16, target: RuleTarget, handler: PassHandler) -> Self {
        Self {
            name,
            order,
            target,
            rewrite: Rewrite::Pass(handler),
        }
    }

    /// Let a pattern rule see inside code spans and math.
    pub fn unshielded(mut self) -> Self {
        if let Rewrite::Pattern { shield, .. } = &mut self.rewrite {
            *shield = false;
        }
        self
    }

    pub fn apply(&self, text: &str, ctx: &mut RuleContext<'_>) -> String {
        match self.rewrite {
            Rewrite::Pattern {
                pattern,
                handler,
                shield: true,
            } => {
                let mut stash = Stash::new(SHIELD_OPEN, SHIELD_CLOSE);
                let hidden = stash.protect(&SHIELDED_REGIONS, text);
                let rewritten = pattern.replace_all(&hidden, |caps: &Captures<'_>| handler(caps));
                stash.restore(&rewritten)
            }
            Rewrite::Pattern {
                pattern,
                handler,
                shield: false,
            } => pattern
                .replace_all(text, |caps: &Captures<'_>| handler(caps))
                .into_owned(),
            Rewrite::Pass(handler) => handler(text, ctx),
        }
    }
}

impl fmt::Debug for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.rewrite {
            Rewrite::Pattern { .. } => "pattern",
            Rewrite::Pass(_) => "pass",
        };
        f.debug_struct("TransformRule")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("target", &self.target)
            .field("kind", &kind)
            .finish()
    }
}

/// Read-only configuration plus the diagnostics sink shared by one segment's rules.
pub struct RuleContext<'a> {
    pub options: &'a ConvertOptions,
    pub locator: &'a dyn ImageLocator,
    /// Language tag of the code segment being rendered
    pub language: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> RuleContext<'a> {
    pub fn new(options: &'a ConvertOptions, locator: &'a dyn ImageLocator) -> Self {
        Self {
            options,
            locator,
            language: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn warn(&mut self, rule: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(rule, message));
    }
}

/// Ordered collection of transform rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<TransformRule>,
}

impl RuleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the standard conversion pipeline
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for rule in crate::transforms::default_rules() {
            table.register(rule);
        }
        table
    }

    /// Add a rule, keeping the table sorted by order.
    ///
    /// A rule with the same name replaces the existing one. Rules sharing an order value
    /// run in registration order.
    pub fn register(&mut self, rule: TransformRule) {
        self.remove(rule.name);
        let index = self.rules.partition_point(|existing| existing.order <= rule.order);
        self.rules.insert(index, rule);
    }

    pub fn remove(&mut self, name: &str) -> Option<TransformRule> {
        let index = self.rules.iter().position(|rule| rule.name == name)?;
        Some(self.rules.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&TransformRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rule names in application order
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name).collect()
    }

    pub fn rules_for(&self, target: RuleTarget) -> impl Iterator<Item = &TransformRule> {
        self.rules.iter().filter(move |rule| rule.target == target)
    }

    /// Run every rule for `target` over `text`, in order.
    pub fn apply(&self, target: RuleTarget, text: &str, ctx: &mut RuleContext<'_>) -> String {
        let mut current = text.to_string();
        for rule in self.rules_for(target) {
            current = rule.apply(&current, ctx);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::images::DirectoryLocator;

    static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"foo").unwrap());

    fn shout(_: &Captures<'_>) -> String {
        "FOO".to_string()
    }

    fn append_bang(text: &str, _: &mut RuleContext<'_>) -> String {
        format!("{text}!")
    }

    fn wrap(text: &str, _: &mut RuleContext<'_>) -> String {
        format!("[{text}]")
    }

    fn run(table: &RuleTable, text: &str) -> String {
        let options = ConvertOptions::default();
        let locator = DirectoryLocator::default();
        let mut ctx = RuleContext::new(&options, &locator);
        table.apply(RuleTarget::Text, text, &mut ctx)
    }

    #[test]
    fn rules_apply_in_ascending_order() {
        let mut table = RuleTable::new();
        table.register(TransformRule::pass("wrap", 20, RuleTarget::Text, wrap));
        table.register(TransformRule::pass("bang", 10, RuleTarget::Text, append_bang));
        assert_eq!(table.names(), vec!["bang", "wrap"]);
        assert_eq!(run(&table, "x"), "[x!]");
    }

    #[test]
    fn equal_orders_keep_registration_order() {
        let mut table = RuleTable::new();
        table.register(TransformRule::pass("wrap", 10, RuleTarget::Text, wrap));
        table.register(TransformRule::pass("bang", 10, RuleTarget::Text, append_bang));
        assert_eq!(run(&table, "x"), "[x]!");
    }

    #[test]
    fn register_replaces_rule_with_same_name() {
        let mut table = RuleTable::new();
        table.register(TransformRule::pass("step", 10, RuleTarget::Text, wrap));
        table.register(TransformRule::pass("step", 5, RuleTarget::Text, append_bang));
        assert_eq!(table.names(), vec!["step"]);
        assert_eq!(run(&table, "x"), "x!");
    }

    #[test]
    fn code_rules_do_not_touch_text() {
        let mut table = RuleTable::new();
        table.register(TransformRule::pass("bang", 10, RuleTarget::Code, append_bang));
        assert_eq!(run(&table, "x"), "x");
    }

    #[test]
    fn shielded_patterns_skip_code_spans_and_math() {
        let mut table = RuleTable::new();
        table.register(TransformRule::pattern("shout", 10, &WORD, shout));
        assert_eq!(run(&table, "foo `foo` $foo$ foo"), "FOO `foo` $foo$ FOO");
    }

    #[test]
    fn shielded_patterns_skip_image_references() {
        let mut table = RuleTable::new();
        table.register(TransformRule::pattern("shout", 10, &WORD, shout));
        assert_eq!(
            run(&table, "foo ![foo](img/foo.png)"),
            "FOO ![foo](img/foo.png)"
        );
    }

    #[test]
    fn unshielded_patterns_see_everything() {
        let mut table = RuleTable::new();
        table.register(TransformRule::pattern("shout", 10, &WORD, shout).unshielded());
        assert_eq!(run(&table, "foo `foo`"), "FOO `FOO`");
    }

    #[test]
    fn remove_and_lookup() {
        let mut table = RuleTable::with_defaults();
        assert!(table.has("lists"));
        assert!(table.remove("lists").is_some());
        assert!(!table.has("lists"));
        assert!(table.get("missing").is_none());
    }
}
