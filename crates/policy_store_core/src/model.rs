use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// In-memory policy rules, grouped the way the enforcement engine keys them:
/// section letter → rule-kind → ordered list of rule tuples.
///
/// The section is the rule-kind's first character, so permission kinds
/// (`"p"`, `"p2"`, …) land in section `"p"` and role-grouping kinds (`"g"`,
/// `"g2"`, …) in section `"g"`. A store appends to and iterates this
/// structure; it never reorders or rewrites entries it does not touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyModel {
    sections: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

impl PolicyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Section letter for a rule-kind: its first character.
    pub fn section_of(kind: &str) -> String {
        kind.chars().next().map(String::from).unwrap_or_default()
    }

    /// Append one rule tuple under its kind, preserving insertion order.
    pub fn add_rule(&mut self, kind: &str, rule: Vec<String>) {
        self.sections
            .entry(Self::section_of(kind))
            .or_default()
            .entry(kind.to_string())
            .or_default()
            .push(rule);
    }

    /// Rules stored under a kind, in insertion order. Empty if absent.
    pub fn rules(&self, kind: &str) -> &[Vec<String>] {
        self.sections
            .get(&Self::section_of(kind))
            .and_then(|kinds| kinds.get(kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every `(kind, rule)` pair across all sections.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sections.values().flat_map(|kinds| {
            kinds.iter().flat_map(|(kind, rules)| {
                rules.iter().map(move |rule| (kind.as_str(), rule.as_slice()))
            })
        })
    }

    pub fn rule_count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Drop every rule while keeping the value usable for a reload.
    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn kinds_bucket_under_first_character() {
        let mut model = PolicyModel::new();
        model.add_rule("p", rule(&["alice", "data1", "read"]));
        model.add_rule("p2", rule(&["bob", "data2", "write"]));
        model.add_rule("g", rule(&["alice", "data2_admin"]));

        assert_eq!(PolicyModel::section_of("p2"), "p");
        assert_eq!(model.rules("p"), &[rule(&["alice", "data1", "read"])]);
        assert_eq!(model.rules("p2"), &[rule(&["bob", "data2", "write"])]);
        assert_eq!(model.rules("g"), &[rule(&["alice", "data2_admin"])]);
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut model = PolicyModel::new();
        model.add_rule("p", rule(&["c"]));
        model.add_rule("p", rule(&["a"]));
        model.add_rule("p", rule(&["b"]));
        assert_eq!(model.rules("p"), &[rule(&["c"]), rule(&["a"]), rule(&["b"])]);
    }

    #[test]
    fn add_leaves_sibling_kinds_untouched() {
        let mut model = PolicyModel::new();
        model.add_rule("p", rule(&["alice", "data1", "read"]));
        let before = model.rules("p").to_vec();

        model.add_rule("p2", rule(&["bob", "data2", "write"]));
        assert_eq!(model.rules("p"), before.as_slice());
    }

    #[test]
    fn missing_kind_is_empty() {
        let model = PolicyModel::new();
        assert!(model.rules("p").is_empty());
    }

    #[test]
    fn iter_spans_all_sections() {
        let mut model = PolicyModel::new();
        model.add_rule("p", rule(&["alice", "data1", "read"]));
        model.add_rule("g", rule(&["alice", "data2_admin"]));
        model.add_rule("p", rule(&["bob", "data2", "write"]));

        let all: Vec<(String, Vec<String>)> = model
            .iter()
            .map(|(kind, r)| (kind.to_string(), r.to_vec()))
            .collect();
        assert_eq!(all.len(), 3);
        assert_eq!(model.rule_count(), 3);
        assert!(all.contains(&("g".to_string(), rule(&["alice", "data2_admin"]))));
    }

    #[test]
    fn clear_empties_the_model() {
        let mut model = PolicyModel::new();
        model.add_rule("p", rule(&["alice", "data1", "read"]));
        assert!(!model.is_empty());
        model.clear();
        assert!(model.is_empty());
        assert_eq!(model.rule_count(), 0);
    }
}
