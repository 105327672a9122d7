//! Row ↔ rule-tuple mapping.
//!
//! One persisted row is the rule-kind plus six positional value columns.
//! The mapping is an explicit column walk in both directions; nothing here
//! relies on derive-based row scanning.

use sqlx::postgres::PgRow;
use sqlx::Row;

/// Hard limit of the table layout: six value fields per rule.
pub const MAX_FIELDS: usize = 6;

pub(crate) const VALUE_COLUMNS: [&str; MAX_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// One row of the policy table, minus the surrogate `id`/`created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleRow {
    pub kind: String,
    pub values: [String; MAX_FIELDS],
}

impl RuleRow {
    /// Build a row from a rule tuple. Positions past the sixth are dropped;
    /// the table cannot store them.
    pub fn from_rule(kind: &str, rule: &[String]) -> Self {
        let mut values: [String; MAX_FIELDS] = Default::default();
        for (slot, field) in values.iter_mut().zip(rule) {
            *slot = field.clone();
        }
        Self {
            kind: kind.to_string(),
            values,
        }
    }

    /// Split back into `(kind, tuple)`. Trailing empty fields are trimmed;
    /// an empty field before the last non-empty one is preserved, since its
    /// position carries meaning for the engine.
    pub fn into_parts(self) -> (String, Vec<String>) {
        let Self { kind, values } = self;
        let mut tuple: Vec<String> = values.into_iter().collect();
        while tuple.last().is_some_and(String::is_empty) {
            tuple.pop();
        }
        (kind, tuple)
    }
}

/// Explicit column-by-column read. Pre-existing tables may hold NULLs where
/// this store writes `''`; both read back as the empty string.
pub(crate) fn row_to_rule(row: &PgRow) -> Result<RuleRow, sqlx::Error> {
    let kind = row
        .try_get::<Option<String>, _>("p_type")?
        .unwrap_or_default();
    let mut values: [String; MAX_FIELDS] = Default::default();
    for (slot, column) in values.iter_mut().zip(VALUE_COLUMNS) {
        *slot = row.try_get::<Option<String>, _>(column)?.unwrap_or_default();
    }
    Ok(RuleRow { kind, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_rules_leave_tail_columns_empty() {
        let row = RuleRow::from_rule("p", &rule(&["alice", "data1", "read"]));
        assert_eq!(row.kind, "p");
        assert_eq!(row.values[0], "alice");
        assert_eq!(row.values[2], "read");
        assert_eq!(row.values[3], "");
        assert_eq!(row.values[5], "");
    }

    #[test]
    fn positions_past_the_sixth_are_dropped() {
        let wide = rule(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let row = RuleRow::from_rule("p", &wide);
        assert_eq!(row.values, rule(&["a", "b", "c", "d", "e", "f"]).as_slice());
    }

    #[test]
    fn round_trip_trims_trailing_empties() {
        let row = RuleRow::from_rule("p", &rule(&["alice", "data1", "read"]));
        let (kind, tuple) = row.into_parts();
        assert_eq!(kind, "p");
        assert_eq!(tuple, rule(&["alice", "data1", "read"]));
    }

    #[test]
    fn middle_empty_fields_survive() {
        let row = RuleRow::from_rule("p", &rule(&["alice", "", "read"]));
        let (_, tuple) = row.into_parts();
        assert_eq!(tuple, rule(&["alice", "", "read"]));
    }

    #[test]
    fn empty_rule_becomes_empty_tuple() {
        let (kind, tuple) = RuleRow::from_rule("g", &[]).into_parts();
        assert_eq!(kind, "g");
        assert!(tuple.is_empty());
    }
}
