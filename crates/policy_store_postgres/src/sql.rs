//! Statement builders.
//!
//! Table names are interpolated, which is safe because they are validated as
//! identifiers at construction; every value travels as a bind parameter.
//! Empty-string match values add no constraint — that is the documented
//! contract for exact and positional-window matching.

use sqlx::{Postgres, QueryBuilder};

use policy_store_core::PolicyFilter;

use crate::rule::RuleRow;

pub(crate) fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
         id BIGSERIAL PRIMARY KEY, \
         p_type VARCHAR(10) NOT NULL DEFAULT '', \
         v0 VARCHAR(256) NOT NULL DEFAULT '', \
         v1 VARCHAR(256) NOT NULL DEFAULT '', \
         v2 VARCHAR(256) NOT NULL DEFAULT '', \
         v3 VARCHAR(256) NOT NULL DEFAULT '', \
         v4 VARCHAR(256) NOT NULL DEFAULT '', \
         v5 VARCHAR(256) NOT NULL DEFAULT '', \
         created_at TIMESTAMPTZ NOT NULL DEFAULT now())"
    )
}

pub(crate) fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

pub(crate) fn truncate_table(table: &str) -> String {
    format!("TRUNCATE TABLE {table}")
}

/// `SELECT` of every rule column, optionally restricted by per-field value
/// sets (`= ANY`), always in insertion (`id`) order.
pub(crate) fn select_rules(
    table: &str,
    filter: Option<&PolicyFilter>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT p_type, v0, v1, v2, v3, v4, v5 FROM {table}"
    ));
    if let Some(filter) = filter {
        let mut sep = " WHERE ";
        for (column, values) in filter.fields() {
            if values.is_empty() {
                continue;
            }
            qb.push(sep);
            sep = " AND ";
            qb.push(column);
            qb.push(" = ANY(");
            qb.push_bind(values.to_vec());
            qb.push(")");
        }
    }
    qb.push(" ORDER BY id ASC");
    qb
}

/// Multi-row `INSERT` for a non-empty batch.
pub(crate) fn insert_rules(table: &str, rows: &[RuleRow]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {table} (p_type, v0, v1, v2, v3, v4, v5) "
    ));
    qb.push_values(rows, |mut b, row| {
        b.push_bind(row.kind.clone());
        for value in &row.values {
            b.push_bind(value.clone());
        }
    });
    qb
}

/// `DELETE` matching any of `rules`: OR across tuples, AND within a tuple's
/// supplied non-empty fields. `rules` must be non-empty.
pub(crate) fn delete_matching(
    table: &str,
    kind: &str,
    rules: &[Vec<String>],
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {table} WHERE "));
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push("(p_type = ");
        qb.push_bind(kind.to_string());
        for (position, value) in rule.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            qb.push(format!(" AND v{position} = "));
            qb.push_bind(value.clone());
        }
        qb.push(")");
    }
    qb
}

/// `SELECT` of the rows a positional window matches, in insertion order.
pub(crate) fn select_window(
    table: &str,
    kind: &str,
    start: usize,
    values: &[String],
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT p_type, v0, v1, v2, v3, v4, v5 FROM {table} WHERE "
    ));
    push_window(&mut qb, kind, start, values);
    qb.push(" ORDER BY id ASC");
    qb
}

/// `DELETE` of the rows a positional window matches.
pub(crate) fn delete_window(
    table: &str,
    kind: &str,
    start: usize,
    values: &[String],
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {table} WHERE "));
    push_window(&mut qb, kind, start, values);
    qb
}

fn push_window(qb: &mut QueryBuilder<'static, Postgres>, kind: &str, start: usize, values: &[String]) {
    qb.push("p_type = ");
    qb.push_bind(kind.to_string());
    for (offset, value) in values.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        qb.push(format!(" AND v{} = ", start + offset));
        qb.push_bind(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_table_carries_the_full_schema() {
        let sql = create_table("casbin_rule");
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS casbin_rule"));
        assert!(sql.contains("p_type VARCHAR(10)"));
        assert!(sql.contains("v5 VARCHAR(256)"));
        assert!(sql.contains("created_at TIMESTAMPTZ"));
    }

    #[test]
    fn select_without_filter_orders_by_id() {
        let sql = select_rules("casbin_rule", None).into_sql();
        assert_eq!(
            sql,
            "SELECT p_type, v0, v1, v2, v3, v4, v5 FROM casbin_rule ORDER BY id ASC"
        );
    }

    #[test]
    fn select_with_filter_ands_the_constrained_fields() {
        let filter = PolicyFilter {
            p_type: vec!["p".into()],
            v0: vec!["alice".into(), "bob".into()],
            ..Default::default()
        };
        let sql = select_rules("casbin_rule", Some(&filter)).into_sql();
        assert_eq!(
            sql,
            "SELECT p_type, v0, v1, v2, v3, v4, v5 FROM casbin_rule \
             WHERE p_type = ANY($1) AND v0 = ANY($2) ORDER BY id ASC"
        );
    }

    #[test]
    fn empty_filter_adds_no_where_clause() {
        let filter = PolicyFilter::default();
        let sql = select_rules("casbin_rule", Some(&filter)).into_sql();
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn insert_batches_rows_into_one_statement() {
        let rows = [
            RuleRow::from_rule("p", &rule(&["alice", "data1", "read"])),
            RuleRow::from_rule("p", &rule(&["bob", "data2", "write"])),
        ];
        let sql = insert_rules("casbin_rule", &rows).into_sql();
        assert!(sql.starts_with(
            "INSERT INTO casbin_rule (p_type, v0, v1, v2, v3, v4, v5) VALUES "
        ));
        // seven binds per row
        assert!(sql.contains("($1, $2, $3, $4, $5, $6, $7)"));
        assert!(sql.contains("($8, $9, $10, $11, $12, $13, $14)"));
    }

    #[test]
    fn delete_matching_is_or_of_ands() {
        let rules = [rule(&["max", "data2", "read"]), rule(&["max", "data1"])];
        let sql = delete_matching("casbin_rule", "p", &rules).into_sql();
        assert_eq!(
            sql,
            "DELETE FROM casbin_rule WHERE \
             (p_type = $1 AND v0 = $2 AND v1 = $3 AND v2 = $4) OR \
             (p_type = $5 AND v0 = $6 AND v1 = $7)"
        );
    }

    #[test]
    fn delete_matching_skips_empty_fields() {
        let rules = [rule(&["alice", "", "read"])];
        let sql = delete_matching("casbin_rule", "p", &rules).into_sql();
        assert_eq!(
            sql,
            "DELETE FROM casbin_rule WHERE (p_type = $1 AND v0 = $2 AND v2 = $3)"
        );
    }

    #[test]
    fn window_constrains_consecutive_fields_from_start() {
        let sql = delete_window("casbin_rule", "p", 1, &rule(&["data2", "write"])).into_sql();
        assert_eq!(
            sql,
            "DELETE FROM casbin_rule WHERE p_type = $1 AND v1 = $2 AND v2 = $3"
        );
    }

    #[test]
    fn window_skips_empty_values_but_keeps_positions() {
        let sql = delete_window("casbin_rule", "p", 0, &rule(&["alice", "", "read"])).into_sql();
        assert_eq!(
            sql,
            "DELETE FROM casbin_rule WHERE p_type = $1 AND v0 = $2 AND v2 = $3"
        );
    }

    #[test]
    fn select_window_orders_by_id() {
        let sql = select_window("casbin_rule", "p", 0, &rule(&["bob"])).into_sql();
        assert_eq!(
            sql,
            "SELECT p_type, v0, v1, v2, v3, v4, v5 FROM casbin_rule \
             WHERE p_type = $1 AND v0 = $2 ORDER BY id ASC"
        );
    }

    #[test]
    fn lifecycle_statements_name_the_table() {
        assert_eq!(drop_table("authz.rules"), "DROP TABLE IF EXISTS authz.rules");
        assert_eq!(truncate_table("authz.rules"), "TRUNCATE TABLE authz.rules");
    }
}
