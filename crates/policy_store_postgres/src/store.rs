//! PostgreSQL-backed policy store.
//!
//! A newtype over `PgPool` plus the resolved table name. Multi-statement
//! operations (`save_policy`, `add_policies`, the `update_*` family) each
//! run inside one transaction; a failure on any statement rolls back the
//! lot. Single-statement operations rely on the database's own atomicity.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, instrument};

use policy_store_core::{PolicyFilter, PolicyModel, PolicyStore, Result, StoreError};

use crate::config::{resolve_table, StoreConfig};
use crate::rule::{row_to_rule, RuleRow, MAX_FIELDS};
use crate::sql;

/// Rows per `INSERT` statement when bulk-writing large rule sets.
const INSERT_BATCH: usize = 1000;

#[derive(Debug)]
pub struct PgPolicyStore {
    pool: PgPool,
    table: String,
    filtered: bool,
}

impl PgPolicyStore {
    /// Wrap an existing pool. An empty `table` selects the default; the
    /// policy table is created when absent.
    pub async fn with_pool(pool: PgPool, table: &str) -> Result<Self> {
        let table = resolve_table(table)?;
        let store = Self {
            pool,
            table,
            filtered: false,
        };
        store.ensure_table().await?;
        Ok(store)
    }

    /// Connect per `config` and ensure the policy table exists.
    #[instrument(skip(config), fields(table = %config.table_or_default()))]
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(StoreError::Config("database_url is empty".into()));
        }
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Config(format!("failed to connect: {e}")))?;
        Self::with_pool(pool, &config.table).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the policy table when absent. Safe to race from multiple
    /// initializers against the same database.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(&sql::create_table(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| self.err("ensure_table", e))?;
        Ok(())
    }

    pub async fn drop_table(&self) -> Result<()> {
        sqlx::query(&sql::drop_table(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| self.err("drop_table", e))?;
        Ok(())
    }

    pub async fn truncate_table(&self) -> Result<()> {
        sqlx::query(&sql::truncate_table(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| self.err("truncate_table", e))?;
        Ok(())
    }

    fn err(&self, op: &'static str, source: impl Into<anyhow::Error>) -> StoreError {
        StoreError::storage(op, &self.table, source)
    }

    async fn fetch_rules(
        &self,
        filter: Option<&PolicyFilter>,
        op: &'static str,
    ) -> Result<Vec<RuleRow>> {
        let rows = sql::select_rules(&self.table, filter)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.err(op, e))?;
        rows.iter()
            .map(row_to_rule)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| self.err(op, e))
    }

    async fn insert_chunked(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        rows: &[RuleRow],
        op: &'static str,
    ) -> Result<()> {
        for chunk in rows.chunks(INSERT_BATCH) {
            sql::insert_rules(&self.table, chunk)
                .build()
                .execute(&mut **tx)
                .await
                .map_err(|e| self.err(op, e))?;
        }
        Ok(())
    }
}

// Exact-match deletes constrain at most the six stored value fields;
// truncating a wider tuple would silently widen the match instead.
fn ensure_rule_width(rule: &[String]) -> Result<()> {
    if rule.len() > MAX_FIELDS {
        return Err(StoreError::InvalidFilter(format!(
            "rule has {} fields; a match can constrain at most {MAX_FIELDS}",
            rule.len()
        )));
    }
    Ok(())
}

fn ensure_window(start: usize, len: usize) -> Result<()> {
    if start + len > MAX_FIELDS {
        return Err(StoreError::InvalidFilter(format!(
            "positional window [{start}, {}) exceeds the {MAX_FIELDS} value fields",
            start + len
        )));
    }
    Ok(())
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    #[instrument(skip(self, model))]
    async fn load_policy(&mut self, model: &mut PolicyModel) -> Result<()> {
        let rows = self.fetch_rules(None, "load_policy").await?;
        let count = rows.len();
        for row in rows {
            let (kind, tuple) = row.into_parts();
            if kind.is_empty() {
                // a blank p_type carries no rule
                continue;
            }
            model.add_rule(&kind, tuple);
        }
        self.filtered = false;
        debug!(rows = count, "loaded policy");
        Ok(())
    }

    #[instrument(skip(self, model, filter))]
    async fn load_filtered_policy(
        &mut self,
        model: &mut PolicyModel,
        filter: &PolicyFilter,
    ) -> Result<()> {
        let rows = self.fetch_rules(Some(filter), "load_filtered_policy").await?;
        let count = rows.len();
        for row in rows {
            let (kind, tuple) = row.into_parts();
            if kind.is_empty() {
                continue;
            }
            model.add_rule(&kind, tuple);
        }
        self.filtered = true;
        debug!(rows = count, "loaded filtered policy");
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    #[instrument(skip(self, model))]
    async fn save_policy(&self, model: &PolicyModel) -> Result<()> {
        let rows: Vec<RuleRow> = model
            .iter()
            .map(|(kind, rule)| RuleRow::from_rule(kind, rule))
            .collect();

        // Truncate and re-insert in one transaction: readers see either the
        // old rule set or the new one, never a half-written table.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.err("save_policy", e))?;
        sqlx::query(&sql::truncate_table(&self.table))
            .execute(&mut *tx)
            .await
            .map_err(|e| self.err("save_policy", e))?;
        self.insert_chunked(&mut tx, &rows, "save_policy").await?;
        tx.commit().await.map_err(|e| self.err("save_policy", e))?;

        debug!(rows = rows.len(), "saved policy wholesale");
        Ok(())
    }

    #[instrument(skip(self, rule))]
    async fn add_policy(&self, kind: &str, rule: &[String]) -> Result<()> {
        let row = RuleRow::from_rule(kind, rule);
        sql::insert_rules(&self.table, std::slice::from_ref(&row))
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.err("add_policy", e))?;
        Ok(())
    }

    #[instrument(skip(self, rules))]
    async fn add_policies(&self, kind: &str, rules: &[Vec<String>]) -> Result<()> {
        if rules.is_empty() {
            return Ok(());
        }
        let rows: Vec<RuleRow> = rules
            .iter()
            .map(|rule| RuleRow::from_rule(kind, rule))
            .collect();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.err("add_policies", e))?;
        self.insert_chunked(&mut tx, &rows, "add_policies").await?;
        tx.commit().await.map_err(|e| self.err("add_policies", e))?;
        debug!(rows = rows.len(), "added policies");
        Ok(())
    }

    #[instrument(skip(self, rule))]
    async fn remove_policy(&self, kind: &str, rule: &[String]) -> Result<()> {
        ensure_rule_width(rule)?;
        let exact = [rule.to_vec()];
        let result = sql::delete_matching(&self.table, kind, &exact)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.err("remove_policy", e))?;
        // matching nothing is success (idempotent delete)
        debug!(rows = result.rows_affected(), "removed policy");
        Ok(())
    }

    #[instrument(skip(self, rules))]
    async fn remove_policies(&self, kind: &str, rules: &[Vec<String>]) -> Result<()> {
        if rules.is_empty() {
            return Ok(());
        }
        for rule in rules {
            ensure_rule_width(rule)?;
        }
        let result = sql::delete_matching(&self.table, kind, rules)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.err("remove_policies", e))?;
        debug!(rows = result.rows_affected(), "removed policies");
        Ok(())
    }

    #[instrument(skip(self, field_values))]
    async fn remove_filtered_policy(
        &self,
        kind: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<()> {
        ensure_window(field_index, field_values.len())?;
        let result = sql::delete_window(&self.table, kind, field_index, field_values)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| self.err("remove_filtered_policy", e))?;
        debug!(rows = result.rows_affected(), "removed filtered policy");
        Ok(())
    }

    #[instrument(skip(self, old_rule, new_rule))]
    async fn update_policy(
        &self,
        kind: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> Result<()> {
        ensure_rule_width(old_rule)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.err("update_policy", e))?;
        let exact = [old_rule.to_vec()];
        sql::delete_matching(&self.table, kind, &exact)
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| self.err("update_policy", e))?;
        let row = RuleRow::from_rule(kind, new_rule);
        sql::insert_rules(&self.table, std::slice::from_ref(&row))
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| self.err("update_policy", e))?;
        tx.commit().await.map_err(|e| self.err("update_policy", e))?;
        Ok(())
    }

    #[instrument(skip(self, old_rules, new_rules))]
    async fn update_policies(
        &self,
        kind: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<()> {
        if old_rules.len() != new_rules.len() {
            return Err(StoreError::LengthMismatch {
                old: old_rules.len(),
                new: new_rules.len(),
            });
        }
        if old_rules.is_empty() {
            return Ok(());
        }
        for rule in old_rules {
            ensure_rule_width(rule)?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.err("update_policies", e))?;
        for (old, new) in old_rules.iter().zip(new_rules) {
            let exact = [old.clone()];
            sql::delete_matching(&self.table, kind, &exact)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| self.err("update_policies", e))?;
            let row = RuleRow::from_rule(kind, new);
            sql::insert_rules(&self.table, std::slice::from_ref(&row))
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| self.err("update_policies", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| self.err("update_policies", e))?;
        debug!(pairs = old_rules.len(), "updated policies");
        Ok(())
    }

    #[instrument(skip(self, new_rules, field_values))]
    async fn update_filtered_policies(
        &self,
        kind: &str,
        new_rules: &[Vec<String>],
        field_index: usize,
        field_values: &[String],
    ) -> Result<Vec<Vec<String>>> {
        ensure_window(field_index, field_values.len())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| self.err("update_filtered_policies", e))?;
        let rows = sql::select_window(&self.table, kind, field_index, field_values)
            .build()
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| self.err("update_filtered_policies", e))?;
        let old = rows
            .iter()
            .map(row_to_rule)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| self.err("update_filtered_policies", e))?;
        sql::delete_window(&self.table, kind, field_index, field_values)
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| self.err("update_filtered_policies", e))?;
        let replacements: Vec<RuleRow> = new_rules
            .iter()
            .map(|rule| RuleRow::from_rule(kind, rule))
            .collect();
        self.insert_chunked(&mut tx, &replacements, "update_filtered_policies")
            .await?;
        tx.commit()
            .await
            .map_err(|e| self.err("update_filtered_policies", e))?;

        debug!(
            replaced = old.len(),
            inserted = replacements.len(),
            "replaced filtered policies"
        );
        Ok(old.into_iter().map(|row| row.into_parts().1).collect())
    }
}
