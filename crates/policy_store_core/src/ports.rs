//! The storage port the enforcement engine drives.
//! Implemented by the database adapter crates — the engine depends only on
//! this trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::PolicyFilter;
use crate::model::PolicyModel;

/// Persistence contract for policy rules.
///
/// Loads take `&mut self` because they track whether the store currently
/// reflects a filtered view. Mutations are independently safe to call from
/// concurrent owners; atomicity of multi-row operations is the
/// implementation's responsibility, documented per method.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Append every persisted rule to `model`, in storage insertion order.
    /// Clears the filtered marker.
    async fn load_policy(&mut self, model: &mut PolicyModel) -> Result<()>;

    /// Like [`load_policy`](Self::load_policy), restricted to rows matching
    /// `filter`, and marks the store filtered.
    async fn load_filtered_policy(
        &mut self,
        model: &mut PolicyModel,
        filter: &PolicyFilter,
    ) -> Result<()>;

    /// True when the last load was filtered, i.e. a save would persist a
    /// partial view.
    fn is_filtered(&self) -> bool;

    /// Atomically replace everything persisted with the rules in `model`.
    async fn save_policy(&self, model: &PolicyModel) -> Result<()>;

    /// Persist one rule.
    async fn add_policy(&self, kind: &str, rule: &[String]) -> Result<()>;

    /// Persist a batch of rules of one kind, all-or-nothing.
    async fn add_policies(&self, kind: &str, rules: &[Vec<String>]) -> Result<()>;

    /// Delete rules matching `kind` and every supplied field of `rule`
    /// exactly. Matching nothing is success.
    async fn remove_policy(&self, kind: &str, rule: &[String]) -> Result<()>;

    /// Delete rules matching any of `rules` (each matched as in
    /// [`remove_policy`](Self::remove_policy)).
    async fn remove_policies(&self, kind: &str, rules: &[Vec<String>]) -> Result<()>;

    /// Delete rules whose fields starting at `field_index` equal
    /// `field_values` positionally. The window must fit within the store's
    /// value fields.
    async fn remove_filtered_policy(
        &self,
        kind: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<()>;

    /// Replace the rule matching `old_rule` with `new_rule`, atomically.
    /// Matching nothing still persists `new_rule`.
    async fn update_policy(&self, kind: &str, old_rule: &[String], new_rule: &[String])
        -> Result<()>;

    /// Pairwise replace `old_rules[i]` with `new_rules[i]` in one
    /// transaction. Fails without touching storage when the batch lengths
    /// differ.
    async fn update_policies(
        &self,
        kind: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> Result<()>;

    /// In one transaction: select the rules matching the positional window
    /// (as in [`remove_filtered_policy`](Self::remove_filtered_policy)),
    /// delete them, insert `new_rules`. Returns the replaced rules.
    async fn update_filtered_policies(
        &self,
        kind: &str,
        new_rules: &[Vec<String>],
        field_index: usize,
        field_values: &[String],
    ) -> Result<Vec<Vec<String>>>;
}
