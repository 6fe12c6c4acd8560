use std::collections::HashSet;
use std::future::Future;

use crate::dedup::LeadKeySet;
use crate::error::IngestResult;
use crate::types::{LeadRecord, TradingVolumeRecord, VolumeKey};

/// Trait for relational stores the pipeline loads cleaned records into.
///
/// The key-set lookups must resolve membership for a whole batch in a single
/// query. The insert operations write exactly one record durably; a failed
/// insert must leave earlier inserts committed, since the caller continues
/// with the remaining records and attributes the failure to one row.
///
/// Connection loss and query failures are distinguished by error kind: the
/// former aborts the run, the latter is scoped to the record being written.
pub trait Warehouse {
    /// Returns which of the given contact keys already exist in the lead
    /// table.
    ///
    /// Matching is by email or telegram handle against the normalized stored
    /// values.
    fn lead_keys(
        &self,
        emails: &[String],
        telegrams: &[String],
    ) -> impl Future<Output = IngestResult<LeadKeySet>> + Send;

    /// Inserts one lead.
    fn insert_lead(&self, record: &LeadRecord) -> impl Future<Output = IngestResult<()>> + Send;

    /// Returns which of the given `(customer_uid, date)` keys already exist
    /// in the volume or tier history tables.
    ///
    /// A key present in either table counts as existing, so a record is only
    /// ever loaded when it is new in both.
    fn volume_keys(
        &self,
        keys: &[VolumeKey],
    ) -> impl Future<Output = IngestResult<HashSet<VolumeKey>>> + Send;

    /// Inserts the volume figures and the tier levels of one record.
    ///
    /// Both tables are written in a single transaction so they never disagree
    /// on which keys exist.
    fn insert_trading_volume(
        &self,
        record: &TradingVolumeRecord,
    ) -> impl Future<Output = IngestResult<()>> + Send;
}
