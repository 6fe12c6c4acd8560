//! In-memory implementation of the warehouse for testing.
//!
//! Provides [`MemoryWarehouse`], a [`Warehouse`] that stores records in
//! memory and supports failure injection at row granularity, which the
//! partial-failure and abort tests rely on.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::dedup::LeadKeySet;
use crate::error::{ErrorKind, IngestResult};
use crate::types::{LeadRecord, RowPosition, TradingVolumeRecord, VolumeKey};
use crate::warehouse::base::Warehouse;

#[derive(Debug, Default)]
struct Inner {
    leads: Vec<LeadRecord>,
    trading_days: Vec<TradingVolumeRecord>,
    seeded_volume_keys: HashSet<VolumeKey>,
    rejected_positions: HashSet<RowPosition>,
    connection_lost_at: Option<RowPosition>,
    fail_key_lookups: bool,
}

/// In-memory warehouse with injectable failures.
///
/// Cloning is cheap and all clones share the same storage.
#[derive(Debug, Clone)]
pub struct MemoryWarehouse {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryWarehouse {
    pub fn new() -> MemoryWarehouse {
        MemoryWarehouse {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Returns a copy of all stored leads.
    ///
    /// This method is useful for verifying what a run actually loaded.
    pub async fn leads(&self) -> Vec<LeadRecord> {
        let inner = self.inner.lock().await;
        inner.leads.clone()
    }

    /// Returns a copy of all stored trading volume records.
    pub async fn trading_days(&self) -> Vec<TradingVolumeRecord> {
        let inner = self.inner.lock().await;
        inner.trading_days.clone()
    }

    /// Marks a `(customer_uid, date)` key as already present, without a full
    /// stored record behind it.
    pub async fn seed_volume_key(&self, key: VolumeKey) {
        let mut inner = self.inner.lock().await;
        inner.seeded_volume_keys.insert(key);
    }

    /// Makes inserts for the given row position fail like a constraint
    /// violation. The failure is row-scoped; later inserts still succeed.
    pub async fn reject_inserts_at(&self, position: RowPosition) {
        let mut inner = self.inner.lock().await;
        inner.rejected_positions.insert(position);
    }

    /// Makes the insert for the given row position fail like a lost
    /// connection, which is run-fatal for the caller.
    pub async fn lose_connection_at(&self, position: RowPosition) {
        let mut inner = self.inner.lock().await;
        inner.connection_lost_at = Some(position);
    }

    /// Clears an injected connection loss, as if connectivity came back
    /// between runs.
    pub async fn restore_connection(&self) {
        let mut inner = self.inner.lock().await;
        inner.connection_lost_at = None;
    }

    /// Makes every key-set lookup fail like a lost connection.
    pub async fn fail_key_lookups(&self) {
        let mut inner = self.inner.lock().await;
        inner.fail_key_lookups = true;
    }

    async fn check_insert(&self, position: RowPosition) -> IngestResult<()> {
        let inner = self.inner.lock().await;

        if inner.connection_lost_at == Some(position) {
            bail!(
                ErrorKind::WarehouseConnectionFailed,
                "Warehouse connection lost",
                format!("row position {position}")
            );
        }

        if inner.rejected_positions.contains(&position) {
            bail!(
                ErrorKind::WarehouseQueryFailed,
                "Warehouse rejected the record",
                format!("row position {position}")
            );
        }

        Ok(())
    }
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Warehouse for MemoryWarehouse {
    async fn lead_keys(&self, emails: &[String], telegrams: &[String]) -> IngestResult<LeadKeySet> {
        let inner = self.inner.lock().await;

        if inner.fail_key_lookups {
            bail!(
                ErrorKind::WarehouseConnectionFailed,
                "Warehouse connection lost"
            );
        }

        let mut stored = LeadKeySet::default();
        for record in &inner.leads {
            if let Some(email) = &record.email {
                stored.emails.insert(email.clone());
            }
            if let Some(telegram) = &record.telegram {
                stored.telegrams.insert(telegram.clone());
            }
        }

        // Like the SQL lookup, only the requested keys are reported back.
        Ok(LeadKeySet {
            emails: emails
                .iter()
                .filter(|email| stored.emails.contains(*email))
                .cloned()
                .collect(),
            telegrams: telegrams
                .iter()
                .filter(|telegram| stored.telegrams.contains(*telegram))
                .cloned()
                .collect(),
        })
    }

    async fn insert_lead(&self, record: &LeadRecord) -> IngestResult<()> {
        self.check_insert(record.position).await?;

        let mut inner = self.inner.lock().await;
        inner.leads.push(record.clone());

        Ok(())
    }

    async fn volume_keys(&self, keys: &[VolumeKey]) -> IngestResult<HashSet<VolumeKey>> {
        let inner = self.inner.lock().await;

        if inner.fail_key_lookups {
            bail!(
                ErrorKind::WarehouseConnectionFailed,
                "Warehouse connection lost"
            );
        }

        let mut stored: HashSet<VolumeKey> = inner.seeded_volume_keys.clone();
        stored.extend(inner.trading_days.iter().map(TradingVolumeRecord::key));

        Ok(keys
            .iter()
            .filter(|key| stored.contains(*key))
            .cloned()
            .collect())
    }

    async fn insert_trading_volume(&self, record: &TradingVolumeRecord) -> IngestResult<()> {
        self.check_insert(record.position).await?;

        let mut inner = self.inner.lock().await;
        inner.trading_days.push(record.clone());

        Ok(())
    }
}
