//! Postgres implementation of [`Warehouse`].
//!
//! Schema ownership lives outside this crate; the queries here target the
//! `lead`, `daily_trading_volume` and `vip_history` tables as deployed.

use std::collections::HashSet;

use sqlx::Row;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crmsync_config::shared::{IntoConnectOptions, PgConnectionConfig, WAREHOUSE_OPTIONS};

use crate::dedup::LeadKeySet;
use crate::error::{ErrorKind, IngestResult};
use crate::ingest_error;
use crate::types::{LeadRecord, TradingVolumeRecord, VolumeKey};
use crate::warehouse::base::Warehouse;

/// The loader writes strictly sequentially, so the pool stays small.
const MAX_POOL_CONNECTIONS: u32 = 2;

#[derive(Debug, Clone)]
pub struct PostgresWarehouse {
    pool: PgPool,
}

impl PostgresWarehouse {
    /// Connects to the warehouse with the run-scoped session settings
    /// applied.
    pub async fn connect(config: &PgConnectionConfig) -> IngestResult<PostgresWarehouse> {
        let options: PgConnectOptions = config.with_db(Some(&WAREHOUSE_OPTIONS));

        let pool = PgPoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|error| {
                ingest_error!(
                    ErrorKind::WarehouseConnectionFailed,
                    "Failed to connect to the warehouse",
                    source: error
                )
            })?;

        Ok(PostgresWarehouse { pool })
    }
}

impl Warehouse for PostgresWarehouse {
    async fn lead_keys(&self, emails: &[String], telegrams: &[String]) -> IngestResult<LeadKeySet> {
        let rows = sqlx::query(
            r#"
            select email, telegram from lead
            where email = any($1) or telegram = any($2)
            "#,
        )
        .bind(emails)
        .bind(telegrams)
        .fetch_all(&self.pool)
        .await?;

        // Stored values may predate sheet-side normalization, so they are
        // normalized again before membership checks.
        let mut keys = LeadKeySet::default();
        for row in rows {
            let email: Option<String> = row.get("email");
            let telegram: Option<String> = row.get("telegram");

            if let Some(email) = email {
                keys.emails.insert(email.trim().to_lowercase());
            }
            if let Some(telegram) = telegram {
                keys.telegrams.insert(telegram.trim().to_lowercase());
            }
        }

        Ok(keys)
    }

    async fn insert_lead(&self, record: &LeadRecord) -> IngestResult<()> {
        sqlx::query(
            r#"
            insert into lead
            (full_name, title, email, telegram, phone_number, source, status,
             linkedin_url, company_name, country, bd_in_charge, background, is_converted)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&record.full_name)
        .bind(&record.title)
        .bind(&record.email)
        .bind(&record.telegram)
        .bind(&record.phone_number)
        .bind(&record.source)
        .bind(record.stage.as_static_str())
        .bind(&record.linkedin_url)
        .bind(&record.company_name)
        .bind(&record.country)
        .bind(&record.bd_in_charge)
        .bind(&record.background)
        .bind(record.is_converted)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn volume_keys(&self, keys: &[VolumeKey]) -> IngestResult<HashSet<VolumeKey>> {
        let mut customer_uids = Vec::with_capacity(keys.len());
        let mut dates = Vec::with_capacity(keys.len());
        for key in keys {
            customer_uids.push(key.customer_uid.clone());
            dates.push(key.date);
        }

        let rows = sqlx::query(
            r#"
            select customer_uid, date from daily_trading_volume
            where (customer_uid, date) in (select * from unnest($1::text[], $2::date[]))
            union
            select customer_uid, date from vip_history
            where (customer_uid, date) in (select * from unnest($1::text[], $2::date[]))
            "#,
        )
        .bind(&customer_uids)
        .bind(&dates)
        .fetch_all(&self.pool)
        .await?;

        let mut existing = HashSet::with_capacity(rows.len());
        for row in rows {
            existing.insert(VolumeKey {
                customer_uid: row.get("customer_uid"),
                date: row.get("date"),
            });
        }

        Ok(existing)
    }

    async fn insert_trading_volume(&self, record: &TradingVolumeRecord) -> IngestResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            insert into daily_trading_volume
            (customer_uid, date, spot_maker_trading_volume, spot_taker_trading_volume,
             spot_maker_fees, spot_taker_fees, futures_maker_trading_volume,
             futures_taker_trading_volume, futures_maker_fees, futures_taker_fees, user_assets)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&record.customer_uid)
        .bind(record.date)
        .bind(&record.spot_maker_trading_volume)
        .bind(&record.spot_taker_trading_volume)
        .bind(&record.spot_maker_fees)
        .bind(&record.spot_taker_fees)
        .bind(&record.futures_maker_trading_volume)
        .bind(&record.futures_taker_trading_volume)
        .bind(&record.futures_maker_fees)
        .bind(&record.futures_taker_fees)
        .bind(&record.user_assets)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            insert into vip_history
            (customer_uid, date, vip_level, spot_mm_level, futures_mm_level)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.customer_uid)
        .bind(record.date)
        .bind(record.vip_level)
        .bind(record.spot_mm_level)
        .bind(record.futures_mm_level)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
