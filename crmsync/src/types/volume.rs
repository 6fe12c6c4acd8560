use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::RowPosition;

/// A cleaned trading volume row ready for loading.
///
/// One record feeds two warehouse tables: the volume and fee figures go to
/// `daily_trading_volume`, the tier levels to `vip_history`. Both inserts
/// happen in one transaction so the tables never disagree on which
/// `(customer_uid, date)` pairs exist.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingVolumeRecord {
    /// Source row this record came from, for status write-back.
    pub position: RowPosition,
    /// Zero-padded to 8 characters when the raw id is an all-digit string.
    pub customer_uid: String,
    pub date: NaiveDate,
    pub spot_maker_trading_volume: Option<BigDecimal>,
    pub spot_taker_trading_volume: Option<BigDecimal>,
    pub spot_maker_fees: Option<BigDecimal>,
    pub spot_taker_fees: Option<BigDecimal>,
    pub futures_maker_trading_volume: Option<BigDecimal>,
    pub futures_taker_trading_volume: Option<BigDecimal>,
    pub futures_maker_fees: Option<BigDecimal>,
    pub futures_taker_fees: Option<BigDecimal>,
    pub user_assets: Option<BigDecimal>,
    pub vip_level: i16,
    pub spot_mm_level: i16,
    pub futures_mm_level: i16,
}

impl TradingVolumeRecord {
    /// Returns the composite natural key used for duplicate resolution.
    pub fn key(&self) -> VolumeKey {
        VolumeKey {
            customer_uid: self.customer_uid.clone(),
            date: self.date,
        }
    }
}

/// Composite natural key shared by `daily_trading_volume` and `vip_history`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeKey {
    pub customer_uid: String,
    pub date: NaiveDate,
}
