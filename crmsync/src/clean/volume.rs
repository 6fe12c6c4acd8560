use crate::conversions::{pad_entity_id, parse_date, parse_optional_decimal, parse_tier_level};
use crate::error::IngestResult;
use crate::source::SheetSnapshot;
use crate::types::{RejectReason, RowReject, SheetRow, TradingVolumeRecord};

/// Highest VIP tier the CRM models.
const MAX_VIP_LEVEL: i16 = 99;
/// Highest market maker tier for both spot and futures.
const MAX_MM_LEVEL: i16 = 9;

/// Resolved column indices for the daily trading volume tab.
///
/// Every column is required; the tab is machine-exported and a missing column
/// means the export changed shape, not that data is optional.
#[derive(Debug, Clone)]
pub struct VolumeColumns {
    customer_uid: usize,
    date: usize,
    spot_maker_trading_volume: usize,
    spot_taker_trading_volume: usize,
    spot_maker_fees: usize,
    spot_taker_fees: usize,
    futures_maker_trading_volume: usize,
    futures_taker_trading_volume: usize,
    futures_maker_fees: usize,
    futures_taker_fees: usize,
    user_assets: usize,
    vip_level: usize,
    spot_mm_level: usize,
    futures_mm_level: usize,
}

impl VolumeColumns {
    pub fn resolve(snapshot: &SheetSnapshot) -> IngestResult<VolumeColumns> {
        let [
            customer_uid,
            date,
            spot_maker_trading_volume,
            spot_taker_trading_volume,
            spot_maker_fees,
            spot_taker_fees,
            futures_maker_trading_volume,
            futures_taker_trading_volume,
            futures_maker_fees,
            futures_taker_fees,
            user_assets,
            vip_level,
            spot_mm_level,
            futures_mm_level,
        ] = snapshot.require_columns([
            "customer_uid",
            "date",
            "spot_maker_trading_volume",
            "spot_taker_trading_volume",
            "spot_maker_fees",
            "spot_taker_fees",
            "futures_maker_trading_volume",
            "futures_taker_trading_volume",
            "futures_maker_fees",
            "futures_taker_fees",
            "user_assets",
            "vip_level",
            "spot_mm_level",
            "futures_mm_level",
        ])?;

        Ok(VolumeColumns {
            customer_uid,
            date,
            spot_maker_trading_volume,
            spot_taker_trading_volume,
            spot_maker_fees,
            spot_taker_fees,
            futures_maker_trading_volume,
            futures_taker_trading_volume,
            futures_maker_fees,
            futures_taker_fees,
            user_assets,
            vip_level,
            spot_mm_level,
            futures_mm_level,
        })
    }
}

/// Validates and normalizes one trading volume row.
///
/// `customer_uid` must be non-blank and is zero-padded when it is a short
/// all-digit id. The date must match one of the accepted formats. The nine
/// money columns parse to decimals with blank meaning absent; a non-numeric
/// cell rejects the row rather than loading a silent null. Tier levels are
/// small bounded integers with blank meaning 0.
pub fn clean_trading_volume(
    row: &SheetRow,
    columns: &VolumeColumns,
) -> Result<TradingVolumeRecord, RowReject> {
    let position = row.position;
    let reject = |reason: RejectReason| RowReject { position, reason };
    let decimal = |column: usize, name: &'static str| {
        parse_optional_decimal(row.field(column))
            .map_err(|error| reject(RejectReason::BadCell { column: name, error }))
    };
    let tier = |column: usize, name: &'static str, max: i16| {
        parse_tier_level(row.field(column), max)
            .map_err(|error| reject(RejectReason::BadCell { column: name, error }))
    };

    let Some(raw_uid) = row.field(columns.customer_uid) else {
        return Err(reject(RejectReason::MissingRequiredField("customer_uid")));
    };
    let Some(raw_date) = row.field(columns.date) else {
        return Err(reject(RejectReason::MissingRequiredField("date")));
    };
    let date = parse_date(raw_date).map_err(|error| {
        reject(RejectReason::BadCell {
            column: "date",
            error,
        })
    })?;

    Ok(TradingVolumeRecord {
        position,
        customer_uid: pad_entity_id(raw_uid),
        date,
        spot_maker_trading_volume: decimal(
            columns.spot_maker_trading_volume,
            "spot_maker_trading_volume",
        )?,
        spot_taker_trading_volume: decimal(
            columns.spot_taker_trading_volume,
            "spot_taker_trading_volume",
        )?,
        spot_maker_fees: decimal(columns.spot_maker_fees, "spot_maker_fees")?,
        spot_taker_fees: decimal(columns.spot_taker_fees, "spot_taker_fees")?,
        futures_maker_trading_volume: decimal(
            columns.futures_maker_trading_volume,
            "futures_maker_trading_volume",
        )?,
        futures_taker_trading_volume: decimal(
            columns.futures_taker_trading_volume,
            "futures_taker_trading_volume",
        )?,
        futures_maker_fees: decimal(columns.futures_maker_fees, "futures_maker_fees")?,
        futures_taker_fees: decimal(columns.futures_taker_fees, "futures_taker_fees")?,
        user_assets: decimal(columns.user_assets, "user_assets")?,
        vip_level: tier(columns.vip_level, "vip_level", MAX_VIP_LEVEL)?,
        spot_mm_level: tier(columns.spot_mm_level, "spot_mm_level", MAX_MM_LEVEL)?,
        futures_mm_level: tier(columns.futures_mm_level, "futures_mm_level", MAX_MM_LEVEL)?,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;
    use crate::conversions::CellError;

    const HEADER: &[&str] = &[
        "customer_uid",
        "date",
        "spot_maker_trading_volume",
        "spot_taker_trading_volume",
        "spot_maker_fees",
        "spot_taker_fees",
        "futures_maker_trading_volume",
        "futures_taker_trading_volume",
        "futures_maker_fees",
        "futures_taker_fees",
        "user_assets",
        "vip_level",
        "spot_mm_level",
        "futures_mm_level",
        "upload_status",
    ];

    fn clean_one(row: &[&str]) -> Result<TradingVolumeRecord, RowReject> {
        let grid = [HEADER, row]
            .iter()
            .map(|cells| cells.iter().map(|cell| cell.to_string()).collect())
            .collect();
        let snapshot = SheetSnapshot::from_grid("Daily Trading Volume", "upload_status", grid)
            .unwrap();
        let columns = VolumeColumns::resolve(&snapshot).unwrap();

        clean_trading_volume(&snapshot.rows()[0], &columns)
    }

    #[test]
    fn parses_a_full_row() {
        let record = clean_one(&[
            "42017",
            "2024/03/05",
            "1250.75",
            "310.10",
            "1.25",
            "0.62",
            "9800",
            "0",
            "4.9",
            "0",
            "150000.5",
            "3",
            "1",
            "2",
            "",
        ])
        .unwrap();

        assert_eq!(record.customer_uid, "00042017");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(
            record.spot_maker_trading_volume,
            Some(BigDecimal::from_str("1250.75").unwrap())
        );
        assert_eq!(record.vip_level, 3);
        assert_eq!(record.spot_mm_level, 1);
        assert_eq!(record.futures_mm_level, 2);
    }

    #[test]
    fn blank_numerics_and_tiers_have_defaults() {
        let record = clean_one(&[
            "abc-99",
            "2024-03-05",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ])
        .unwrap();

        // Non-numeric ids are never padded.
        assert_eq!(record.customer_uid, "abc-99");
        assert_eq!(record.spot_maker_trading_volume, None);
        assert_eq!(record.user_assets, None);
        assert_eq!(record.vip_level, 0);
        assert_eq!(record.spot_mm_level, 0);
    }

    #[test]
    fn blank_customer_uid_rejects_the_row() {
        let reject = clean_one(&[
            "  ",
            "2024-03-05",
            "1",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ])
        .unwrap_err();

        assert_eq!(
            reject.reason,
            RejectReason::MissingRequiredField("customer_uid")
        );
    }

    #[test]
    fn unknown_date_format_rejects_the_row() {
        let reject = clean_one(&[
            "42017",
            "05.03.2024",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ])
        .unwrap_err();

        assert_eq!(
            reject.reason,
            RejectReason::BadCell {
                column: "date",
                error: CellError::InvalidDate("05.03.2024".to_owned()),
            }
        );
    }

    #[test]
    fn grouped_digits_are_not_a_number() {
        let reject = clean_one(&[
            "42017",
            "2024-03-05",
            "1,250.75",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ])
        .unwrap_err();

        assert!(matches!(
            reject.reason,
            RejectReason::BadCell {
                column: "spot_maker_trading_volume",
                error: CellError::InvalidNumber(_),
            }
        ));
    }

    #[test]
    fn vip_level_above_the_cap_rejects_the_row() {
        let reject = clean_one(&[
            "42017",
            "2024-03-05",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "120",
            "",
            "",
            "",
        ])
        .unwrap_err();

        assert!(matches!(
            reject.reason,
            RejectReason::BadCell {
                column: "vip_level",
                error: CellError::LevelOutOfRange { .. },
            }
        ));
    }
}
