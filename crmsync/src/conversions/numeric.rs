use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::conversions::CellError;

/// Parses a numeric cell into an optional decimal.
///
/// Volumes, fees, and asset figures are stored as arbitrary-precision
/// decimals. Blank cells load as NULL rather than zero, since an empty cell
/// means "not reported", not "traded nothing".
pub fn parse_optional_decimal(value: Option<&str>) -> Result<Option<BigDecimal>, CellError> {
    let Some(raw) = value else {
        return Ok(None);
    };

    BigDecimal::from_str(raw)
        .map(Some)
        .map_err(|_| CellError::InvalidNumber(raw.to_string()))
}

/// Parses a tier level cell (`vip_level` and the market-maker levels).
///
/// Blank cells default to 0, matching how the source system records absent
/// tiers. Levels outside `0..=max` are rejected.
pub fn parse_tier_level(value: Option<&str>, max: i16) -> Result<i16, CellError> {
    let Some(raw) = value else {
        return Ok(0);
    };

    let level = raw
        .parse::<i16>()
        .map_err(|_| CellError::InvalidNumber(raw.to_string()))?;

    if !(0..=max).contains(&level) {
        return Err(CellError::LevelOutOfRange {
            value: raw.to_string(),
            max,
        });
    }

    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_decimal_is_null_not_zero() {
        assert_eq!(parse_optional_decimal(None), Ok(None));
    }

    #[test]
    fn decimals_keep_full_precision() {
        let parsed = parse_optional_decimal(Some("123456.789012345")).unwrap();
        assert_eq!(
            parsed,
            Some(BigDecimal::from_str("123456.789012345").unwrap())
        );
    }

    #[test]
    fn garbage_decimal_is_rejected() {
        assert_eq!(
            parse_optional_decimal(Some("12,5")),
            Err(CellError::InvalidNumber("12,5".to_string()))
        );
    }

    #[test]
    fn blank_tier_level_defaults_to_zero() {
        assert_eq!(parse_tier_level(None, 99), Ok(0));
    }

    #[test]
    fn tier_levels_are_range_checked() {
        assert_eq!(parse_tier_level(Some("7"), 9), Ok(7));
        assert_eq!(
            parse_tier_level(Some("12"), 9),
            Err(CellError::LevelOutOfRange {
                value: "12".to_string(),
                max: 9,
            })
        );
        assert_eq!(
            parse_tier_level(Some("-1"), 99),
            Err(CellError::LevelOutOfRange {
                value: "-1".to_string(),
                max: 99,
            })
        );
    }
}
