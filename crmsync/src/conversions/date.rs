use chrono::NaiveDate;

use crate::conversions::CellError;

/// Date formats accepted for the trading volume `date` column.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses a date cell, trying each accepted format in order.
pub fn parse_date(s: &str) -> Result<NaiveDate, CellError> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }

    Err(CellError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();

        assert_eq!(parse_date("2024-03-07"), Ok(expected));
        assert_eq!(parse_date("2024/03/07"), Ok(expected));
        assert_eq!(parse_date("03/07/2024"), Ok(expected));
    }

    #[test]
    fn rejects_unparseable_dates() {
        assert_eq!(
            parse_date("7th of March"),
            Err(CellError::InvalidDate("7th of March".to_string()))
        );
        assert_eq!(
            parse_date("2024-13-40"),
            Err(CellError::InvalidDate("2024-13-40".to_string()))
        );
    }
}
