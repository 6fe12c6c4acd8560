use crate::conversions::CellError;

/// Parses a boolean cell.
///
/// Sheet authors spell booleans freely, so the accepted set is wider than
/// `t`/`f`. Blank cells are handled by the caller (absent means `false` for
/// `is_converted`), so the input here is always non-empty.
pub fn parse_bool(s: &str) -> Result<bool, CellError> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(CellError::InvalidBool(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_spellings() {
        for value in ["TRUE", "t", "Yes", "y", "1"] {
            assert_eq!(parse_bool(value), Ok(true), "{value}");
        }
        for value in ["false", "F", "NO", "n", "0"] {
            assert_eq!(parse_bool(value), Ok(false), "{value}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(
            parse_bool("converted"),
            Err(CellError::InvalidBool("converted".to_string()))
        );
    }
}
