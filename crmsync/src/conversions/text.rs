/// Normalizes a sheet header: trim, lowercase, spaces to underscores.
///
/// Headers in the sheet are written for humans ("Spot Maker Trading Volume");
/// this is the canonical form the cleaners address columns by.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Owned copy of an optional free-text cell.
pub fn owned_text(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Owned, lower-cased copy of an optional categorical cell.
///
/// Contact and category fields are compared as natural keys later, so they
/// are folded to lowercase at cleaning time.
pub fn lowercased(value: Option<&str>) -> Option<String> {
    value.map(str::to_lowercase)
}

/// Title-cases a name: the first letter of every alphabetic run is
/// upper-cased, the rest lower-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;

    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }

    out
}

/// Canonical form of a customer id.
///
/// All-digit ids shorter than 8 characters are left-padded with zeros so the
/// same customer never appears under two spellings of one id. Ids that are
/// not purely numeric, or already 8 characters or longer, pass through
/// unchanged.
pub fn pad_entity_id(raw: &str) -> String {
    if !raw.is_empty() && raw.len() < 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{raw:0>8}")
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_normalize_to_snake_case() {
        assert_eq!(
            normalize_header("  Spot Maker Trading Volume "),
            "spot_maker_trading_volume"
        );
        assert_eq!(normalize_header("Email"), "email");
    }

    #[test]
    fn names_title_case_per_word() {
        assert_eq!(title_case("ada lovelace"), "Ada Lovelace");
        assert_eq!(title_case("o'neil, MIRIAM"), "O'Neil, Miriam");
    }

    #[test]
    fn short_numeric_ids_are_zero_padded() {
        assert_eq!(pad_entity_id("123"), "00000123");
        assert_eq!(pad_entity_id("12345678"), "12345678");
        assert_eq!(pad_entity_id("123456789"), "123456789");
        assert_eq!(pad_entity_id("AB-123"), "AB-123");
    }
}
