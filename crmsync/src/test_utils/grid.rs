//! Tab grid builders for sheet fixtures.
//!
//! The builders produce grids in the column order of the production sheets,
//! with the status column last. Rows come out PENDING (blank status) unless
//! rewritten with [`with_status`].

/// Column order used by [`lead_row`].
pub const LEADS_TAB_HEADER: &[&str] = &[
    "full_name",
    "title",
    "email",
    "telegram",
    "phone_number",
    "source",
    "status",
    "linkedin_url",
    "company_name",
    "country",
    "bd_in_charge",
    "background",
    "is_converted",
    "upload_status",
];

/// Column order used by [`volume_row`].
pub const VOLUME_TAB_HEADER: &[&str] = &[
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

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

/// Builds a full tab grid from a header and data rows.
pub fn grid(header: &[&str], rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut grid = vec![row(header)];
    grid.extend(rows);
    grid
}

/// A valid PENDING lead row with the given identity fields.
///
/// Blank email or telegram cells stay blank, which is how the sheet
/// represents a missing contact channel.
pub fn lead_row(full_name: &str, email: &str, telegram: &str) -> Vec<String> {
    row(&[
        full_name,
        "",
        email,
        telegram,
        "",
        "referral",
        "1. lead generated",
        "",
        "acme",
        "",
        "babbage",
        "",
        "",
        "",
    ])
}

/// A valid PENDING trading volume row for the given key.
pub fn volume_row(customer_uid: &str, date: &str) -> Vec<String> {
    row(&[
        customer_uid,
        date,
        "100.5",
        "200",
        "1.1",
        "2.2",
        "300",
        "400",
        "3.3",
        "4.4",
        "5000",
        "2",
        "1",
        "1",
        "",
    ])
}

/// Rewrites the status cell of a built row.
pub fn with_status(mut row: Vec<String>, status: &str) -> Vec<String> {
    if let Some(cell) = row.last_mut() {
        *cell = status.to_owned();
    }

    row
}
