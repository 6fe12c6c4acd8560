use crate::conversions::{lowercased, owned_text, parse_bool, title_case};
use crate::error::IngestResult;
use crate::source::SheetSnapshot;
use crate::types::{LeadRecord, LeadStage, RejectReason, RowReject, SheetRow};

/// Resolved column indices for the leads tab.
///
/// The columns holding required fields and contact channels must exist in the
/// sheet; their absence aborts the run. The remaining columns are optional and
/// surface as [`None`] fields when missing.
#[derive(Debug, Clone)]
pub struct LeadColumns {
    full_name: usize,
    email: usize,
    telegram: usize,
    source: usize,
    status: usize,
    company_name: usize,
    bd_in_charge: usize,
    title: Option<usize>,
    phone_number: Option<usize>,
    linkedin_url: Option<usize>,
    country: Option<usize>,
    background: Option<usize>,
    is_converted: Option<usize>,
}

impl LeadColumns {
    pub fn resolve(snapshot: &SheetSnapshot) -> IngestResult<LeadColumns> {
        let [full_name, email, telegram, source, status, company_name, bd_in_charge] = snapshot
            .require_columns([
                "full_name",
                "email",
                "telegram",
                "source",
                "status",
                "company_name",
                "bd_in_charge",
            ])?;

        Ok(LeadColumns {
            full_name,
            email,
            telegram,
            source,
            status,
            company_name,
            bd_in_charge,
            title: snapshot.column("title"),
            phone_number: snapshot.column("phone_number"),
            linkedin_url: snapshot.column("linkedin_url"),
            country: snapshot.column("country"),
            background: snapshot.column("background"),
            is_converted: snapshot.column("is_converted"),
        })
    }
}

/// Validates and normalizes one leads row.
///
/// Rules, in order:
/// - `full_name`, `company_name`, `source` and `bd_in_charge` must be
///   non-blank.
/// - at least one of `email` and `telegram` must be present.
/// - the `status` cell must be one of the seven known stage values.
/// - `is_converted` accepts the usual boolean spellings; blank means false.
///
/// Normalization title-cases the name, lower-cases the categorical and
/// contact fields, and keeps `title`, `phone_number` and `background` as
/// trimmed free text.
pub fn clean_lead(row: &SheetRow, columns: &LeadColumns) -> Result<LeadRecord, RowReject> {
    let position = row.position;
    let reject = |reason: RejectReason| RowReject { position, reason };
    let optional = |column: Option<usize>| column.and_then(|column| row.field(column));

    let Some(full_name) = row.field(columns.full_name) else {
        return Err(reject(RejectReason::MissingRequiredField("full_name")));
    };
    let Some(company_name) = row.field(columns.company_name) else {
        return Err(reject(RejectReason::MissingRequiredField("company_name")));
    };
    let Some(source) = row.field(columns.source) else {
        return Err(reject(RejectReason::MissingRequiredField("source")));
    };
    let Some(bd_in_charge) = row.field(columns.bd_in_charge) else {
        return Err(reject(RejectReason::MissingRequiredField("bd_in_charge")));
    };

    let email = lowercased(row.field(columns.email));
    let telegram = lowercased(row.field(columns.telegram));
    if email.is_none() && telegram.is_none() {
        return Err(reject(RejectReason::MissingContactChannel));
    }

    let raw_stage = row.field(columns.status).unwrap_or("");
    let Some(stage) = LeadStage::parse(&raw_stage.to_lowercase()) else {
        return Err(reject(RejectReason::InvalidStatusValue(raw_stage.to_owned())));
    };

    let is_converted = match optional(columns.is_converted) {
        Some(raw) => parse_bool(raw).map_err(|error| {
            reject(RejectReason::BadCell {
                column: "is_converted",
                error,
            })
        })?,
        None => false,
    };

    Ok(LeadRecord {
        position,
        full_name: title_case(full_name),
        title: owned_text(optional(columns.title)),
        email,
        telegram,
        phone_number: owned_text(optional(columns.phone_number)),
        source: source.to_lowercase(),
        stage,
        linkedin_url: lowercased(optional(columns.linkedin_url)),
        company_name: company_name.to_lowercase(),
        country: lowercased(optional(columns.country)),
        bd_in_charge: bd_in_charge.to_lowercase(),
        background: owned_text(optional(columns.background)),
        is_converted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn snapshot(rows: &[&[&str]]) -> SheetSnapshot {
        SheetSnapshot::from_grid("Leads", "upload_status", grid(rows)).unwrap()
    }

    const HEADER: &[&str] = &[
        "full_name",
        "title",
        "email",
        "telegram",
        "source",
        "status",
        "company_name",
        "bd_in_charge",
        "is_converted",
        "upload_status",
    ];

    fn clean_one(row: &[&str]) -> Result<LeadRecord, RowReject> {
        let snapshot = snapshot(&[HEADER, row]);
        let columns = LeadColumns::resolve(&snapshot).unwrap();
        clean_lead(&snapshot.rows()[0], &columns)
    }

    #[test]
    fn normalizes_case_across_fields() {
        let record = clean_one(&[
            "  ada LOVELACE ",
            "CTO",
            "Ada@Example.COM",
            "@Ada",
            "Referral",
            "2. Proposal",
            "Analytica LTD",
            "Babbage",
            "YES",
            "",
        ])
        .unwrap();

        assert_eq!(record.position, 2);
        assert_eq!(record.full_name, "Ada Lovelace");
        assert_eq!(record.title.as_deref(), Some("CTO"));
        assert_eq!(record.email.as_deref(), Some("ada@example.com"));
        assert_eq!(record.telegram.as_deref(), Some("@ada"));
        assert_eq!(record.source, "referral");
        assert_eq!(record.stage, LeadStage::Proposal);
        assert_eq!(record.company_name, "analytica ltd");
        assert_eq!(record.bd_in_charge, "babbage");
        assert!(record.is_converted);
    }

    #[test]
    fn blank_required_field_rejects_the_row() {
        let reject = clean_one(&[
            "ada",
            "",
            "ada@example.com",
            "",
            "referral",
            "2. proposal",
            "  ",
            "babbage",
            "",
            "",
        ])
        .unwrap_err();

        assert_eq!(
            reject.reason,
            RejectReason::MissingRequiredField("company_name")
        );
    }

    #[test]
    fn needs_at_least_one_contact_channel() {
        let reject = clean_one(&[
            "ada",
            "",
            "",
            "  ",
            "referral",
            "2. proposal",
            "analytica",
            "babbage",
            "",
            "",
        ])
        .unwrap_err();

        assert_eq!(reject.reason, RejectReason::MissingContactChannel);
        assert_eq!(reject.position, 2);
    }

    #[test]
    fn one_contact_channel_is_enough() {
        let record = clean_one(&[
            "ada",
            "",
            "",
            "@ada",
            "referral",
            "2. proposal",
            "analytica",
            "babbage",
            "",
            "",
        ])
        .unwrap();

        assert_eq!(record.email, None);
        assert_eq!(record.telegram.as_deref(), Some("@ada"));
    }

    #[test]
    fn unknown_stage_rejects_with_the_raw_value() {
        let reject = clean_one(&[
            "ada",
            "",
            "ada@example.com",
            "",
            "referral",
            "8. dormant",
            "analytica",
            "babbage",
            "",
            "",
        ])
        .unwrap_err();

        assert_eq!(
            reject.reason,
            RejectReason::InvalidStatusValue("8. dormant".to_owned())
        );
    }

    #[test]
    fn unparseable_is_converted_rejects_the_row() {
        let reject = clean_one(&[
            "ada",
            "",
            "ada@example.com",
            "",
            "referral",
            "2. proposal",
            "analytica",
            "babbage",
            "maybe",
            "",
        ])
        .unwrap_err();

        assert!(matches!(
            reject.reason,
            RejectReason::BadCell {
                column: "is_converted",
                ..
            }
        ));
    }

    #[test]
    fn absent_optional_columns_surface_as_none() {
        let snapshot = snapshot(&[
            &[
                "full_name",
                "email",
                "telegram",
                "source",
                "status",
                "company_name",
                "bd_in_charge",
                "upload_status",
            ],
            &[
                "ada",
                "ada@example.com",
                "",
                "referral",
                "1. lead generated",
                "analytica",
                "babbage",
                "",
            ],
        ]);
        let columns = LeadColumns::resolve(&snapshot).unwrap();

        let record = clean_lead(&snapshot.rows()[0], &columns).unwrap();

        assert_eq!(record.title, None);
        assert_eq!(record.phone_number, None);
        assert_eq!(record.background, None);
        assert!(!record.is_converted);
    }

    #[test]
    fn missing_required_column_aborts_resolution() {
        let snapshot = snapshot(&[&["full_name", "email", "upload_status"]]);

        let error = LeadColumns::resolve(&snapshot).unwrap_err();

        assert!(error.to_string().contains("telegram"));
    }
}
