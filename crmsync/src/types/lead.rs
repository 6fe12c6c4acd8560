use std::fmt;

use crate::types::RowPosition;

/// Business stage of a lead, tracked in the sheet's `status` column.
///
/// The set is closed. A row carrying any other value is rejected during
/// cleaning rather than loaded with a stage the CRM does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadStage {
    LeadGenerated,
    Proposal,
    Negotiation,
    Registration,
    Integration,
    ClosedWon,
    Lost,
}

impl LeadStage {
    /// Parses a normalized (trimmed, lower-cased) stage value.
    pub fn parse(value: &str) -> Option<LeadStage> {
        match value {
            "1. lead generated" => Some(LeadStage::LeadGenerated),
            "2. proposal" => Some(LeadStage::Proposal),
            "3. negotiation" => Some(LeadStage::Negotiation),
            "4. registration" => Some(LeadStage::Registration),
            "5. integration" => Some(LeadStage::Integration),
            "6. closed won" => Some(LeadStage::ClosedWon),
            "7. lost" => Some(LeadStage::Lost),
            _ => None,
        }
    }

    /// Returns the stage in the canonical form stored in the warehouse.
    pub fn as_static_str(&self) -> &'static str {
        match self {
            LeadStage::LeadGenerated => "1. lead generated",
            LeadStage::Proposal => "2. proposal",
            LeadStage::Negotiation => "3. negotiation",
            LeadStage::Registration => "4. registration",
            LeadStage::Integration => "5. integration",
            LeadStage::ClosedWon => "6. closed won",
            LeadStage::Lost => "7. lost",
        }
    }
}

impl fmt::Display for LeadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_static_str())
    }
}

/// A cleaned lead ready for loading into the `lead` table.
///
/// All text is trimmed, blanks are [`None`], the categorical fields are
/// lower-cased. At least one of `email` and `telegram` is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadRecord {
    /// Source row this record came from, for status write-back.
    pub position: RowPosition,
    pub full_name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub telegram: Option<String>,
    pub phone_number: Option<String>,
    pub source: String,
    pub stage: LeadStage,
    pub linkedin_url: Option<String>,
    pub company_name: String,
    pub country: Option<String>,
    pub bd_in_charge: String,
    pub background: Option<String>,
    pub is_converted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_through_canonical_form() {
        for stage in [
            LeadStage::LeadGenerated,
            LeadStage::Proposal,
            LeadStage::Negotiation,
            LeadStage::Registration,
            LeadStage::Integration,
            LeadStage::ClosedWon,
            LeadStage::Lost,
        ] {
            assert_eq!(LeadStage::parse(stage.as_static_str()), Some(stage));
        }
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert_eq!(LeadStage::parse("7. archived"), None);
        assert_eq!(LeadStage::parse(""), None);
    }
}
