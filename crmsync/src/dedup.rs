//! Duplicate resolution, batch-scoped.
//!
//! Two ordered passes run between cleaning and loading: intra-batch, where
//! the first occurrence of a natural key by sheet position wins, and
//! inter-store, where keys already present in the warehouse are dropped.
//! Excluded rows still produce successful outcomes so they end up tagged
//! PROCESSED instead of being retried on every run.

use std::collections::HashSet;

use crate::types::{LeadRecord, LoadOutcome, SkipReason, TradingVolumeRecord, VolumeKey};

/// Lead natural keys, either already in the warehouse or seen earlier in the
/// current batch.
///
/// A lead matches when its email or its telegram handle is in the set. Blank
/// channels never match anything.
#[derive(Debug, Clone, Default)]
pub struct LeadKeySet {
    pub emails: HashSet<String>,
    pub telegrams: HashSet<String>,
}

impl LeadKeySet {
    pub fn contains(&self, record: &LeadRecord) -> bool {
        let email_known = record
            .email
            .as_ref()
            .is_some_and(|email| self.emails.contains(email));
        let telegram_known = record
            .telegram
            .as_ref()
            .is_some_and(|telegram| self.telegrams.contains(telegram));

        email_known || telegram_known
    }

    fn insert(&mut self, record: &LeadRecord) {
        if let Some(email) = &record.email {
            self.emails.insert(email.clone());
        }
        if let Some(telegram) = &record.telegram {
            self.telegrams.insert(telegram.clone());
        }
    }
}

/// Drops leads whose email or telegram repeats within the batch.
pub fn dedup_leads_in_batch(records: Vec<LeadRecord>) -> (Vec<LeadRecord>, Vec<LoadOutcome>) {
    let mut seen = LeadKeySet::default();
    let mut survivors = Vec::with_capacity(records.len());
    let mut excluded = Vec::new();

    for record in records {
        if seen.contains(&record) {
            excluded.push(LoadOutcome::skipped(
                record.position,
                SkipReason::DuplicateInBatch,
            ));
            continue;
        }

        seen.insert(&record);
        survivors.push(record);
    }

    (survivors, excluded)
}

/// Drops leads whose contact key is already in the warehouse.
pub fn filter_known_leads(
    records: Vec<LeadRecord>,
    known: &LeadKeySet,
) -> (Vec<LeadRecord>, Vec<LoadOutcome>) {
    let mut survivors = Vec::with_capacity(records.len());
    let mut excluded = Vec::new();

    for record in records {
        if known.contains(&record) {
            excluded.push(LoadOutcome::skipped(
                record.position,
                SkipReason::AlreadyInStore,
            ));
        } else {
            survivors.push(record);
        }
    }

    (survivors, excluded)
}

/// Collects the contact keys of a batch for the inter-store lookup.
pub fn lead_batch_keys(records: &[LeadRecord]) -> (Vec<String>, Vec<String>) {
    let mut emails = Vec::new();
    let mut telegrams = Vec::new();

    for record in records {
        if let Some(email) = &record.email {
            emails.push(email.clone());
        }
        if let Some(telegram) = &record.telegram {
            telegrams.push(telegram.clone());
        }
    }

    (emails, telegrams)
}

/// Drops trading volume rows whose `(customer_uid, date)` repeats within the
/// batch.
pub fn dedup_volume_in_batch(
    records: Vec<TradingVolumeRecord>,
) -> (Vec<TradingVolumeRecord>, Vec<LoadOutcome>) {
    let mut seen: HashSet<VolumeKey> = HashSet::new();
    let mut survivors = Vec::with_capacity(records.len());
    let mut excluded = Vec::new();

    for record in records {
        if !seen.insert(record.key()) {
            excluded.push(LoadOutcome::skipped(
                record.position,
                SkipReason::DuplicateInBatch,
            ));
            continue;
        }

        survivors.push(record);
    }

    (survivors, excluded)
}

/// Drops trading volume rows whose key is already in the warehouse.
pub fn filter_known_volume(
    records: Vec<TradingVolumeRecord>,
    known: &HashSet<VolumeKey>,
) -> (Vec<TradingVolumeRecord>, Vec<LoadOutcome>) {
    let mut survivors = Vec::with_capacity(records.len());
    let mut excluded = Vec::new();

    for record in records {
        if known.contains(&record.key()) {
            excluded.push(LoadOutcome::skipped(
                record.position,
                SkipReason::AlreadyInStore,
            ));
        } else {
            survivors.push(record);
        }
    }

    (survivors, excluded)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{Disposition, LeadStage, RowPosition};

    fn lead(position: RowPosition, email: Option<&str>, telegram: Option<&str>) -> LeadRecord {
        LeadRecord {
            position,
            full_name: "Ada Lovelace".to_owned(),
            title: None,
            email: email.map(str::to_owned),
            telegram: telegram.map(str::to_owned),
            phone_number: None,
            source: "referral".to_owned(),
            stage: LeadStage::LeadGenerated,
            linkedin_url: None,
            company_name: "analytica".to_owned(),
            country: None,
            bd_in_charge: "babbage".to_owned(),
            background: None,
            is_converted: false,
        }
    }

    fn volume(position: RowPosition, customer_uid: &str, day: u32) -> TradingVolumeRecord {
        TradingVolumeRecord {
            position,
            customer_uid: customer_uid.to_owned(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            spot_maker_trading_volume: None,
            spot_taker_trading_volume: None,
            spot_maker_fees: None,
            spot_taker_fees: None,
            futures_maker_trading_volume: None,
            futures_taker_trading_volume: None,
            futures_maker_fees: None,
            futures_taker_fees: None,
            user_assets: None,
            vip_level: 0,
            spot_mm_level: 0,
            futures_mm_level: 0,
        }
    }

    #[test]
    fn first_position_wins_within_a_batch() {
        let batch = vec![
            lead(2, Some("ada@example.com"), None),
            lead(3, Some("grace@example.com"), None),
            lead(4, Some("ada@example.com"), Some("@ada")),
        ];

        let (survivors, excluded) = dedup_leads_in_batch(batch);

        assert_eq!(
            survivors
                .iter()
                .map(|record| record.position)
                .collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].position, 4);
        assert_eq!(
            excluded[0].disposition,
            Disposition::Skipped(SkipReason::DuplicateInBatch)
        );
    }

    #[test]
    fn either_contact_channel_makes_a_duplicate() {
        let batch = vec![
            lead(2, Some("ada@example.com"), Some("@ada")),
            lead(3, Some("other@example.com"), Some("@ada")),
        ];

        let (survivors, excluded) = dedup_leads_in_batch(batch);

        assert_eq!(survivors.len(), 1);
        assert_eq!(excluded[0].position, 3);
    }

    #[test]
    fn absent_channels_never_collide() {
        let batch = vec![
            lead(2, None, Some("@ada")),
            lead(3, None, Some("@grace")),
            lead(4, Some("enzo@example.com"), None),
        ];

        let (survivors, excluded) = dedup_leads_in_batch(batch);

        assert_eq!(survivors.len(), 3);
        assert!(excluded.is_empty());
    }

    #[test]
    fn known_email_or_telegram_excludes_the_lead() {
        let mut known = LeadKeySet::default();
        known.emails.insert("ada@example.com".to_owned());
        known.telegrams.insert("@grace".to_owned());

        let batch = vec![
            lead(2, Some("ada@example.com"), Some("@fresh")),
            lead(3, Some("fresh@example.com"), Some("@grace")),
            lead(4, Some("fresh2@example.com"), None),
        ];

        let (survivors, excluded) = filter_known_leads(batch, &known);

        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].position, 4);
        assert_eq!(excluded.len(), 2);
        assert!(
            excluded
                .iter()
                .all(|outcome| outcome.disposition
                    == Disposition::Skipped(SkipReason::AlreadyInStore))
        );
    }

    #[test]
    fn batch_keys_skip_absent_channels() {
        let batch = vec![
            lead(2, Some("ada@example.com"), None),
            lead(3, None, Some("@grace")),
        ];

        let (emails, telegrams) = lead_batch_keys(&batch);

        assert_eq!(emails, vec!["ada@example.com"]);
        assert_eq!(telegrams, vec!["@grace"]);
    }

    #[test]
    fn repeated_volume_key_is_dropped_within_a_batch() {
        let batch = vec![volume(2, "a", 1), volume(3, "a", 2), volume(4, "a", 1)];

        let (survivors, excluded) = dedup_volume_in_batch(batch);

        assert_eq!(survivors.len(), 2);
        assert_eq!(excluded[0].position, 4);
    }

    #[test]
    fn known_volume_keys_are_excluded() {
        let known: HashSet<VolumeKey> = [volume(9, "a", 1).key()].into_iter().collect();

        let batch = vec![volume(2, "a", 1), volume(3, "b", 1)];

        let (survivors, excluded) = filter_known_volume(batch, &known);

        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].customer_uid, "b");
        assert_eq!(excluded[0].position, 2);
    }
}
