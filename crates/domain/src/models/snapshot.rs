//! Immutable point-in-time view of the ledger.

use std::collections::{BTreeMap, HashMap};

use super::participant::Participant;
use super::scan::{ScanKey, ScanRecord};

/// All participants and scan records at one instant.
///
/// Snapshots are shared behind `Arc` and never mutated; stores publish a fresh
/// one after every change.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    participants: BTreeMap<String, Participant>,
    by_qr_code: HashMap<String, String>,
    scans: BTreeMap<ScanKey, ScanRecord>,
}

impl LedgerSnapshot {
    pub fn new(
        participants: impl IntoIterator<Item = Participant>,
        scans: impl IntoIterator<Item = ScanRecord>,
    ) -> Self {
        let participants: BTreeMap<String, Participant> = participants
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let by_qr_code = participants
            .values()
            .map(|p| (p.qr_code.clone(), p.id.clone()))
            .collect();
        let scans = scans.into_iter().map(|s| (s.key.clone(), s)).collect();

        Self {
            participants,
            by_qr_code,
            scans,
        }
    }

    /// Participants ordered by creation time, then id.
    pub fn participants(&self) -> Vec<&Participant> {
        let mut list: Vec<&Participant> = self.participants.values().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Exact-match lookup by QR token.
    pub fn find_by_qr_code(&self, code: &str) -> Option<&Participant> {
        self.by_qr_code
            .get(code)
            .and_then(|id| self.participants.get(id))
    }

    pub fn has_qr_code(&self, code: &str) -> bool {
        self.by_qr_code.contains_key(code)
    }

    pub fn has_participant_id(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    pub fn scans(&self) -> impl Iterator<Item = &ScanRecord> {
        self.scans.values()
    }

    pub fn scan(&self, key: &ScanKey) -> Option<&ScanRecord> {
        self.scans.get(key)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventDay, MealSlot};
    use chrono::{Duration, Utc};

    fn participant(id: &str, qr: &str, offset_secs: i64) -> Participant {
        Participant {
            id: id.to_string(),
            name: format!("Name {}", id),
            email: None,
            qr_code: qr.to_string(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_find_by_qr_code_exact() {
        let snapshot = LedgerSnapshot::new(
            vec![participant("P1", "QR1", 0), participant("P2", "QR2", 1)],
            vec![],
        );
        assert_eq!(snapshot.find_by_qr_code("QR2").unwrap().id, "P2");
        assert!(snapshot.find_by_qr_code("qr2").is_none());
        assert!(snapshot.find_by_qr_code("P1").is_none());
        assert!(snapshot.find_by_qr_code("").is_none());
    }

    #[test]
    fn test_participants_sorted_by_creation() {
        let snapshot = LedgerSnapshot::new(
            vec![
                participant("Z", "QR1", 0),
                participant("A", "QR2", 10),
                participant("M", "QR3", 5),
            ],
            vec![],
        );
        let ids: Vec<&str> = snapshot.participants().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "M", "A"]);
    }

    #[test]
    fn test_scan_lookup() {
        let p = participant("P1", "QR1", 0);
        let day = EventDay::new(0).unwrap();
        let record = ScanRecord::new(&p, day, MealSlot::Lunch, Utc::now());
        let snapshot = LedgerSnapshot::new(vec![p], vec![record.clone()]);

        assert_eq!(snapshot.scan(&record.key), Some(&record));
        assert!(snapshot
            .scan(&ScanKey::derive("P1", day, MealSlot::Coffee))
            .is_none());
        assert_eq!(snapshot.scan_count(), 1);
        assert_eq!(snapshot.participant_count(), 1);
    }

    #[test]
    fn test_default_is_empty() {
        let snapshot = LedgerSnapshot::default();
        assert_eq!(snapshot.participant_count(), 0);
        assert_eq!(snapshot.scans().count(), 0);
        assert!(!snapshot.has_qr_code("anything"));
    }
}
