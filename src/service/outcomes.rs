use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::entity::record::{self, rfp_from_record};
use crate::entity::{RfpStatus, SubmissionSnapshot};
use crate::storage::{DocumentStore, Filter, Query, Sort, RFPS};

use super::RfpService;

/// How far back a firm-wide outcome listing looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutcomeRange {
    Days90,
    Days180,
    #[default]
    Days365,
    All,
}

impl OutcomeRange {
    pub fn days(&self) -> Option<i64> {
        match self {
            OutcomeRange::Days90 => Some(90),
            OutcomeRange::Days180 => Some(180),
            OutcomeRange::Days365 => Some(365),
            OutcomeRange::All => None,
        }
    }
}

impl std::fmt::Display for OutcomeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeRange::Days90 => write!(f, "90d"),
            OutcomeRange::Days180 => write!(f, "180d"),
            OutcomeRange::Days365 => write!(f, "365d"),
            OutcomeRange::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for OutcomeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "90d" => Ok(OutcomeRange::Days90),
            "180d" => Ok(OutcomeRange::Days180),
            "365d" => Ok(OutcomeRange::Days365),
            "all" => Ok(OutcomeRange::All),
            _ => Err(format!("Invalid range: {}. Use 90d, 180d, 365d or all", s)),
        }
    }
}

/// A decided RFP with its submission snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub id: String,
    pub status: RfpStatus,
    pub submission_snapshot: SubmissionSnapshot,
    pub created_at: DateTime<Utc>,
}

impl<S: DocumentStore> RfpService<S> {
    /// Won and lost RFPs with snapshots, newest first.
    pub async fn list_firm_outcomes(&self, range: OutcomeRange) -> Vec<OutcomeRecord> {
        self.list_firm_outcomes_at(range, record::now()).await
    }

    /// As [`list_firm_outcomes`](Self::list_firm_outcomes), with the range
    /// measured back from `now`.
    ///
    /// A failed query is logged and reads as no outcomes. Records whose
    /// snapshot does not decode are skipped.
    pub async fn list_firm_outcomes_at(
        &self,
        range: OutcomeRange,
        now: DateTime<Utc>,
    ) -> Vec<OutcomeRecord> {
        let mut clauses = vec![
            Filter::is_in(
                "status",
                vec![
                    Value::String(RfpStatus::Won.to_string()),
                    Value::String(RfpStatus::Lost.to_string()),
                ],
            ),
            Filter::not_null("submission_snapshot"),
        ];
        if let Some(days) = range.days() {
            let since = now - Duration::days(days);
            clauses.push(Filter::gte("created_at", record::format_timestamp(&since)));
        }

        let query = Query::new(Filter::And(clauses)).sort(Sort::desc("created_at"));
        let records = match self.store.query(RFPS, &query).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(%range, error = %e, "outcome query failed, returning no outcomes");
                return Vec::new();
            }
        };

        let mut outcomes: Vec<OutcomeRecord> = records
            .iter()
            .filter_map(rfp_from_record)
            .filter_map(|rfp| {
                let submission_snapshot = rfp.submission_snapshot?;
                Some(OutcomeRecord {
                    id: rfp.id,
                    status: rfp.status,
                    submission_snapshot,
                    created_at: rfp.created_at,
                })
            })
            .collect();
        outcomes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::entity::{CreateRfpInput, Rfp};
    use crate::service::test_support::FlakyStore;
    use crate::storage::LoroStore;

    fn at(date: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(date)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn snapshot(outcome: RfpStatus) -> SubmissionSnapshot {
        SubmissionSnapshot {
            submitted_at: at("2026-05-01T00:00:00Z"),
            outcome,
            section_keys: Vec::new(),
            bindings: Default::default(),
            pricing_total: None,
            notes: None,
        }
    }

    /// Insert an RFP directly so `created_at` can be placed in the past
    async fn insert<D: DocumentStore>(
        store: &D,
        created_at: &str,
        status: RfpStatus,
        with_snapshot: bool,
    ) -> String {
        let mut rfp = Rfp::new(
            CreateRfpInput {
                company_id: "acme".to_string(),
                title: format!("{status} {created_at}"),
                ..Default::default()
            },
            at(created_at),
        );
        rfp.status = status;
        if with_snapshot {
            rfp.submission_snapshot = Some(snapshot(status));
        }
        store
            .create(RFPS, record::rfp_to_fields(&rfp).unwrap())
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_range_parses() {
        assert_eq!("90d".parse::<OutcomeRange>().unwrap(), OutcomeRange::Days90);
        assert_eq!("ALL".parse::<OutcomeRange>().unwrap(), OutcomeRange::All);
        assert!("30d".parse::<OutcomeRange>().is_err());
        assert_eq!(OutcomeRange::Days180.to_string(), "180d");
        assert_eq!(OutcomeRange::default(), OutcomeRange::Days365);
    }

    #[tokio::test]
    async fn test_outcomes_filter_by_status_snapshot_and_range() {
        let service = RfpService::new(LoroStore::in_memory());
        let store = service.store();
        let now = at("2026-06-01T00:00:00Z");

        let won = insert(store, "2026-05-20T00:00:00Z", RfpStatus::Won, true).await;
        let lost = insert(store, "2026-04-01T00:00:00Z", RfpStatus::Lost, true).await;
        let old = insert(store, "2025-01-01T00:00:00Z", RfpStatus::Won, true).await;
        insert(store, "2026-05-25T00:00:00Z", RfpStatus::Won, false).await;
        insert(store, "2026-05-26T00:00:00Z", RfpStatus::Submitted, false).await;

        let recent = service.list_firm_outcomes_at(OutcomeRange::Days90, now).await;
        let ids: Vec<&str> = recent.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![won.as_str(), lost.as_str()]);
        assert_eq!(recent[1].submission_snapshot.outcome, RfpStatus::Lost);

        let all = service.list_firm_outcomes_at(OutcomeRange::All, now).await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id, old);
    }

    #[tokio::test]
    async fn test_undecided_rfp_with_snapshot_is_excluded() {
        let service = RfpService::new(LoroStore::in_memory());
        let store = service.store();
        let now = at("2026-06-01T00:00:00Z");

        let won = insert(store, "2026-05-10T00:00:00Z", RfpStatus::Won, true).await;
        insert(store, "2026-05-11T00:00:00Z", RfpStatus::Submitted, true).await;
        insert(store, "2026-05-12T00:00:00Z", RfpStatus::Intake, true).await;
        insert(store, "2026-05-13T00:00:00Z", RfpStatus::InProgress, true).await;

        for range in [OutcomeRange::Days90, OutcomeRange::All] {
            let outcomes = service.list_firm_outcomes_at(range, now).await;
            let ids: Vec<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
            assert_eq!(ids, vec![won.as_str()], "range {range}");
        }
    }

    #[tokio::test]
    async fn test_outcomes_skip_malformed_snapshot() {
        let service = RfpService::new(LoroStore::in_memory());
        let now = at("2026-06-01T00:00:00Z");
        let good = insert(service.store(), "2026-05-01T00:00:00Z", RfpStatus::Won, true).await;
        let bad = insert(service.store(), "2026-05-02T00:00:00Z", RfpStatus::Lost, true).await;

        let mut fields = crate::storage::Fields::new();
        fields.insert("submission_snapshot".into(), json!("{oops"));
        service.store().update(RFPS, &bad, fields).await.unwrap();

        let outcomes = service.list_firm_outcomes_at(OutcomeRange::All, now).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].id, good);
    }

    #[tokio::test]
    async fn test_outcome_query_failure_reads_as_empty() {
        let store = FlakyStore::new();
        insert(&store, "2026-05-01T00:00:00Z", RfpStatus::Won, true).await;
        store.fail_next("query", RFPS);
        let service = RfpService::new(store);

        let outcomes = service
            .list_firm_outcomes_at(OutcomeRange::All, at("2026-06-01T00:00:00Z"))
            .await;
        assert!(outcomes.is_empty());

        // the failure was one-off
        let outcomes = service
            .list_firm_outcomes_at(OutcomeRange::All, at("2026-06-01T00:00:00Z"))
            .await;
        assert_eq!(outcomes.len(), 1);
    }
}
