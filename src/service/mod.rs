//! RFP workflow over a [`DocumentStore`].
//!
//! Creation seeds the seven sections and the bindings record; deletion
//! cascades children first. The store has no cross-record transactions: a
//! create whose seeding fails removes what it wrote, and seeding is
//! idempotent so [`RfpService::ensure_children`] can repair older records.

mod outcomes;
mod sections;

pub use outcomes::{OutcomeRange, OutcomeRecord};

use std::collections::HashSet;

use crate::entity::record::{self, rfp_from_record, rfp_to_fields, rfp_update_fields};
use crate::entity::{
    CreateRfpInput, Rfp, RfpBindings, RfpBindingsSnapshot, RfpSection, RfpUpdate, SectionKey,
    SectionStatus, SubmissionSnapshot, SECTION_ORDER,
};
use crate::error::{RfpError, Result};
use crate::storage::{DocumentStore, Fields, Filter, Query, Sort, RFPS, RFP_BINDINGS, RFP_SECTIONS};

pub struct RfpService<S> {
    store: S,
}

/// Wrap a failed store call with context. Typed outcomes pass through.
fn persistence(context: &str, err: RfpError) -> RfpError {
    match err {
        RfpError::NotFound(_) | RfpError::Persistence(_) => err,
        other => {
            tracing::error!(context, error = %other, "store call failed");
            RfpError::Persistence(format!("{context}: {other}"))
        }
    }
}

impl<S: DocumentStore> RfpService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Create an RFP with its seven empty sections and empty bindings.
    ///
    /// If seeding fails the RFP and any children already written are removed
    /// before the error is returned.
    pub async fn create_rfp(&self, input: CreateRfpInput) -> Result<Rfp> {
        if input.company_id.trim().is_empty() {
            return Err(RfpError::InvalidInput("company_id is required".to_string()));
        }
        if input.title.trim().is_empty() {
            return Err(RfpError::InvalidInput("title is required".to_string()));
        }

        let mut rfp = Rfp::new(input, record::now());
        let created = self
            .store
            .create(RFPS, rfp_to_fields(&rfp)?)
            .await
            .map_err(|e| persistence("create rfp", e))?;
        rfp.id = created.id;

        if let Err(e) = self.ensure_children(&rfp.id).await {
            tracing::warn!(rfp = %rfp.id, error = %e, "seeding failed, rolling back create");
            self.rollback_create(&rfp.id).await;
            return Err(e);
        }
        tracing::info!(rfp = %rfp.id, company = %rfp.company_id, "created rfp");
        Ok(rfp)
    }

    /// Best-effort removal of a half-created RFP. Failures are logged with
    /// the RFP id so the leftovers can be cleaned up by hand.
    async fn rollback_create(&self, rfp_id: &str) {
        let children = [(RFP_SECTIONS, "sections"), (RFP_BINDINGS, "bindings")];
        for (table, kind) in children {
            let query = Query::new(Filter::eq("rfp_id", rfp_id));
            let ids = match self.store.query(table, &query).await {
                Ok(records) => records.into_iter().map(|r| r.id).collect::<Vec<_>>(),
                Err(e) => {
                    tracing::error!(rfp = rfp_id, kind, error = %e, "rollback query failed");
                    continue;
                }
            };
            if let Err(e) = self.store.destroy(table, &ids).await {
                tracing::error!(rfp = rfp_id, kind, error = %e, "rollback delete failed");
            }
        }
        if let Err(e) = self.store.destroy(RFPS, &[rfp_id.to_string()]).await {
            tracing::error!(rfp = rfp_id, error = %e, "rollback left rfp behind");
        }
    }

    /// Seed whatever sections and bindings an RFP is missing.
    ///
    /// Safe to call repeatedly: existing section keys and an existing
    /// bindings record are left untouched.
    pub async fn ensure_children(&self, rfp_id: &str) -> Result<()> {
        let now = record::now();

        let present: HashSet<SectionKey> = self
            .query_sections(rfp_id)
            .await?
            .into_iter()
            .map(|s| s.section_key)
            .collect();

        let missing = SECTION_ORDER
            .iter()
            .filter(|key| !present.contains(key))
            .map(|key| record::section_to_fields(&RfpSection::seed(rfp_id, *key, now)))
            .collect::<Result<Vec<Fields>>>()?;

        if !missing.is_empty() {
            tracing::debug!(rfp = rfp_id, count = missing.len(), "seeding sections");
            self.store
                .create_many(RFP_SECTIONS, missing)
                .await
                .map_err(|e| persistence("seed sections", e))?;
        }

        if self.query_bindings(rfp_id).await?.is_empty() {
            self.store
                .create(
                    RFP_BINDINGS,
                    record::bindings_to_fields(&RfpBindings::empty(rfp_id, now)),
                )
                .await
                .map_err(|e| persistence("seed bindings", e))?;
        }

        Ok(())
    }

    pub async fn get_rfp(&self, id: &str) -> Result<Option<Rfp>> {
        let found = self
            .store
            .find(RFPS, id)
            .await
            .map_err(|e| persistence("find rfp", e))?;
        Ok(found.as_ref().and_then(rfp_from_record))
    }

    /// RFPs for one company, newest first
    pub async fn list_rfps(&self, company_id: &str) -> Result<Vec<Rfp>> {
        let query = Query::new(Filter::eq("company_id", company_id)).sort(Sort::desc("created_at"));
        let records = self
            .store
            .query(RFPS, &query)
            .await
            .map_err(|e| persistence("list rfps", e))?;
        Ok(records.iter().filter_map(rfp_from_record).collect())
    }

    /// Merge the provided fields. `None` when the RFP does not exist.
    pub async fn update_rfp(&self, id: &str, update: RfpUpdate) -> Result<Option<Rfp>> {
        if self.get_rfp(id).await?.is_none() {
            return Ok(None);
        }

        let fields = rfp_update_fields(&update, &record::now())?;
        match self.store.update(RFPS, id, fields).await {
            Ok(updated) => Ok(rfp_from_record(&updated)),
            Err(RfpError::NotFound(_)) => Ok(None),
            Err(e) => Err(persistence("update rfp", e)),
        }
    }

    /// Delete an RFP, its sections and its bindings.
    ///
    /// Children go first. If removing the RFP itself then fails, the error is
    /// logged and returned as [`RfpError::PartialDelete`].
    pub async fn delete_rfp(&self, id: &str) -> Result<bool> {
        if self.get_rfp(id).await?.is_none() {
            return Ok(false);
        }

        let section_ids: Vec<String> = self
            .section_records(id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.store
            .destroy(RFP_SECTIONS, &section_ids)
            .await
            .map_err(|e| persistence("delete sections", e))?;

        let binding_ids: Vec<String> = self
            .query_bindings(id)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();
        self.store
            .destroy(RFP_BINDINGS, &binding_ids)
            .await
            .map_err(|e| persistence("delete bindings", e))?;

        if let Err(e) = self.store.destroy(RFPS, &[id.to_string()]).await {
            tracing::error!(rfp = id, error = %e, "children deleted but rfp delete failed");
            return Err(RfpError::PartialDelete(format!("rfp {id}: {e}")));
        }

        tracing::info!(
            rfp = id,
            sections = section_ids.len(),
            bindings = binding_ids.len(),
            "deleted rfp"
        );
        Ok(true)
    }

    /// Attach the outcome snapshot to a decided RFP. Recorded once.
    pub async fn record_submission_snapshot(
        &self,
        id: &str,
        snapshot: SubmissionSnapshot,
    ) -> Result<Option<Rfp>> {
        let mut rfp = match self.get_rfp(id).await? {
            Some(rfp) => rfp,
            None => return Ok(None),
        };

        if !rfp.status.is_decided() {
            return Err(RfpError::InvalidState(format!(
                "rfp {id} is {}; snapshots are recorded for won or lost rfps",
                rfp.status
            )));
        }
        if snapshot.outcome != rfp.status {
            return Err(RfpError::InvalidState(format!(
                "snapshot outcome {} does not match rfp status {}",
                snapshot.outcome, rfp.status
            )));
        }
        if rfp.submission_snapshot.is_some() {
            return Err(RfpError::SnapshotAlreadyRecorded);
        }

        rfp.submission_snapshot = Some(snapshot);
        let fields = record::snapshot_fields(&rfp, &record::now())?;
        let updated = self
            .store
            .update(RFPS, id, fields)
            .await
            .map_err(|e| persistence("record snapshot", e))?;
        Ok(rfp_from_record(&updated))
    }

    /// Snapshot the approved sections and current bindings of a decided RFP.
    pub async fn record_outcome(
        &self,
        id: &str,
        pricing_total: Option<f64>,
        notes: Option<String>,
    ) -> Result<Option<Rfp>> {
        let rfp = match self.get_rfp(id).await? {
            Some(rfp) => rfp,
            None => return Ok(None),
        };

        let section_keys = self
            .get_sections(id)
            .await?
            .into_iter()
            .filter(|s| s.status == SectionStatus::Approved)
            .map(|s| s.section_key)
            .collect();
        let bindings = self
            .get_bindings(id)
            .await?
            .map(|b| RfpBindingsSnapshot::from(&b))
            .unwrap_or_default();

        let snapshot = SubmissionSnapshot {
            submitted_at: record::now(),
            outcome: rfp.status,
            section_keys,
            bindings,
            pricing_total,
            notes,
        };
        self.record_submission_snapshot(id, snapshot).await
    }

    async fn section_records(&self, rfp_id: &str) -> Result<Vec<crate::storage::Record>> {
        self.store
            .query(RFP_SECTIONS, &Query::new(Filter::eq("rfp_id", rfp_id)))
            .await
            .map_err(|e| persistence("query sections", e))
    }

    async fn query_sections(&self, rfp_id: &str) -> Result<Vec<RfpSection>> {
        Ok(self
            .section_records(rfp_id)
            .await?
            .iter()
            .filter_map(record::section_from_record)
            .collect())
    }

    async fn query_bindings(&self, rfp_id: &str) -> Result<Vec<RfpBindings>> {
        let query = Query::new(Filter::eq("rfp_id", rfp_id)).sort(Sort::asc("created_at"));
        let records = self
            .store
            .query(RFP_BINDINGS, &query)
            .await
            .map_err(|e| persistence("query bindings", e))?;
        Ok(records.iter().filter_map(record::bindings_from_record).collect())
    }
}
