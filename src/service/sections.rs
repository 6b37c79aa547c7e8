use crate::entity::record::{self, section_from_record, section_update_fields};
use crate::entity::{
    BindingsUpdate, GenerationProvenance, RfpBindings, RfpSection, SectionKey, SectionStatus,
    SectionUpdate, SourceType,
};
use crate::error::{RfpError, Result};
use crate::staleness::{
    check_section_staleness, DependencyTimestamps, SectionStaleness, StalenessInput,
    DEPENDENCIES_UPDATED,
};
use crate::storage::{DocumentStore, Filter, Query, RFP_BINDINGS, RFP_SECTIONS};

use super::{persistence, RfpService};

impl<S: DocumentStore> RfpService<S> {
    /// All sections of an RFP in display order
    pub async fn get_sections(&self, rfp_id: &str) -> Result<Vec<RfpSection>> {
        let mut sections = self.query_sections(rfp_id).await?;
        sections.sort_by_key(|s| s.section_key.order_index());
        Ok(sections)
    }

    pub async fn get_section(&self, id: &str) -> Result<Option<RfpSection>> {
        let found = self
            .store
            .find(RFP_SECTIONS, id)
            .await
            .map_err(|e| persistence("find section", e))?;
        Ok(found.as_ref().and_then(section_from_record))
    }

    pub async fn get_section_by_key(
        &self,
        rfp_id: &str,
        key: SectionKey,
    ) -> Result<Option<RfpSection>> {
        let query = Query::new(Filter::And(vec![
            Filter::eq("rfp_id", rfp_id),
            Filter::eq("section_key", key.as_str()),
        ]))
        .limit(1);
        let records = self
            .store
            .query(RFP_SECTIONS, &query)
            .await
            .map_err(|e| persistence("query section", e))?;
        Ok(records.first().and_then(section_from_record))
    }

    /// Merge the provided fields. `None` when the section does not exist.
    ///
    /// Clearing the generation timestamp or provenance also clears
    /// staleness. A section without a generation is never stale.
    pub async fn update_section(
        &self,
        id: &str,
        update: SectionUpdate,
    ) -> Result<Option<RfpSection>> {
        if self.get_section(id).await?.is_none() {
            return Ok(None);
        }

        let now = record::now();
        let mut fields = section_update_fields(&update, &now)?;
        if matches!(update.last_generated_at, Some(None))
            || matches!(update.generated_using, Some(None))
        {
            fields.extend(record::staleness_fields(false, None, &now));
        }
        self.write_section(id, fields, "update section").await
    }

    /// Store freshly generated content with its provenance.
    ///
    /// Clears staleness. Regenerating an approved section sends it back to
    /// drafted and flags it for review.
    pub async fn record_generation(
        &self,
        id: &str,
        content: String,
        provenance: GenerationProvenance,
        source_type: SourceType,
    ) -> Result<Option<RfpSection>> {
        let section = match self.get_section(id).await? {
            Some(section) => section,
            None => return Ok(None),
        };

        let now = record::now();
        let update = SectionUpdate {
            status: Some(SectionStatus::Drafted),
            content_working: Some(Some(content)),
            source_type: Some(Some(source_type)),
            generated_using: Some(Some(provenance)),
            last_generated_at: Some(Some(now)),
            needs_review: Some(section.status == SectionStatus::Approved),
            ..Default::default()
        };
        let mut fields = section_update_fields(&update, &now)?;
        fields.extend(record::staleness_fields(false, None, &now));

        tracing::debug!(section = id, key = %section.section_key, "recorded generation");
        self.write_section(id, fields, "record generation").await
    }

    /// Lock the working content as the approved content.
    pub async fn approve_section(&self, id: &str) -> Result<Option<RfpSection>> {
        let section = match self.get_section(id).await? {
            Some(section) => section,
            None => return Ok(None),
        };

        let content = section.content_working.ok_or_else(|| {
            RfpError::InvalidState(format!("section {id} has no working content to approve"))
        })?;

        let update = SectionUpdate {
            status: Some(SectionStatus::Approved),
            content_approved: Some(Some(content)),
            needs_review: Some(false),
            ..Default::default()
        };
        let fields = section_update_fields(&update, &record::now())?;
        self.write_section(id, fields, "approve section").await
    }

    /// Persist a staleness verdict.
    ///
    /// A fresh verdict always clears the reason; a stale one always has one.
    pub async fn update_section_staleness(
        &self,
        id: &str,
        is_stale: bool,
        stale_reason: Option<String>,
    ) -> Result<Option<RfpSection>> {
        if self.get_section(id).await?.is_none() {
            return Ok(None);
        }

        let reason = if is_stale {
            Some(
                stale_reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEPENDENCIES_UPDATED.to_string()),
            )
        } else {
            None
        };
        let fields = record::staleness_fields(is_stale, reason.as_ref(), &record::now());
        self.write_section(id, fields, "update staleness").await
    }

    /// Run the staleness check over every section of an RFP and write back
    /// the verdicts that changed. `None` when the RFP does not exist.
    pub async fn refresh_staleness(
        &self,
        rfp_id: &str,
        deps: &DependencyTimestamps,
    ) -> Result<Option<Vec<SectionStaleness>>> {
        let rfp = match self.get_rfp(rfp_id).await? {
            Some(rfp) => rfp,
            None => return Ok(None),
        };
        let bindings = match self.get_bindings(rfp_id).await? {
            Some(bindings) => bindings,
            None => {
                tracing::warn!(rfp = rfp_id, "no bindings record, checking against empty bindings");
                RfpBindings::empty(rfp_id, rfp.created_at)
            }
        };

        let input = StalenessInput {
            rfp: &rfp,
            bindings: &bindings,
            deps,
        };

        let mut results = Vec::new();
        for section in self.get_sections(rfp_id).await? {
            let verdict = check_section_staleness(&section, &input);
            let changed = verdict.is_stale != section.is_stale
                || verdict.stale_reason != section.stale_reason;

            if changed {
                self.update_section_staleness(
                    &section.id,
                    verdict.is_stale,
                    verdict.stale_reason.clone(),
                )
                .await?;
            }

            results.push(SectionStaleness {
                section_id: section.id,
                section_key: section.section_key,
                verdict,
                changed,
            });
        }

        let stale = results.iter().filter(|r| r.verdict.is_stale).count();
        tracing::info!(rfp = rfp_id, stale, "refreshed staleness");
        Ok(Some(results))
    }

    /// The RFP's bindings record. If duplicates exist the oldest wins.
    pub async fn get_bindings(&self, rfp_id: &str) -> Result<Option<RfpBindings>> {
        let mut bindings = self.query_bindings(rfp_id).await?;
        if bindings.len() > 1 {
            tracing::warn!(rfp = rfp_id, count = bindings.len(), "multiple bindings records");
        }
        Ok(if bindings.is_empty() {
            None
        } else {
            Some(bindings.remove(0))
        })
    }

    /// Merge into the RFP's bindings in place. `None` when there are none.
    pub async fn update_bindings(
        &self,
        rfp_id: &str,
        update: BindingsUpdate,
    ) -> Result<Option<RfpBindings>> {
        let bindings = match self.get_bindings(rfp_id).await? {
            Some(bindings) => bindings,
            None => return Ok(None),
        };

        let fields = record::bindings_update_fields(&update, &record::now());
        match self.store.update(RFP_BINDINGS, &bindings.id, fields).await {
            Ok(updated) => Ok(record::bindings_from_record(&updated)),
            Err(RfpError::NotFound(_)) => Ok(None),
            Err(e) => Err(persistence("update bindings", e)),
        }
    }

    async fn write_section(
        &self,
        id: &str,
        fields: crate::storage::Fields,
        context: &str,
    ) -> Result<Option<RfpSection>> {
        match self.store.update(RFP_SECTIONS, id, fields).await {
            Ok(updated) => Ok(section_from_record(&updated)),
            Err(RfpError::NotFound(_)) => Ok(None),
            Err(e) => Err(persistence(context, e)),
        }
    }
}
