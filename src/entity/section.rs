use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bindings::RfpBindings;
use super::rfp::Rfp;
use crate::hash::hash;

/// The seven fixed content blocks of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    AgencyOverview,
    Approach,
    Team,
    WorkSamples,
    PlanTimeline,
    Pricing,
    References,
}

/// Display and storage order of sections within an RFP.
pub const SECTION_ORDER: [SectionKey; 7] = [
    SectionKey::AgencyOverview,
    SectionKey::Approach,
    SectionKey::Team,
    SectionKey::WorkSamples,
    SectionKey::PlanTimeline,
    SectionKey::Pricing,
    SectionKey::References,
];

impl SectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::AgencyOverview => "agency_overview",
            SectionKey::Approach => "approach",
            SectionKey::Team => "team",
            SectionKey::WorkSamples => "work_samples",
            SectionKey::PlanTimeline => "plan_timeline",
            SectionKey::Pricing => "pricing",
            SectionKey::References => "references",
        }
    }

    /// Title a freshly seeded section starts with
    pub fn default_title(&self) -> &'static str {
        match self {
            SectionKey::AgencyOverview => "Agency Overview",
            SectionKey::Approach => "Approach",
            SectionKey::Team => "Team",
            SectionKey::WorkSamples => "Work Samples",
            SectionKey::PlanTimeline => "Plan & Timeline",
            SectionKey::Pricing => "Pricing",
            SectionKey::References => "References",
        }
    }

    /// Position in [`SECTION_ORDER`]
    pub fn order_index(&self) -> usize {
        SECTION_ORDER
            .iter()
            .position(|k| k == self)
            .unwrap_or(SECTION_ORDER.len())
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SectionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "agency_overview" => Ok(SectionKey::AgencyOverview),
            "approach" => Ok(SectionKey::Approach),
            "team" => Ok(SectionKey::Team),
            "work_samples" => Ok(SectionKey::WorkSamples),
            "plan_timeline" => Ok(SectionKey::PlanTimeline),
            "pricing" => Ok(SectionKey::Pricing),
            "references" => Ok(SectionKey::References),
            _ => Err(format!("Invalid section key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    #[default]
    Empty,
    Drafted,
    Approved,
}

impl std::fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionStatus::Empty => write!(f, "empty"),
            SectionStatus::Drafted => write!(f, "drafted"),
            SectionStatus::Approved => write!(f, "approved"),
        }
    }
}

impl std::str::FromStr for SectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(SectionStatus::Empty),
            "drafted" => Ok(SectionStatus::Drafted),
            "approved" => Ok(SectionStatus::Approved),
            _ => Err(format!("Invalid section status: {}", s)),
        }
    }
}

/// How a section's working content came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Generated,
    Manual,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Generated => write!(f, "generated"),
            SourceType::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generated" => Ok(SourceType::Generated),
            "manual" => Ok(SourceType::Manual),
            _ => Err(format!("Invalid source type: {}", s)),
        }
    }
}

/// Artifact ids a section's content was generated against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundArtifactIds {
    pub team_member_ids: Vec<String>,
    pub case_study_ids: Vec<String>,
    pub reference_ids: Vec<String>,
    pub pricing_template_id: Option<String>,
    pub plan_template_id: Option<String>,
}

impl From<&RfpBindings> for BoundArtifactIds {
    fn from(bindings: &RfpBindings) -> Self {
        Self {
            team_member_ids: bindings.team_member_ids.clone(),
            case_study_ids: bindings.case_study_ids.clone(),
            reference_ids: bindings.reference_ids.clone(),
            pricing_template_id: bindings.pricing_template_id.clone(),
            plan_template_id: bindings.plan_template_id.clone(),
        }
    }
}

/// Fingerprint captured when a section's content was last generated.
///
/// Serialized with camelCase keys so fingerprints written by other
/// producers of the same record store decode unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationProvenance {
    pub scope_summary_hash: Option<String>,
    pub strategy_version: Option<String>,
    pub bound_artifact_ids: BoundArtifactIds,
}

impl GenerationProvenance {
    /// Fingerprint the current RFP scope and bindings for a new generation.
    pub fn capture(rfp: &Rfp, bindings: &RfpBindings, strategy_version: Option<String>) -> Self {
        Self {
            scope_summary_hash: Some(hash(rfp.scope_summary.as_deref().unwrap_or(""))),
            strategy_version,
            bound_artifact_ids: BoundArtifactIds::from(bindings),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfpSection {
    pub id: String,
    pub rfp_id: String,
    pub section_key: SectionKey,
    pub title: String,
    pub status: SectionStatus,
    pub content_working: Option<String>,
    pub content_approved: Option<String>,
    pub source_type: Option<SourceType>,
    pub generated_using: Option<GenerationProvenance>,
    pub needs_review: bool,
    pub last_generated_at: Option<DateTime<Utc>>,
    /// Derived; only the staleness engine's verdict is written here
    pub is_stale: bool,
    pub stale_reason: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RfpSection {
    /// An empty, never-generated section
    pub fn seed(rfp_id: &str, section_key: SectionKey, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            rfp_id: rfp_id.to_string(),
            section_key,
            title: section_key.default_title().to_string(),
            status: SectionStatus::Empty,
            content_working: None,
            content_approved: None,
            source_type: None,
            generated_using: None,
            needs_review: false,
            last_generated_at: None,
            is_stale: false,
            stale_reason: None,
            review_notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Update payload for a section.
///
/// `rfp_id` and `section_key` are fixed at creation and have no field here.
/// Staleness is written only through the staleness write-back.
#[derive(Debug, Clone, Default)]
pub struct SectionUpdate {
    pub title: Option<String>,
    pub status: Option<SectionStatus>,
    pub content_working: Option<Option<String>>, // Some(None) to clear
    pub content_approved: Option<Option<String>>,
    pub source_type: Option<Option<SourceType>>,
    pub generated_using: Option<Option<GenerationProvenance>>,
    pub needs_review: Option<bool>,
    pub last_generated_at: Option<Option<DateTime<Utc>>>,
    pub review_notes: Option<Option<String>>,
}

impl SectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.content_working.is_none()
            && self.content_approved.is_none()
            && self.source_type.is_none()
            && self.generated_using.is_none()
            && self.needs_review.is_none()
            && self.last_generated_at.is_none()
            && self.review_notes.is_none()
    }
}
