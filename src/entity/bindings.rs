use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External artifacts an RFP's sections are attributed to. One per RFP,
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfpBindings {
    pub id: String,
    pub rfp_id: String,
    pub team_member_ids: Vec<String>,
    pub case_study_ids: Vec<String>,
    pub reference_ids: Vec<String>,
    pub pricing_template_id: Option<String>,
    pub plan_template_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RfpBindings {
    pub fn empty(rfp_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            rfp_id: rfp_id.to_string(),
            team_member_ids: Vec::new(),
            case_study_ids: Vec::new(),
            reference_ids: Vec::new(),
            pricing_template_id: None,
            plan_template_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Artifact ids as they stood when a submission was recorded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfpBindingsSnapshot {
    pub team_member_ids: Vec<String>,
    pub case_study_ids: Vec<String>,
    pub reference_ids: Vec<String>,
    pub pricing_template_id: Option<String>,
    pub plan_template_id: Option<String>,
}

impl From<&RfpBindings> for RfpBindingsSnapshot {
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

/// Update payload for bindings
#[derive(Debug, Clone, Default)]
pub struct BindingsUpdate {
    pub team_member_ids: Option<Vec<String>>,
    pub case_study_ids: Option<Vec<String>>,
    pub reference_ids: Option<Vec<String>>,
    pub pricing_template_id: Option<Option<String>>, // Some(None) to clear
    pub plan_template_id: Option<Option<String>>,
}
