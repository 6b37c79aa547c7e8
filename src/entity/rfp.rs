use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::bindings::RfpBindingsSnapshot;
use super::section::SectionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RfpStatus {
    #[default]
    Intake,
    InProgress,
    Submitted,
    Won,
    Lost,
}

impl RfpStatus {
    /// Won or lost: the RFP's fate is known
    pub fn is_decided(&self) -> bool {
        matches!(self, RfpStatus::Won | RfpStatus::Lost)
    }
}

impl std::fmt::Display for RfpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RfpStatus::Intake => write!(f, "intake"),
            RfpStatus::InProgress => write!(f, "in_progress"),
            RfpStatus::Submitted => write!(f, "submitted"),
            RfpStatus::Won => write!(f, "won"),
            RfpStatus::Lost => write!(f, "lost"),
        }
    }
}

impl std::str::FromStr for RfpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "intake" => Ok(RfpStatus::Intake),
            "in_progress" | "inprogress" => Ok(RfpStatus::InProgress),
            "submitted" => Ok(RfpStatus::Submitted),
            "won" => Ok(RfpStatus::Won),
            "lost" => Ok(RfpStatus::Lost),
            _ => Err(format!("Invalid RFP status: {}", s)),
        }
    }
}

/// Commercial shape of the proposal. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectedPath {
    #[default]
    Project,
    Retainer,
}

impl std::fmt::Display for SelectedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectedPath::Project => write!(f, "project"),
            SelectedPath::Retainer => write!(f, "retainer"),
        }
    }
}

impl std::str::FromStr for SelectedPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(SelectedPath::Project),
            "retainer" => Ok(SelectedPath::Retainer),
            _ => Err(format!("Invalid selected path: {}", s)),
        }
    }
}

/// Requirements extracted from the issuer's RFP document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedRequirements {
    pub requirements: Vec<String>,
    pub evaluation_criteria: Vec<String>,
    pub submission_format: Option<String>,
    pub deadlines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinStrategy {
    pub themes: Vec<String>,
    pub differentiators: Vec<String>,
    pub proof_points: Vec<String>,
    pub competitive_positioning: Option<String>,
}

/// What was submitted, frozen at the moment the outcome was decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSnapshot {
    pub submitted_at: DateTime<Utc>,
    pub outcome: RfpStatus,
    #[serde(default)]
    pub section_keys: Vec<SectionKey>,
    #[serde(default)]
    pub bindings: RfpBindingsSnapshot,
    #[serde(default)]
    pub pricing_total: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfp {
    pub id: String,
    pub company_id: String,
    pub opportunity_id: Option<String>,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub status: RfpStatus,
    /// Free-text scope; several sections key off its hash
    pub scope_summary: Option<String>,
    pub selected_path: SelectedPath,
    pub parsed_requirements: Option<ParsedRequirements>,
    pub competitors: Vec<String>,
    pub win_strategy: Option<WinStrategy>,
    pub submission_snapshot: Option<SubmissionSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an RFP
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateRfpInput {
    pub company_id: String,
    pub opportunity_id: Option<String>,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub scope_summary: Option<String>,
    pub selected_path: Option<SelectedPath>,
    pub parsed_requirements: Option<ParsedRequirements>,
    pub competitors: Vec<String>,
    pub win_strategy: Option<WinStrategy>,
}

impl Rfp {
    pub fn new(input: CreateRfpInput, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            company_id: input.company_id,
            opportunity_id: input.opportunity_id,
            title: input.title,
            due_date: input.due_date,
            status: RfpStatus::default(),
            scope_summary: input.scope_summary,
            selected_path: input.selected_path.unwrap_or_default(),
            parsed_requirements: input.parsed_requirements,
            competitors: input.competitors,
            win_strategy: input.win_strategy,
            submission_snapshot: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Update payload for an RFP. The submission snapshot is recorded
/// separately and cannot be changed through here.
#[derive(Debug, Clone, Default)]
pub struct RfpUpdate {
    pub title: Option<String>,
    pub opportunity_id: Option<Option<String>>, // Some(None) to clear
    pub due_date: Option<Option<NaiveDate>>,
    pub status: Option<RfpStatus>,
    pub scope_summary: Option<Option<String>>,
    pub selected_path: Option<SelectedPath>,
    pub parsed_requirements: Option<Option<ParsedRequirements>>,
    pub competitors: Option<Vec<String>>,
    pub win_strategy: Option<Option<WinStrategy>>,
}
