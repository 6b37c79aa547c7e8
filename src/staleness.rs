//! Section staleness decisions.
//!
//! A section is stale when at least one input it was generated from moved
//! after `last_generated_at`. Each section key only looks at its own
//! dependencies, and every reason that applies is reported.
//!
//! The check is a pure function over timestamps and hashes. Callers fetch
//! the dependency timestamps and persist the verdict.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Rfp, RfpBindings, RfpSection, SectionKey};
use crate::hash::hash;

pub const AGENCY_PROFILE_UPDATED: &str = "Agency Profile updated";
pub const TEAM_MEMBER_UPDATED: &str = "Team member updated";
pub const CASE_STUDY_UPDATED: &str = "Case study updated";
pub const REFERENCE_UPDATED: &str = "Reference updated";
pub const PRICING_TEMPLATE_UPDATED: &str = "Pricing template updated";
pub const PLAN_TEMPLATE_UPDATED: &str = "Plan template updated";
pub const SCOPE_SUMMARY_CHANGED: &str = "Scope summary changed";
pub const STRATEGY_UPDATED: &str = "Strategy updated";
/// Stored when a section is flagged stale without a specific reason
pub const DEPENDENCIES_UPDATED: &str = "Dependencies updated";

/// Current `updated_at` of everything a section can be bound to.
///
/// Anything absent here is treated as unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyTimestamps {
    pub agency_profile_updated_at: Option<DateTime<Utc>>,
    pub team_members: HashMap<String, DateTime<Utc>>,
    pub case_studies: HashMap<String, DateTime<Utc>>,
    pub references: HashMap<String, DateTime<Utc>>,
    pub pricing_template_updated_at: Option<DateTime<Utc>>,
    pub plan_template_updated_at: Option<DateTime<Utc>>,
    pub strategy_updated_at: Option<DateTime<Utc>>,
}

/// Everything one staleness check reads
#[derive(Debug, Clone, Copy)]
pub struct StalenessInput<'a> {
    pub rfp: &'a Rfp,
    pub bindings: &'a RfpBindings,
    pub deps: &'a DependencyTimestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessVerdict {
    pub is_stale: bool,
    pub stale_reason: Option<String>,
}

impl StalenessVerdict {
    pub fn fresh() -> Self {
        Self {
            is_stale: false,
            stale_reason: None,
        }
    }

    fn from_reasons(reasons: Vec<&str>) -> Self {
        if reasons.is_empty() {
            Self::fresh()
        } else {
            Self {
                is_stale: true,
                stale_reason: Some(reasons.join(", ")),
            }
        }
    }
}

/// Verdict for one section of an RFP, as produced by a refresh pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStaleness {
    pub section_id: String,
    pub section_key: SectionKey,
    #[serde(flatten)]
    pub verdict: StalenessVerdict,
    /// Whether the stored flags differed and were rewritten
    pub changed: bool,
}

/// Decide whether a section's generated content is out of date.
///
/// Never-generated sections are never stale. Timestamp comparisons are
/// strict: a dependency updated at the generation instant is fresh.
pub fn check_section_staleness(
    section: &RfpSection,
    input: &StalenessInput<'_>,
) -> StalenessVerdict {
    let (generated_at, provenance) = match (section.last_generated_at, &section.generated_using) {
        (Some(at), Some(provenance)) => (at, provenance),
        _ => return StalenessVerdict::fresh(),
    };

    let deps = input.deps;
    let bindings = input.bindings;
    let newer = |t: Option<&DateTime<Utc>>| t.is_some_and(|t| *t > generated_at);
    let any_newer = |ids: &[String], updated: &HashMap<String, DateTime<Utc>>| {
        ids.iter().any(|id| newer(updated.get(id)))
    };

    let key = section.section_key;
    let mut reasons = Vec::new();

    if matches!(key, SectionKey::AgencyOverview | SectionKey::Approach)
        && newer(deps.agency_profile_updated_at.as_ref())
    {
        reasons.push(AGENCY_PROFILE_UPDATED);
    }

    match key {
        SectionKey::Team if any_newer(&bindings.team_member_ids, &deps.team_members) => {
            reasons.push(TEAM_MEMBER_UPDATED);
        }
        SectionKey::WorkSamples if any_newer(&bindings.case_study_ids, &deps.case_studies) => {
            reasons.push(CASE_STUDY_UPDATED);
        }
        SectionKey::References if any_newer(&bindings.reference_ids, &deps.references) => {
            reasons.push(REFERENCE_UPDATED);
        }
        SectionKey::Pricing
            if bindings.pricing_template_id.is_some()
                && newer(deps.pricing_template_updated_at.as_ref()) =>
        {
            reasons.push(PRICING_TEMPLATE_UPDATED);
        }
        SectionKey::PlanTimeline
            if bindings.plan_template_id.is_some()
                && newer(deps.plan_template_updated_at.as_ref()) =>
        {
            reasons.push(PLAN_TEMPLATE_UPDATED);
        }
        _ => {}
    }

    if matches!(
        key,
        SectionKey::Approach | SectionKey::PlanTimeline | SectionKey::Pricing
    ) {
        // Sections generated before scope hashing existed carry no hash
        if let Some(ref recorded) = provenance.scope_summary_hash {
            let current = hash(input.rfp.scope_summary.as_deref().unwrap_or(""));
            if current != *recorded {
                reasons.push(SCOPE_SUMMARY_CHANGED);
            }
        }

        if provenance.strategy_version.is_some() && newer(deps.strategy_updated_at.as_ref()) {
            reasons.push(STRATEGY_UPDATED);
        }
    }

    StalenessVerdict::from_reasons(reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CreateRfpInput, GenerationProvenance, SECTION_ORDER};
    use chrono::Duration;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_secs)
    }

    fn rfp(scope: Option<&str>) -> Rfp {
        let mut rfp = Rfp::new(
            CreateRfpInput {
                company_id: "c1".to_string(),
                title: "Homepage".to_string(),
                scope_summary: scope.map(str::to_string),
                ..Default::default()
            },
            t(-100),
        );
        rfp.id = "r1".to_string();
        rfp
    }

    fn bindings() -> RfpBindings {
        let mut b = RfpBindings::empty("r1", t(-100));
        b.team_member_ids = vec!["m1".to_string(), "m2".to_string()];
        b.case_study_ids = vec!["cs1".to_string()];
        b.reference_ids = vec!["ref1".to_string()];
        b.pricing_template_id = Some("pt1".to_string());
        b.plan_template_id = Some("pl1".to_string());
        b
    }

    fn generated(key: SectionKey, scope: Option<&str>, strategy: Option<&str>) -> RfpSection {
        let mut section = RfpSection::seed("r1", key, t(-100));
        section.last_generated_at = Some(t(0));
        section.generated_using = Some(GenerationProvenance {
            scope_summary_hash: scope.map(hash),
            strategy_version: strategy.map(str::to_string),
            ..Default::default()
        });
        section
    }

    fn check(section: &RfpSection, rfp: &Rfp, deps: &DependencyTimestamps) -> StalenessVerdict {
        let b = bindings();
        check_section_staleness(
            section,
            &StalenessInput {
                rfp,
                bindings: &b,
                deps,
            },
        )
    }

    fn everything_changed() -> DependencyTimestamps {
        let ids = |names: &[&str]| {
            names
                .iter()
                .map(|n| (n.to_string(), t(500)))
                .collect::<HashMap<_, _>>()
        };
        DependencyTimestamps {
            agency_profile_updated_at: Some(t(500)),
            team_members: ids(&["m1", "m2"]),
            case_studies: ids(&["cs1"]),
            references: ids(&["ref1"]),
            pricing_template_updated_at: Some(t(500)),
            plan_template_updated_at: Some(t(500)),
            strategy_updated_at: Some(t(500)),
        }
    }

    #[test]
    fn test_never_generated_section_is_not_stale() {
        let rfp = rfp(Some("changed"));
        let deps = everything_changed();
        for key in SECTION_ORDER {
            let section = RfpSection::seed("r1", key, t(-100));
            assert_eq!(check(&section, &rfp, &deps), StalenessVerdict::fresh());
        }
    }

    #[test]
    fn test_missing_provenance_is_not_stale() {
        let rfp = rfp(None);
        let mut section = generated(SectionKey::Approach, None, None);
        section.generated_using = None;
        assert!(!check(&section, &rfp, &everything_changed()).is_stale);
    }

    #[test]
    fn test_nothing_changed_is_fresh() {
        let rfp = rfp(Some("Redesign homepage"));
        let deps = DependencyTimestamps::default();
        for key in SECTION_ORDER {
            let section = generated(key, Some("Redesign homepage"), Some("v1"));
            assert_eq!(check(&section, &rfp, &deps), StalenessVerdict::fresh());
        }
    }

    #[test]
    fn test_scope_change_flips_approach() {
        let rfp = rfp(Some("Redesign homepage and checkout"));
        let section = generated(SectionKey::Approach, Some("Redesign homepage"), None);

        let verdict = check(&section, &rfp, &DependencyTimestamps::default());
        assert!(verdict.is_stale);
        assert!(verdict
            .stale_reason
            .unwrap()
            .contains(SCOPE_SUMMARY_CHANGED));
    }

    #[test]
    fn test_scope_change_only_affects_scoped_sections() {
        let rfp = rfp(Some("Redesign homepage and checkout"));
        let deps = DependencyTimestamps::default();

        for key in SECTION_ORDER {
            let section = generated(key, Some("Redesign homepage"), None);
            let stale = check(&section, &rfp, &deps).is_stale;
            let expected = matches!(
                key,
                SectionKey::Approach | SectionKey::PlanTimeline | SectionKey::Pricing
            );
            assert_eq!(stale, expected, "section {}", key);
        }
    }

    #[test]
    fn test_scope_without_recorded_hash_never_fires() {
        let rfp = rfp(Some("Something else entirely"));
        let section = generated(SectionKey::Pricing, None, None);
        assert!(!check(&section, &rfp, &DependencyTimestamps::default()).is_stale);
    }

    #[test]
    fn test_missing_scope_hashes_as_empty_string() {
        let rfp = rfp(None);
        let section = generated(SectionKey::Approach, Some(""), None);
        assert!(!check(&section, &rfp, &DependencyTimestamps::default()).is_stale);
    }

    #[test]
    fn test_tie_is_not_stale() {
        let rfp = rfp(None);
        let section = generated(SectionKey::AgencyOverview, None, None);
        let deps = DependencyTimestamps {
            agency_profile_updated_at: Some(t(0)),
            ..Default::default()
        };
        assert!(!check(&section, &rfp, &deps).is_stale);

        let deps = DependencyTimestamps {
            agency_profile_updated_at: Some(t(1)),
            ..Default::default()
        };
        let verdict = check(&section, &rfp, &deps);
        assert!(verdict.is_stale);
        assert_eq!(verdict.stale_reason.as_deref(), Some(AGENCY_PROFILE_UPDATED));
    }

    #[test]
    fn test_team_reason_reported_once() {
        let rfp = rfp(None);
        let section = generated(SectionKey::Team, None, None);
        let deps = everything_changed();

        let verdict = check(&section, &rfp, &deps);
        assert_eq!(verdict.stale_reason.as_deref(), Some(TEAM_MEMBER_UPDATED));
    }

    #[test]
    fn test_unbound_team_member_is_ignored() {
        let rfp = rfp(None);
        let section = generated(SectionKey::Team, None, None);
        let mut deps = DependencyTimestamps::default();
        deps.team_members.insert("m3".to_string(), t(10));
        deps.team_members.insert("m1".to_string(), t(-10));

        assert_eq!(check(&section, &rfp, &deps), StalenessVerdict::fresh());
    }

    #[test]
    fn test_case_study_only_affects_work_samples() {
        let rfp = rfp(None);
        let mut deps = DependencyTimestamps::default();
        deps.case_studies.insert("cs1".to_string(), t(10));

        for key in SECTION_ORDER {
            let section = generated(key, None, None);
            let verdict = check(&section, &rfp, &deps);
            if key == SectionKey::WorkSamples {
                assert_eq!(verdict.stale_reason.as_deref(), Some(CASE_STUDY_UPDATED));
            } else {
                assert!(!verdict.is_stale, "section {}", key);
            }
        }
    }

    #[test]
    fn test_reference_only_affects_references() {
        let rfp = rfp(None);
        let mut deps = DependencyTimestamps::default();
        deps.references.insert("ref1".to_string(), t(10));

        let verdict = check(&generated(SectionKey::References, None, None), &rfp, &deps);
        assert_eq!(verdict.stale_reason.as_deref(), Some(REFERENCE_UPDATED));
        assert!(!check(&generated(SectionKey::Team, None, None), &rfp, &deps).is_stale);
    }

    #[test]
    fn test_unbound_templates_are_ignored() {
        let rfp = rfp(None);
        let deps = DependencyTimestamps {
            pricing_template_updated_at: Some(t(10)),
            plan_template_updated_at: Some(t(10)),
            ..Default::default()
        };
        let unbound = RfpBindings::empty("r1", t(-100));
        let input = StalenessInput {
            rfp: &rfp,
            bindings: &unbound,
            deps: &deps,
        };

        let pricing = generated(SectionKey::Pricing, None, None);
        let plan = generated(SectionKey::PlanTimeline, None, None);
        assert!(!check_section_staleness(&pricing, &input).is_stale);
        assert!(!check_section_staleness(&plan, &input).is_stale);

        // bound in the default fixture
        assert_eq!(
            check(&pricing, &rfp, &deps).stale_reason.as_deref(),
            Some(PRICING_TEMPLATE_UPDATED)
        );
        assert_eq!(
            check(&plan, &rfp, &deps).stale_reason.as_deref(),
            Some(PLAN_TEMPLATE_UPDATED)
        );
    }

    #[test]
    fn test_strategy_requires_recorded_version() {
        let rfp = rfp(None);
        let deps = DependencyTimestamps {
            strategy_updated_at: Some(t(10)),
            ..Default::default()
        };

        let without = generated(SectionKey::Approach, None, None);
        assert!(!check(&without, &rfp, &deps).is_stale);

        let with = generated(SectionKey::Approach, None, Some("v3"));
        assert_eq!(
            check(&with, &rfp, &deps).stale_reason.as_deref(),
            Some(STRATEGY_UPDATED)
        );

        // strategy does not reach non-strategic sections
        let team = generated(SectionKey::Team, None, Some("v3"));
        assert!(!check(&team, &rfp, &deps).is_stale);
    }

    #[test]
    fn test_reasons_are_additive() {
        let rfp = rfp(Some("Redesign homepage and checkout"));
        let deps = everything_changed();

        let approach = generated(SectionKey::Approach, Some("Redesign homepage"), Some("v1"));
        assert_eq!(
            check(&approach, &rfp, &deps).stale_reason.as_deref(),
            Some("Agency Profile updated, Scope summary changed, Strategy updated")
        );

        let pricing = generated(SectionKey::Pricing, Some("Redesign homepage"), Some("v1"));
        assert_eq!(
            check(&pricing, &rfp, &deps).stale_reason.as_deref(),
            Some("Pricing template updated, Scope summary changed, Strategy updated")
        );
    }

    #[test]
    fn test_stale_always_has_reason() {
        let rfp = rfp(Some("new scope"));
        let deps = everything_changed();
        for key in SECTION_ORDER {
            let verdict = check(&generated(key, Some("old scope"), Some("v1")), &rfp, &deps);
            assert!(verdict.is_stale);
            assert!(verdict.stale_reason.is_some());
        }
    }
}
