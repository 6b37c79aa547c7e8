use std::env;
use std::fs;
use std::future::Future;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::runtime::Runtime;

use crate::config::{StoreConfig, ROOT_ENV};
use crate::entity::{
    BindingsUpdate, CreateRfpInput, GenerationProvenance, Rfp, RfpBindings, RfpSection, RfpStatus,
    RfpUpdate, SectionStatus, SectionUpdate, SelectedPath, SourceType,
};
use crate::error::{RfpError, Result};
use crate::service::{OutcomeRange, RfpService};
use crate::staleness::DependencyTimestamps;
use crate::storage::LoroStore;

/// Find the project root: `RFPDESK_DIR` if set, else walk up looking for
/// the store directory or .git/
fn find_project_root(config: &StoreConfig) -> PathBuf {
    if let Some(dir) = env::var_os(ROOT_ENV) {
        return PathBuf::from(dir);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if config.store_dir(current).exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

/// An opened project: the service over the on-disk store plus a runtime
/// to drive it.
struct Project {
    service: RfpService<LoroStore>,
    runtime: Runtime,
}

impl Project {
    fn open() -> Result<Self> {
        let config = StoreConfig::default();
        let root = find_project_root(&config);
        let store = LoroStore::open(&root, &config)?;
        tracing::debug!(root = %root.display(), "opened project");

        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        Ok(Self {
            service: RfpService::new(store),
            runtime,
        })
    }

    fn run<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    fn save(&self) -> Result<()> {
        self.service.store().save()
    }
}

fn read_stdin() -> Result<Option<String>> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(if content.is_empty() { None } else { Some(content) })
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        RfpError::InvalidInput(format!("Invalid date '{}'. Expected YYYY-MM-DD", value))
    })
}

fn parse_arg<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(RfpError::InvalidInput)
}

fn rfp_not_found(id: &str) -> RfpError {
    RfpError::NotFound(format!("rfp {}", id))
}

fn section_not_found(id: &str) -> RfpError {
    RfpError::NotFound(format!("section {}", id))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_rfp(rfp: &Rfp) {
    println!("RFP {}", rfp.id);
    println!("Title: {}", rfp.title);
    println!("Company: {}", rfp.company_id);
    println!("Status: {}", rfp.status);
    println!("Path: {}", rfp.selected_path);
    if let Some(due) = rfp.due_date {
        println!("Due: {}", due);
    }
    if !rfp.competitors.is_empty() {
        println!("Competitors: {}", rfp.competitors.join(", "));
    }
    println!("Created: {}", rfp.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(ref snapshot) = rfp.submission_snapshot {
        println!(
            "Outcome: {} (recorded {})",
            snapshot.outcome,
            snapshot.submitted_at.format("%Y-%m-%d")
        );
    }
    if let Some(ref scope) = rfp.scope_summary {
        println!("\n{}", scope);
    }
}

fn print_section(section: &RfpSection) {
    println!("Section {} ({})", section.title, section.id);
    println!("Key: {}", section.section_key);
    println!("Status: {}", section.status);
    if let Some(at) = section.last_generated_at {
        println!("Generated: {}", at.format("%Y-%m-%d %H:%M"));
    }
    if section.needs_review {
        println!("Needs review");
    }
    if let Some(ref reason) = section.stale_reason {
        println!("Stale: {}", reason);
    }
    if let Some(ref notes) = section.review_notes {
        println!("Notes: {}", notes);
    }
    if let Some(ref content) = section.content_working {
        println!("\n{}", content);
    }
}

fn print_bindings(bindings: &RfpBindings) {
    let list = |ids: &[String]| {
        if ids.is_empty() {
            "-".to_string()
        } else {
            ids.join(", ")
        }
    };
    println!("Bindings for RFP {}", bindings.rfp_id);
    println!("  team members:     {}", list(&bindings.team_member_ids));
    println!("  case studies:     {}", list(&bindings.case_study_ids));
    println!("  references:       {}", list(&bindings.reference_ids));
    println!(
        "  pricing template: {}",
        bindings.pricing_template_id.as_deref().unwrap_or("-")
    );
    println!(
        "  plan template:    {}",
        bindings.plan_template_id.as_deref().unwrap_or("-")
    );
}

pub fn handle_init() -> Result<()> {
    let root = match env::var_os(ROOT_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir()?,
    };

    let _store = LoroStore::init(&root, &StoreConfig::default())?;

    println!("Initialized rfpdesk project in {}", root.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_rfp_create(
    title: String,
    company: String,
    scope: Option<String>,
    due: Option<String>,
    opportunity: Option<String>,
    path: Option<String>,
    competitors: Vec<String>,
    json: bool,
) -> Result<()> {
    let project = Project::open()?;

    let input = CreateRfpInput {
        company_id: company,
        opportunity_id: opportunity,
        title,
        due_date: due.as_deref().map(parse_date).transpose()?,
        scope_summary: scope,
        selected_path: path.as_deref().map(parse_arg::<SelectedPath>).transpose()?,
        competitors,
        ..Default::default()
    };

    let rfp = project.run(project.service.create_rfp(input))?;
    project.save()?;

    if json {
        print_json(&rfp)?;
    } else {
        println!("Created RFP {} - {}", rfp.id, rfp.title);
    }

    Ok(())
}

pub fn handle_rfp_list(company: String, json: bool) -> Result<()> {
    let project = Project::open()?;
    let rfps = project.run(project.service.list_rfps(&company))?;

    if json {
        print_json(&rfps)?;
    } else if rfps.is_empty() {
        println!("No RFPs found.");
    } else {
        println!("RFPs:\n");
        for rfp in rfps {
            let due = rfp.due_date.map(|d| format!(" due:{}", d)).unwrap_or_default();
            println!("  {} [{}]{} {}", rfp.id, rfp.status, due, rfp.title);
        }
    }

    Ok(())
}

pub fn handle_rfp_get(id: String, json: bool) -> Result<()> {
    let project = Project::open()?;
    let rfp = project
        .run(project.service.get_rfp(&id))?
        .ok_or_else(|| rfp_not_found(&id))?;

    if json {
        print_json(&rfp)?;
    } else {
        print_rfp(&rfp);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_rfp_update(
    id: String,
    title: Option<String>,
    status: Option<String>,
    scope: Option<String>,
    clear_scope: bool,
    due: Option<String>,
    clear_due: bool,
    opportunity: Option<String>,
    clear_opportunity: bool,
    path: Option<String>,
    competitors: Vec<String>,
    json: bool,
) -> Result<()> {
    let project = Project::open()?;

    let scope_summary = if clear_scope {
        Some(None)
    } else {
        scope.map(Some)
    };
    let due_date = if clear_due {
        Some(None)
    } else {
        due.as_deref().map(parse_date).transpose()?.map(Some)
    };
    let opportunity_id = if clear_opportunity {
        Some(None)
    } else {
        opportunity.map(Some)
    };
    let update = RfpUpdate {
        title,
        status: status.as_deref().map(parse_arg::<RfpStatus>).transpose()?,
        scope_summary,
        due_date,
        opportunity_id,
        selected_path: path.as_deref().map(parse_arg::<SelectedPath>).transpose()?,
        competitors: if competitors.is_empty() {
            None
        } else {
            Some(competitors)
        },
        ..Default::default()
    };

    let rfp = project
        .run(project.service.update_rfp(&id, update))?
        .ok_or_else(|| rfp_not_found(&id))?;
    project.save()?;

    if json {
        print_json(&rfp)?;
    } else {
        println!("Updated RFP {} - {}", rfp.id, rfp.title);
    }

    Ok(())
}

pub fn handle_rfp_delete(id: String, force: bool) -> Result<()> {
    let project = Project::open()?;
    let rfp = project
        .run(project.service.get_rfp(&id))?
        .ok_or_else(|| rfp_not_found(&id))?;

    if !force {
        eprintln!("Delete RFP {} - {} and all its sections? [y/N] ", rfp.id, rfp.title);

        if io::stdin().is_terminal() {
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        } else {
            return Err(RfpError::InvalidInput(
                "Use --force to delete in non-interactive mode".to_string(),
            ));
        }
    }

    // a partial delete removed children; persist that before reporting it
    let result = project.run(project.service.delete_rfp(&id));
    project.save()?;
    if !result? {
        return Err(rfp_not_found(&id));
    }

    println!("Deleted RFP {} - {}", rfp.id, rfp.title);
    Ok(())
}

pub fn handle_rfp_outcome(
    id: String,
    pricing_total: Option<f64>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let project = Project::open()?;
    let rfp = project
        .run(project.service.record_outcome(&id, pricing_total, notes))?
        .ok_or_else(|| rfp_not_found(&id))?;
    project.save()?;

    if json {
        print_json(&rfp)?;
    } else {
        println!("Recorded {} outcome for RFP {} - {}", rfp.status, rfp.id, rfp.title);
    }

    Ok(())
}

pub fn handle_sections(rfp_id: String, json: bool) -> Result<()> {
    let project = Project::open()?;
    if project.run(project.service.get_rfp(&rfp_id))?.is_none() {
        return Err(rfp_not_found(&rfp_id));
    }
    let sections = project.run(project.service.get_sections(&rfp_id))?;

    if json {
        print_json(&sections)?;
    } else {
        println!("Sections:\n");
        for s in sections {
            let stale = if s.is_stale { " stale" } else { "" };
            println!("  {} [{}{}] {}", s.id, s.status, stale, s.title);
            if let Some(ref reason) = s.stale_reason {
                println!("      {}", reason);
            }
        }
    }

    Ok(())
}

pub fn handle_section_update(
    id: String,
    title: Option<String>,
    notes: Option<String>,
    stdin: bool,
    json: bool,
) -> Result<()> {
    let project = Project::open()?;

    let mut update = SectionUpdate {
        title,
        review_notes: notes.map(Some),
        ..Default::default()
    };
    if stdin {
        if let Some(content) = read_stdin()? {
            update.content_working = Some(Some(content));
            update.source_type = Some(Some(SourceType::Manual));
            update.status = Some(SectionStatus::Drafted);
        }
    }
    if update.is_empty() {
        return Err(RfpError::InvalidInput("Nothing to update".to_string()));
    }

    let section = project
        .run(project.service.update_section(&id, update))?
        .ok_or_else(|| section_not_found(&id))?;
    project.save()?;

    if json {
        print_json(&section)?;
    } else {
        println!("Updated section {} ({})", section.title, section.id);
    }

    Ok(())
}

/// Stamp generated content with a fingerprint of the RFP as it is now.
async fn generate_section(
    service: &RfpService<LoroStore>,
    id: &str,
    content: String,
    strategy_version: Option<String>,
) -> Result<RfpSection> {
    let section = service
        .get_section(id)
        .await?
        .ok_or_else(|| section_not_found(id))?;
    let rfp = service
        .get_rfp(&section.rfp_id)
        .await?
        .ok_or_else(|| rfp_not_found(&section.rfp_id))?;
    let bindings = service
        .get_bindings(&rfp.id)
        .await?
        .unwrap_or_else(|| RfpBindings::empty(&rfp.id, rfp.created_at));

    let provenance = GenerationProvenance::capture(&rfp, &bindings, strategy_version);
    service
        .record_generation(id, content, provenance, SourceType::Generated)
        .await?
        .ok_or_else(|| section_not_found(id))
}

pub fn handle_section_generate(
    id: String,
    content: Option<String>,
    stdin: bool,
    strategy_version: Option<String>,
    json: bool,
) -> Result<()> {
    let content = match content {
        Some(content) => content,
        None if stdin => read_stdin()?.ok_or_else(|| {
            RfpError::InvalidInput("No content on stdin".to_string())
        })?,
        None => {
            return Err(RfpError::InvalidInput(
                "Provide --content or --stdin".to_string(),
            ))
        }
    };

    let project = Project::open()?;
    let section = project.run(generate_section(
        &project.service,
        &id,
        content,
        strategy_version,
    ))?;
    project.save()?;

    if json {
        print_json(&section)?;
    } else {
        println!("Recorded generation for {} ({})", section.title, section.id);
    }

    Ok(())
}

pub fn handle_section_approve(id: String, json: bool) -> Result<()> {
    let project = Project::open()?;
    let section = project
        .run(project.service.approve_section(&id))?
        .ok_or_else(|| section_not_found(&id))?;
    project.save()?;

    if json {
        print_json(&section)?;
    } else {
        print_section(&section);
    }

    Ok(())
}

pub fn handle_bindings_show(rfp_id: String, json: bool) -> Result<()> {
    let project = Project::open()?;
    let bindings = project
        .run(project.service.get_bindings(&rfp_id))?
        .ok_or_else(|| RfpError::NotFound(format!("bindings for rfp {}", rfp_id)))?;

    if json {
        print_json(&bindings)?;
    } else {
        print_bindings(&bindings);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_bindings_set(
    rfp_id: String,
    team_members: Option<Vec<String>>,
    case_studies: Option<Vec<String>>,
    references: Option<Vec<String>>,
    pricing_template: Option<String>,
    clear_pricing_template: bool,
    plan_template: Option<String>,
    clear_plan_template: bool,
    json: bool,
) -> Result<()> {
    let project = Project::open()?;

    let template = |id: Option<String>, clear: bool| if clear { Some(None) } else { id.map(Some) };
    let update = BindingsUpdate {
        team_member_ids: team_members,
        case_study_ids: case_studies,
        reference_ids: references,
        pricing_template_id: template(pricing_template, clear_pricing_template),
        plan_template_id: template(plan_template, clear_plan_template),
    };

    let bindings = project
        .run(project.service.update_bindings(&rfp_id, update))?
        .ok_or_else(|| RfpError::NotFound(format!("bindings for rfp {}", rfp_id)))?;
    project.save()?;

    if json {
        print_json(&bindings)?;
    } else {
        print_bindings(&bindings);
    }

    Ok(())
}

fn load_deps(path: Option<&Path>) -> Result<DependencyTimestamps> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(DependencyTimestamps::default()),
    }
}

pub fn handle_stale(rfp_id: String, deps: Option<PathBuf>, json: bool) -> Result<()> {
    let deps = load_deps(deps.as_deref())?;

    let project = Project::open()?;
    let results = project
        .run(project.service.refresh_staleness(&rfp_id, &deps))?
        .ok_or_else(|| rfp_not_found(&rfp_id))?;
    project.save()?;

    if json {
        print_json(&results)?;
    } else {
        let stale: Vec<_> = results.iter().filter(|r| r.verdict.is_stale).collect();
        if stale.is_empty() {
            println!("All sections are up to date.");
        } else {
            println!("Stale sections:\n");
            for r in stale {
                println!(
                    "  {} {}: {}",
                    r.section_id,
                    r.section_key.default_title(),
                    r.verdict.stale_reason.as_deref().unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

pub fn handle_outcomes(range: String, json: bool) -> Result<()> {
    let range: OutcomeRange = parse_arg(&range)?;

    let project = Project::open()?;
    let outcomes = project.run(project.service.list_firm_outcomes(range));

    if json {
        print_json(&outcomes)?;
    } else if outcomes.is_empty() {
        match range {
            OutcomeRange::All => println!("No outcomes recorded."),
            _ => println!("No outcomes in the last {}.", range),
        }
    } else {
        println!("Outcomes ({}):\n", range);
        for o in outcomes {
            let price = o
                .submission_snapshot
                .pricing_total
                .map(|p| format!(" ${:.0}", p))
                .unwrap_or_default();
            println!(
                "  {} [{}]{} {} approved sections",
                o.id,
                o.status,
                price,
                o.submission_snapshot.section_keys.len()
            );
        }
    }

    Ok(())
}
