use clap::Parser;
use rfpdesk::cli::{
    handle_bindings_set, handle_bindings_show, handle_init, handle_outcomes, handle_rfp_create,
    handle_rfp_delete, handle_rfp_get, handle_rfp_list, handle_rfp_outcome, handle_rfp_update,
    handle_section_approve, handle_section_generate, handle_section_update, handle_sections,
    handle_stale, BindingsAction, Cli, Commands, RfpAction, SectionAction,
};
use rfpdesk::config::LOG_ENV;
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries command output, logs go to stderr
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Rfp(rfp) => match rfp.action {
            RfpAction::Create {
                title,
                company,
                scope,
                due,
                opportunity,
                path,
                competitors,
                json,
            } => handle_rfp_create(
                title,
                company,
                scope,
                due,
                opportunity,
                path,
                competitors,
                json,
            ),
            RfpAction::List { company, json } => handle_rfp_list(company, json),
            RfpAction::Get { id, json } => handle_rfp_get(id, json),
            RfpAction::Update {
                id,
                title,
                status,
                scope,
                clear_scope,
                due,
                clear_due,
                opportunity,
                clear_opportunity,
                path,
                competitors,
                json,
            } => handle_rfp_update(
                id,
                title,
                status,
                scope,
                clear_scope,
                due,
                clear_due,
                opportunity,
                clear_opportunity,
                path,
                competitors,
                json,
            ),
            RfpAction::Delete { id, force } => handle_rfp_delete(id, force),
            RfpAction::Outcome {
                id,
                pricing_total,
                notes,
                json,
            } => handle_rfp_outcome(id, pricing_total, notes, json),
        },
        Commands::Sections { rfp_id, json } => handle_sections(rfp_id, json),
        Commands::Section(section) => match section.action {
            SectionAction::Update {
                id,
                title,
                notes,
                stdin,
                json,
            } => handle_section_update(id, title, notes, stdin, json),
            SectionAction::Generate {
                id,
                content,
                stdin,
                strategy_version,
                json,
            } => handle_section_generate(id, content, stdin, strategy_version, json),
            SectionAction::Approve { id, json } => handle_section_approve(id, json),
        },
        Commands::Bindings(bindings) => match bindings.action {
            BindingsAction::Show { rfp_id, json } => handle_bindings_show(rfp_id, json),
            BindingsAction::Set {
                rfp_id,
                team_members,
                case_studies,
                references,
                pricing_template,
                clear_pricing_template,
                plan_template,
                clear_plan_template,
                json,
            } => handle_bindings_set(
                rfp_id,
                team_members,
                case_studies,
                references,
                pricing_template,
                clear_pricing_template,
                plan_template,
                clear_plan_template,
                json,
            ),
        },
        Commands::Stale { rfp_id, deps, json } => handle_stale(rfp_id, deps, json),
        Commands::Outcomes { range, json } => handle_outcomes(range, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
