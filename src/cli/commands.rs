use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "rfpdesk")]
#[command(version, about = "Track RFP proposal sections and know when they go stale")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new rfpdesk project in the current directory
    Init,

    /// Create, inspect and change RFPs
    Rfp(RfpCommand),

    /// List the sections of an RFP in display order
    Sections {
        /// RFP ID
        rfp_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Work on a single section
    Section(SectionCommand),

    /// Show or change the artifacts an RFP is bound to
    Bindings(BindingsCommand),

    /// Recompute staleness for every section of an RFP
    Stale {
        /// RFP ID
        rfp_id: String,

        /// JSON file with the current updated_at of bound artifacts
        #[arg(long)]
        deps: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List won and lost RFPs with their submission snapshots
    Outcomes {
        /// How far back to look (90d, 180d, 365d, all)
        #[arg(long, default_value = "365d")]
        range: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct RfpCommand {
    #[command(subcommand)]
    pub action: RfpAction,
}

#[derive(Subcommand, Debug)]
pub enum RfpAction {
    /// Create an RFP with its seven empty sections
    Create {
        /// RFP title
        title: String,

        /// Owning company ID
        #[arg(long)]
        company: String,

        /// Scope summary
        #[arg(long)]
        scope: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Linked opportunity ID
        #[arg(long)]
        opportunity: Option<String>,

        /// Delivery path (project, retainer)
        #[arg(long)]
        path: Option<String>,

        /// Competitors (can be specified multiple times)
        #[arg(long = "competitor")]
        competitors: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a company's RFPs, newest first
    List {
        /// Company ID
        #[arg(long)]
        company: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get a single RFP by ID
    Get {
        /// RFP ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update an RFP
    Update {
        /// RFP ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New status (intake, in_progress, submitted, won, lost)
        #[arg(long)]
        status: Option<String>,

        /// New scope summary
        #[arg(long, conflicts_with = "clear_scope")]
        scope: Option<String>,

        /// Remove the scope summary
        #[arg(long)]
        clear_scope: bool,

        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// New linked opportunity ID
        #[arg(long, conflicts_with = "clear_opportunity")]
        opportunity: Option<String>,

        /// Unlink the opportunity
        #[arg(long)]
        clear_opportunity: bool,

        /// New delivery path (project, retainer)
        #[arg(long)]
        path: Option<String>,

        /// Replace competitors (can be specified multiple times)
        #[arg(long = "competitor")]
        competitors: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an RFP with its sections and bindings
    Delete {
        /// RFP ID
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Record the submission snapshot of a won or lost RFP
    Outcome {
        /// RFP ID
        id: String,

        /// Total price submitted
        #[arg(long)]
        pricing_total: Option<f64>,

        /// Outcome notes
        #[arg(long)]
        notes: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct SectionCommand {
    #[command(subcommand)]
    pub action: SectionAction,
}

#[derive(Subcommand, Debug)]
pub enum SectionAction {
    /// Edit a section by hand
    Update {
        /// Section ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// Review notes
        #[arg(long)]
        notes: Option<String>,

        /// Read working content from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record generated content for a section
    Generate {
        /// Section ID
        id: String,

        /// Generated content
        #[arg(long, conflicts_with = "stdin")]
        content: Option<String>,

        /// Read generated content from stdin
        #[arg(long)]
        stdin: bool,

        /// Version of the win strategy the content was generated from
        #[arg(long)]
        strategy_version: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Approve the working content of a section
    Approve {
        /// Section ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct BindingsCommand {
    #[command(subcommand)]
    pub action: BindingsAction,
}

#[derive(Subcommand, Debug)]
pub enum BindingsAction {
    /// Show an RFP's bindings
    Show {
        /// RFP ID
        rfp_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an RFP's bindings. Lists given here replace the stored ones.
    Set {
        /// RFP ID
        rfp_id: String,

        /// Team member IDs (can be specified multiple times)
        #[arg(long = "team-member")]
        team_members: Option<Vec<String>>,

        /// Case study IDs (can be specified multiple times)
        #[arg(long = "case-study")]
        case_studies: Option<Vec<String>>,

        /// Reference IDs (can be specified multiple times)
        #[arg(long = "reference")]
        references: Option<Vec<String>>,

        /// Pricing template ID
        #[arg(long, conflicts_with = "clear_pricing_template")]
        pricing_template: Option<String>,

        /// Unbind the pricing template
        #[arg(long)]
        clear_pricing_template: bool,

        /// Plan template ID
        #[arg(long, conflicts_with = "clear_plan_template")]
        plan_template: Option<String>,

        /// Unbind the plan template
        #[arg(long)]
        clear_plan_template: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
