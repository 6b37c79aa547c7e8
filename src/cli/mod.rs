mod commands;
mod handlers;

pub use commands::{
    BindingsAction, BindingsCommand, Cli, Commands, RfpAction, RfpCommand, SectionAction,
    SectionCommand,
};
pub use handlers::{
    handle_bindings_set, handle_bindings_show, handle_init, handle_outcomes, handle_rfp_create,
    handle_rfp_delete, handle_rfp_get, handle_rfp_list, handle_rfp_outcome, handle_rfp_update,
    handle_section_approve, handle_section_generate, handle_section_update, handle_sections,
    handle_stale,
};
