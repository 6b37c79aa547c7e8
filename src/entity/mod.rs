mod bindings;
pub mod record;
mod rfp;
mod section;

pub use bindings::{BindingsUpdate, RfpBindings, RfpBindingsSnapshot};
pub use rfp::{
    CreateRfpInput, ParsedRequirements, Rfp, RfpStatus, RfpUpdate, SelectedPath,
    SubmissionSnapshot, WinStrategy,
};
pub use section::{
    BoundArtifactIds, GenerationProvenance, RfpSection, SectionKey, SectionStatus,
    SectionUpdate, SourceType, SECTION_ORDER,
};
