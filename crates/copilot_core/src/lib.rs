pub mod domain;
pub mod grouping;
pub mod ports;

pub use domain::{
    BackupReport, Category, CompletionMarker, CourseSummary, DebugSnapshot, FileEntry,
    GeneratedFile, RestoreReport, ScriptOutcome, TextPreview, UserConfig,
};
pub use ports::{ContentStore, GenerationService, PortError, PortResult};
