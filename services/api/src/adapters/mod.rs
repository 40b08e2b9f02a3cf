pub mod content_store;
pub mod script;

pub use content_store::FsContentStore;
pub use script::ScriptRunner;
