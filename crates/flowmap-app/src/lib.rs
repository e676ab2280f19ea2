pub mod loader;
pub mod session;
pub mod settings;

pub use loader::{FileSource, GraphSource, LoadError, StaticSource, parse_graph};
pub use session::{FlowmapSession, LoadOutcome, SessionError};
pub use settings::{FlowmapSettings, SettingsError};
