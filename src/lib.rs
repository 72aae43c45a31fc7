pub mod assemble;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod model;
pub mod pdf;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod transform;
pub mod workspace;

pub use assemble::{ExportOutput, ExportReport, Progress};
pub use error::{Result, WorkbenchError};
pub use workspace::{ExportMode, Workspace};
