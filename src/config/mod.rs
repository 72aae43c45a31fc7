pub mod job;
pub mod merged;
pub mod settings;

pub use settings::Settings;
use std::path::Path;

/// Loads `settings.yaml` from the job file's directory.
///
/// Falls back to the defaults when the directory has no `settings.yaml`.
pub fn load_settings_for_job(job_file_path: &Path) -> crate::error::Result<Settings> {
    let dir = job_file_path
        .parent()
        .ok_or_else(|| crate::error::WorkbenchError::config("Cannot determine job file directory"))?;

    let settings_path = dir.join("settings.yaml");

    if settings_path.exists() {
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}
