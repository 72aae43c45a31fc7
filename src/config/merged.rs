use super::job::Job;
use super::settings::Settings;

/// Settings with the job's overrides applied.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: Settings,
}

impl MergedConfig {
    /// Uses the job's value where it has `Some`, the settings value otherwise.
    pub fn new(settings: &Settings, job: &Job) -> crate::error::Result<Self> {
        let merged = Settings {
            raster_scale: job.raster_scale.unwrap_or(settings.raster_scale),
            raster_quality: job.raster_quality.unwrap_or(settings.raster_quality),
            compress_streams: job.compress_streams.unwrap_or(settings.compress_streams),
            archive_compression: job
                .archive_compression
                .unwrap_or(settings.archive_compression),
            ..settings.clone()
        };
        merged.validate()?;
        Ok(MergedConfig { settings: merged })
    }
}
