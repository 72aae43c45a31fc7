use std::path::Path;
use std::process::ExitCode;

use pdf_workbench::config::job::JobFile;
use pdf_workbench::config::merged::MergedConfig;
use pdf_workbench::config::{self};
use pdf_workbench::pipeline::job_runner::{JobConfig, run_all_jobs};
use pdf_workbench::render::{PageRenderer, UnavailableRenderer};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "pdfium")]
fn make_renderer() -> Box<dyn PageRenderer> {
    match pdf_workbench::render::PdfiumRenderer::new() {
        Ok(renderer) => Box::new(renderer),
        Err(e) => {
            tracing::warn!(error = %e, "pdfium unavailable; color-filtered pages cannot be exported");
            Box::new(UnavailableRenderer)
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn make_renderer() -> Box<dyn PageRenderer> {
    Box::new(UnavailableRenderer)
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdf_workbench <job.yaml>...");
        eprintln!("  Assemble, edit and export PDF pages according to job files.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_workbench {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    init_logging();

    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Relative paths in a job file are relative to the job file.
        let job_dir = job_file_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        for job in job_file.jobs {
            let merged = match MergedConfig::new(&settings, &job) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("ERROR: {job_file_arg}: {e}");
                    return ExitCode::FAILURE;
                }
            };
            job_configs.push(JobConfig {
                job,
                base_dir: job_dir.clone(),
                merged,
            });
        }
    }

    let renderer = make_renderer();
    let results = run_all_jobs(&job_configs, renderer.as_ref());

    let mut has_error = false;
    for (config, result) in job_configs.iter().zip(&results) {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} ({} pages, {})",
                    job_result.output_path.display(),
                    job_result.pages,
                    job_result.mode.as_str()
                );
                if job_result.embed_failures > 0 {
                    eprintln!(
                        "WARNING: {} page element(s) could not be embedded",
                        job_result.embed_failures
                    );
                }
            }
            Err(e) => {
                eprintln!("ERROR: {}: {e}", config.output_path().display());
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
