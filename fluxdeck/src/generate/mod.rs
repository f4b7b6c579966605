//! Driving the external image generator.
//!
//! One child process per variation, run sequentially. After each image the
//! run record, the session summary and the galleries are rewritten, so an
//! interrupted run leaves every finished image recorded on disk.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;

use crate::error::FluxError;
use crate::gallery;
use crate::models::{ImageResult, RunRecord};
use crate::process::{spawn_process_with, ProcessOptions, ProcessOutput};
use crate::session::{RunHandle, Session};
use crate::settings::EffectiveSettings;

const RANDOM_SEED_MAX: u64 = 1_000_000;

/// Seed for the 0-based variation `index`.
///
/// Step variation keeps one seed so only the step count differs; an explicit
/// seed counts up from the base; otherwise every image gets a fresh seed.
pub fn variation_seed<R: Rng>(settings: &EffectiveSettings, index: u32, rng: &mut R) -> u64 {
    match settings.seed_base {
        Some(base) if settings.steps.is_sequence() => base,
        Some(base) => base.saturating_add(u64::from(index)),
        None => rng.random_range(1..=RANDOM_SEED_MAX),
    }
}

/// Image file name inside the run directory.
pub fn output_file_name(seed: u64, step_variation: Option<u32>) -> String {
    match step_variation {
        Some(steps) => format!("image_{seed}_steps_{steps}.png"),
        None => format!("image_{seed}.png"),
    }
}

/// Wraps the generation executable.
#[derive(Debug, Clone)]
pub struct Generator {
    program: String,
    leading_args: Vec<String>,
}

impl Generator {
    /// `command` may carry leading arguments, e.g. `uv run mflux-generate`.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            leading_args: parts.collect(),
        }
    }

    /// Invocation for one image.
    pub fn command(
        &self,
        settings: &EffectiveSettings,
        seed: u64,
        steps: u32,
        output: &Path,
    ) -> ProcessOptions {
        let mut opts = ProcessOptions::new(&self.program)
            .args(self.leading_args.iter().cloned())
            .args([
                "--prompt".to_string(),
                settings.prompt.clone(),
                "--model".to_string(),
                settings.model.generator_id().to_string(),
                "--steps".to_string(),
                steps.to_string(),
                "--seed".to_string(),
                seed.to_string(),
                "--width".to_string(),
                settings.resolution.width.to_string(),
                "--height".to_string(),
                settings.resolution.height.to_string(),
                "--output".to_string(),
                output.display().to_string(),
            ]);
        if settings.metadata {
            opts = opts.arg("--metadata");
        }
        opts
    }

    /// Allocate a run in `session` and generate every variation into it.
    ///
    /// The first failing variation aborts the rest; results collected so far
    /// stay in the record, which is left `in_progress`.
    pub async fn generate(
        &self,
        session: &Session,
        settings: &EffectiveSettings,
    ) -> Result<(RunHandle, RunRecord)> {
        let run = session.allocate_run()?;
        let mut record = run.initialize(settings.to_record(Utc::now()))?;
        refresh_outputs(session, &run, &record)?;

        println!(
            "Run {} in {}: {} variation(s) at {}",
            run.id(),
            session.root().display(),
            settings.variation_count,
            settings.resolution
        );

        for index in 0..settings.variation_count {
            let seed = variation_seed(settings, index, &mut rand::rng());
            let result = self.generate_one(&run, settings, index, seed).await?;
            record = run.append(result)?;
            refresh_outputs(session, &run, &record)?;
        }

        tracing::info!(run = run.id(), status = %record.status, "run finished");
        Ok((run, record))
    }

    async fn generate_one(
        &self,
        run: &RunHandle,
        settings: &EffectiveSettings,
        index: u32,
        seed: u64,
    ) -> Result<ImageResult> {
        let position = index + 1;
        let steps = settings
            .steps
            .for_variation(index as usize)
            .with_context(|| format!("No step count for variation {position}"))?;
        let file = output_file_name(seed, settings.steps.is_sequence().then_some(steps));
        let output = run.dir().join(&file);

        println!(
            "\nGenerating variation {position}/{} with seed {seed} and {steps} step(s)...",
            settings.variation_count
        );

        let opts = self.command(settings, seed, steps, &output);
        let started = Instant::now();
        let result = spawn_process_with(opts, |line| {
            if let ProcessOutput::Stdout(line) = line {
                let line = line.trim();
                if !line.is_empty() {
                    println!("  {line}");
                }
            }
        })
        .await
        .with_context(|| {
            format!("Failed to run generator '{}' for variation {position}", self.program)
        })?;
        let generation_time = started.elapsed().as_secs_f64();

        if !result.success() {
            // Some generators report errors on stdout only.
            let stderr = if result.stderr.is_empty() {
                result.stdout.last().cloned().unwrap_or_default()
            } else {
                result.stderr_string()
            };
            return Err(FluxError::GenerationFailed {
                index: position,
                code: result.code(),
                stderr,
            }
            .into());
        }

        println!("  Generated in {generation_time:.2} seconds");

        Ok(ImageResult {
            index: position,
            seed,
            steps,
            metadata_file: settings.metadata.then(|| format!("{file}.json")),
            file,
            generation_time,
        })
    }
}

/// Rewrite `session.json` and the galleries. Gallery failures only warn.
fn refresh_outputs(session: &Session, run: &RunHandle, record: &RunRecord) -> Result<()> {
    session.write_summary()?;

    if let Err(e) = gallery::render_run(run.dir(), run.id(), record) {
        tracing::warn!(run = run.id(), error = %e, "failed to render run gallery");
    }
    if let Err(e) = gallery::render_session(session) {
        tracing::warn!(session = %session.name(), error = %e, "failed to render session gallery");
    }
    Ok(())
}
