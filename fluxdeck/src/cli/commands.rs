//! CLI command execution.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime, Utc};

use crate::brainstorm::Brainstormer;
use crate::config::Config;
use crate::error::FluxError;
use crate::gallery;
use crate::generate::Generator;
use crate::models::{BrainstormResults, RunRecord, Steps};
use crate::server;
use crate::session::{Session, SessionStore};
use crate::settings::{self, EffectiveSettings, PartialSettings, StyleChoice};
use crate::styles::StyleStore;

use super::args::{Cli, Commands};

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Collect the explicitly given generation settings.
fn partial_settings(cli: &Cli) -> Result<PartialSettings, FluxError> {
    let vary_steps = match cli.vary_steps.as_deref() {
        Some(raw) => match Steps::parse_sequence(raw)? {
            Steps::Sequence(seq) => Some(seq),
            Steps::Single(steps) => Some(vec![steps]),
        },
        None => None,
    };

    Ok(PartialSettings {
        prompt: cli.prompt.clone(),
        model: cli.model,
        resolution: cli.requested_resolution(),
        variation_count: cli.variations,
        steps: cli.steps,
        vary_steps,
        seed: cli.seed,
        style: StyleChoice::from_arg(cli.style.as_deref()),
        metadata: cli.metadata,
    })
}

/// Execute the parsed CLI.
pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    let styles = StyleStore::new(&config.styles_file);
    let sessions = SessionStore::new(&config.output_dir, config.session_timeout);

    if let Some(args) = &cli.save_style {
        let [name, description] = args.as_slice() else {
            bail!("--save-style takes a name and a description");
        };
        return save_style(&styles, name, description);
    }
    if cli.list_styles {
        list_styles(&styles);
        return Ok(());
    }
    if let Some(name) = &cli.delete_style {
        return delete_style(&styles, name);
    }

    match &cli.command {
        Some(Commands::List) => {
            list_sessions(&sessions);
            Ok(())
        }
        Some(Commands::Gallery { session, open }) => {
            let session = pick_session(&sessions, session.as_deref())?;
            let index = gallery::render_all(&session)?;
            println!("Gallery written to {}", index.display());
            if *open {
                open_in_browser(&index);
            }
            Ok(())
        }
        Some(Commands::Serve { port, open, session }) => {
            let session = pick_session(&sessions, session.as_deref())?;
            if let Err(e) = gallery::render_all(&session) {
                tracing::warn!(error = %e, "failed to refresh gallery before serving");
            }
            server::start_server(session, *port, *open).await
        }
        Some(Commands::Brainstorm { concept, count }) => {
            brainstorm(&cli, &config, &sessions, concept, *count).await
        }
        Some(Commands::RunPrompts { indices }) => {
            run_prompts(&cli, &config, &sessions, &styles, indices).await
        }
        None => generate(&cli, &config, &sessions, &styles).await,
    }
}

// === Styles ===

fn save_style(styles: &StyleStore, name: &str, description: &str) -> Result<()> {
    styles.save(name, description)?;
    println!("Style '{}' saved to {}: {description}", name.trim(), styles.path().display());
    Ok(())
}

fn list_styles(styles: &StyleStore) {
    let all = styles.list();
    if all.is_empty() {
        println!("No styles saved. Use --save-style NAME DESCRIPTION to add one.");
        return;
    }

    println!("Available styles:");
    for style in all {
        println!("  {}: {}", style.name, style.description);
    }
}

fn delete_style(styles: &StyleStore, name: &str) -> Result<()> {
    if styles.delete(name)? {
        println!("Style '{}' deleted.", name.trim());
        Ok(())
    } else {
        Err(FluxError::UnknownStyle(name.trim().to_string()).into())
    }
}

// === Generation ===

async fn generate(
    cli: &Cli,
    config: &Config,
    sessions: &SessionStore,
    styles: &StyleStore,
) -> Result<()> {
    let session = sessions.resolve(cli.force_new_session, now());
    let previous = session.latest_record();

    // Everything that can reject the request happens before the session
    // directory is created.
    let explicit = partial_settings(cli)?;
    let settings = settings::resolve(&explicit, previous.as_ref().map(|(_, r)| r), styles)?;

    announce_session(&session);
    if let Some((id, prev)) = &previous {
        describe_inherited(*id, prev, cli, &settings);
    }

    let index = run_generation(config, &session, &settings).await?;
    if cli.open {
        open_in_browser(&index);
    }
    Ok(())
}

fn announce_session(session: &Session) {
    if session.exists() {
        println!("Continuing session {}", session.name());
    } else {
        println!("Starting new session {}", session.name());
    }
}

/// Generate one run and report it. Returns the run gallery path.
async fn run_generation(
    config: &Config,
    session: &Session,
    settings: &EffectiveSettings,
) -> Result<PathBuf> {
    let generator = Generator::new(&config.generator);
    let (run, record) = generator.generate(session, settings).await?;

    println!(
        "\nRun {} complete: {}/{} images in {:.2} seconds",
        run.id(),
        record.results.len(),
        record.variation_count,
        record.total_generation_time()
    );
    let index = run.dir().join("index.html");
    println!("Gallery: {}", index.display());
    Ok(index)
}

// === Brainstorming ===

async fn brainstorm(
    cli: &Cli,
    config: &Config,
    sessions: &SessionStore,
    concept: &str,
    count: u32,
) -> Result<()> {
    let concept = concept.trim();
    if concept.is_empty() {
        return Err(FluxError::EmptyConcept.into());
    }
    let session = sessions.resolve(cli.force_new_session, now());

    println!("Brainstorming {count} prompt(s) for '{concept}'...");
    let brainstormer = Brainstormer::new(&config.llm, config.llm_model.clone());
    let prompts = brainstormer.brainstorm(concept, count).await?;
    if prompts.is_empty() {
        bail!("'{}' returned no prompts", config.llm);
    }

    let results = BrainstormResults::new(concept, prompts, Utc::now());
    session.write_brainstorm(&results)?;

    println!("{}", results.format());
    println!("Saved to {}", session.brainstorm_path().display());
    println!("Generate some with: fluxdeck run-prompts 1,2");
    Ok(())
}

/// Generate a run for each chosen prompt of the session's last brainstorm.
///
/// Every prompt is resolved before the first image so a bad flag fails
/// without writing anything.
async fn run_prompts(
    cli: &Cli,
    config: &Config,
    sessions: &SessionStore,
    styles: &StyleStore,
    indices: &str,
) -> Result<()> {
    let session = sessions.resolve(false, now());
    let results = session
        .brainstorm()
        .ok_or_else(|| FluxError::NoBrainstormResults(session.name()))?;
    let selected = results.select(indices)?;

    let shared = partial_settings(cli)?;
    let previous = session.latest_record();
    let planned = selected
        .into_iter()
        .map(|(number, prompt)| {
            let explicit = PartialSettings {
                prompt: Some(prompt),
                variation_count: shared.variation_count.or(Some(1)),
                ..shared.clone()
            };
            settings::resolve(&explicit, previous.as_ref().map(|(_, r)| r), styles)
                .map(|settings| (number, settings))
        })
        .collect::<Result<Vec<_>, _>>()?;

    announce_session(&session);
    for (number, settings) in &planned {
        println!("\nGenerating prompt {number}: {}", settings.base_prompt);
        run_generation(config, &session, settings).await?;
    }

    let index = session.root().join("index.html");
    println!("\nSession gallery: {}", index.display());
    if cli.open {
        open_in_browser(&index);
    }
    Ok(())
}

/// Tell the user which values came from the previous run.
fn describe_inherited(id: u32, prev: &RunRecord, cli: &Cli, settings: &EffectiveSettings) {
    if cli.prompt.is_none() {
        println!("Using prompt from run {id}: {}", settings.prompt);
    }
    if cli.requested_resolution().is_none() && settings.resolution == prev.resolution {
        println!("Using resolution from run {id}: {}", settings.resolution);
    }
    if cli.variations.is_none() && cli.vary_steps.is_none() {
        println!("Using variation count from run {id}: {}", settings.variation_count);
    }
}

fn open_in_browser(path: &Path) {
    if let Err(e) = open::that(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to open browser");
        println!("Could not open {} in a browser: {e}", path.display());
    }
}

// === Sessions ===

/// An explicit session directory (absolute, relative, or a name under the
/// output directory), else the current session.
fn pick_session(sessions: &SessionStore, explicit: Option<&Path>) -> Result<Session> {
    if let Some(path) = explicit {
        return Session::open(path)
            .or_else(|| Session::open(sessions.base().join(path)))
            .with_context(|| format!("{} is not a session directory", path.display()));
    }

    match sessions.current(now()) {
        Some(session) => Ok(session),
        None => bail!("No sessions found in {}", sessions.base().display()),
    }
}

fn list_sessions(sessions: &SessionStore) {
    let all = sessions.sessions();
    if all.is_empty() {
        println!("No sessions found in {}", sessions.base().display());
        return;
    }

    let current = sessions.find_reusable(now()).map(|s| s.name());
    for session in all.iter().rev() {
        let marker = if current.as_deref() == Some(session.name().as_str()) {
            " (current)"
        } else {
            ""
        };
        println!("{}{marker}", session.name());

        let records = session.records();
        if records.is_empty() {
            println!("  (no runs)\n");
            continue;
        }

        println!(
            "  {:<5} {:<12} {:<8} {:<9} {:<10} PROMPT",
            "RUN", "STATUS", "IMAGES", "TIME", "SIZE"
        );
        for (id, record) in records {
            let images = format!("{}/{}", record.results.len(), record.variation_count);
            let time = format!("{:.1}s", record.total_generation_time());
            println!(
                "  {:<5} {:<12} {:<8} {:<9} {:<10} {}",
                id,
                record.status.as_str(),
                images,
                time,
                record.resolution.to_string(),
                truncate(&record.prompt, 60)
            );
        }
        println!();
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
