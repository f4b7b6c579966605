//! Field-by-field merge of explicit CLI values over the previous run.
//!
//! Precedence per field is strict: an explicit value always wins, otherwise
//! the previous run's value is inherited, otherwise a fixed default applies.
//! Nothing is merged within a field.

use chrono::{DateTime, Utc};

use crate::error::FluxError;
use crate::models::{apply_description, Model, Resolution, RunRecord, RunStatus, Steps, NO_STYLE};
use crate::styles::StyleStore;

pub const DEFAULT_VARIATIONS: u32 = 4;

/// The `--style` argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StyleChoice {
    /// Not given: keep whatever style the previous run used.
    #[default]
    Inherit,
    /// `--style none`: drop any style.
    Clear,
    /// `--style NAME`.
    Named(String),
}

impl StyleChoice {
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            None | Some("") => Self::Inherit,
            Some(name) if name.eq_ignore_ascii_case(NO_STYLE) => Self::Clear,
            Some(name) => Self::Named(name.to_string()),
        }
    }
}

/// Values given explicitly on this invocation.
#[derive(Debug, Clone, Default)]
pub struct PartialSettings {
    pub prompt: Option<String>,
    pub model: Option<Model>,
    pub resolution: Option<Resolution>,
    pub variation_count: Option<u32>,
    pub steps: Option<u32>,
    /// `--vary-steps`: one step count per variation.
    pub vary_steps: Option<Vec<u32>>,
    pub seed: Option<u64>,
    pub style: StyleChoice,
    pub metadata: bool,
}

/// Fully resolved settings for a new run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    /// Prompt sent to the generator.
    pub prompt: String,
    /// Prompt without the style suffix.
    pub base_prompt: String,
    pub style_name: Option<String>,
    pub model: Model,
    pub resolution: Resolution,
    pub variation_count: u32,
    pub steps: Steps,
    pub seed_base: Option<u64>,
    pub metadata: bool,
}

impl EffectiveSettings {
    /// Initial record for a run using these settings.
    pub fn to_record(&self, created_at: DateTime<Utc>) -> RunRecord {
        let mut record = RunRecord {
            created_at,
            prompt: self.prompt.clone(),
            base_prompt: Some(self.base_prompt.clone()),
            model: self.model,
            steps: self.steps.clone(),
            resolution: self.resolution,
            variation_count: self.variation_count,
            seed_base: self.seed_base,
            style_name: self.style_name.clone(),
            metadata: self.metadata,
            results: Vec::new(),
            status: RunStatus::Pending,
        };
        record.status = record.derived_status();
        record
    }
}

/// Compute the settings for a new run.
///
/// Fails before anything is written when no prompt can be found, when
/// `--vary-steps` lacks a seed, when an explicitly named style is unknown, or
/// when an explicit seed cannot count up across every variation.
pub fn resolve(
    explicit: &PartialSettings,
    previous: Option<&RunRecord>,
    styles: &StyleStore,
) -> Result<EffectiveSettings, FluxError> {
    let vary_steps = match &explicit.vary_steps {
        Some(seq) if seq.is_empty() => return Err(FluxError::InvalidStepList(String::new())),
        Some(_) if explicit.seed.is_none() => return Err(FluxError::StepVariationRequiresSeed),
        Some(seq) => Some(seq.clone()),
        None => None,
    };

    let requested_style = match &explicit.style {
        StyleChoice::Named(name) => {
            let description = styles
                .get(name)
                .ok_or_else(|| FluxError::UnknownStyle(name.clone()))?;
            Some((name.clone(), description))
        }
        StyleChoice::Inherit | StyleChoice::Clear => None,
    };

    let explicit_prompt = explicit
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let (base_prompt, style) = match (explicit_prompt, previous) {
        (Some(prompt), _) => (prompt.to_string(), requested_style),
        (None, Some(prev)) => {
            let (base, recorded_style) = inherited_prompt(prev, styles);
            let style = match &explicit.style {
                StyleChoice::Named(_) => requested_style,
                StyleChoice::Clear => None,
                StyleChoice::Inherit => recorded_style.and_then(|name| current_style(styles, name)),
            };
            (base, style)
        }
        (None, None) => return Err(FluxError::NoPrompt),
    };

    let prompt = style
        .as_ref()
        .map_or_else(|| base_prompt.clone(), |(_, desc)| apply_description(&base_prompt, desc));

    let model = explicit.model.unwrap_or_default();

    let resolution = explicit
        .resolution
        .or_else(|| previous.map(|p| p.resolution))
        .unwrap_or_default();

    let (steps, variation_count) = if let Some(seq) = vary_steps {
        let count = u32::try_from(seq.len()).unwrap_or(u32::MAX);
        (Steps::Sequence(seq), count)
    } else {
        let count = explicit
            .variation_count
            .or_else(|| previous.map(|p| p.variation_count))
            .unwrap_or(DEFAULT_VARIATIONS);
        let steps = explicit.steps.unwrap_or_else(|| model.default_steps());
        (Steps::Single(steps), count)
    };

    // Explicit seeds count up once per variation; the last one must fit.
    if let (Some(seed), Steps::Single(_)) = (explicit.seed, &steps) {
        let last_offset = u64::from(variation_count.saturating_sub(1));
        if seed.checked_add(last_offset).is_none() {
            return Err(FluxError::SeedOutOfRange {
                seed,
                count: variation_count,
            });
        }
    }

    Ok(EffectiveSettings {
        prompt,
        base_prompt,
        style_name: style.map(|(name, _)| name),
        model,
        resolution,
        variation_count,
        steps,
        seed_base: explicit.seed,
        metadata: explicit.metadata,
    })
}

/// Base prompt and style name recorded by a previous run.
///
/// Records written before `base_prompt` existed only carry the full prompt;
/// for those the style is recovered by matching a known description suffix.
fn inherited_prompt(prev: &RunRecord, styles: &StyleStore) -> (String, Option<String>) {
    if let Some(base) = &prev.base_prompt {
        return (base.clone(), prev.style_name.clone());
    }

    styles
        .list()
        .into_iter()
        .filter(|style| !style.description.trim().is_empty())
        .find_map(|style| {
            let suffix = format!(", {}", style.description);
            prev.prompt
                .strip_suffix(&suffix)
                .map(|base| (base.to_string(), Some(style.name.clone())))
        })
        .unwrap_or_else(|| (prev.prompt.clone(), None))
}

/// Look a recorded style up again so edits made since that run apply.
fn current_style(styles: &StyleStore, name: String) -> Option<(String, String)> {
    if let Some(description) = styles.get(&name) {
        return Some((name, description));
    }
    tracing::warn!(
        style = %name,
        "style from previous run no longer exists, continuing without it"
    );
    println!("Warning: style '{name}' from the previous run no longer exists, continuing without it.");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Preset;
    use tempfile::TempDir;

    fn styles(dir: &TempDir) -> StyleStore {
        StyleStore::new(dir.path().join("styles.json"))
    }

    fn previous() -> RunRecord {
        RunRecord {
            created_at: Utc::now(),
            prompt: "a castle on a hill".to_string(),
            base_prompt: Some("a castle on a hill".to_string()),
            model: Model::Fast,
            steps: Steps::Single(1),
            resolution: Resolution::new(512, 512),
            variation_count: 6,
            seed_base: Some(7),
            style_name: None,
            metadata: false,
            results: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    fn prompt(text: &str) -> PartialSettings {
        PartialSettings {
            prompt: Some(text.to_string()),
            ..PartialSettings::default()
        }
    }

    #[test]
    fn test_style_choice_from_arg() {
        assert_eq!(StyleChoice::from_arg(None), StyleChoice::Inherit);
        assert_eq!(StyleChoice::from_arg(Some("None")), StyleChoice::Clear);
        assert_eq!(
            StyleChoice::from_arg(Some("ghibli")),
            StyleChoice::Named("ghibli".to_string())
        );
    }

    #[test]
    fn test_defaults_without_history() {
        let dir = TempDir::new().unwrap();
        let settings = resolve(&prompt("a fox"), None, &styles(&dir)).unwrap();

        assert_eq!(settings.prompt, "a fox");
        assert_eq!(settings.resolution, Resolution::new(1024, 1024));
        assert_eq!(settings.variation_count, DEFAULT_VARIATIONS);
        assert_eq!(settings.steps, Steps::Single(1));
        assert_eq!(settings.model, Model::Fast);
        assert_eq!(settings.seed_base, None);
    }

    #[test]
    fn test_quality_model_default_steps() {
        let dir = TempDir::new().unwrap();
        let explicit = PartialSettings {
            model: Some(Model::Quality),
            ..prompt("a fox")
        };
        let settings = resolve(&explicit, None, &styles(&dir)).unwrap();
        assert_eq!(settings.steps, Steps::Single(5));
    }

    #[test]
    fn test_no_prompt_anywhere() {
        let dir = TempDir::new().unwrap();
        let err = resolve(&PartialSettings::default(), None, &styles(&dir)).unwrap_err();
        assert!(matches!(err, FluxError::NoPrompt));

        let blank = prompt("   ");
        assert!(matches!(
            resolve(&blank, None, &styles(&dir)),
            Err(FluxError::NoPrompt)
        ));
    }

    #[test]
    fn test_inherits_prompt_resolution_and_count() {
        let dir = TempDir::new().unwrap();
        let prev = previous();
        let settings = resolve(&PartialSettings::default(), Some(&prev), &styles(&dir)).unwrap();

        assert_eq!(settings.prompt, "a castle on a hill");
        assert_eq!(settings.resolution, Resolution::new(512, 512));
        assert_eq!(settings.variation_count, 6);
        // Seeds are never inherited.
        assert_eq!(settings.seed_base, None);
    }

    #[test]
    fn test_explicit_resolution_overrides_history() {
        let dir = TempDir::new().unwrap();
        let prev = previous();
        let explicit = PartialSettings {
            resolution: Some(Preset::Landscape.resolution()),
            ..PartialSettings::default()
        };
        let settings = resolve(&explicit, Some(&prev), &styles(&dir)).unwrap();
        assert_eq!(settings.resolution, Resolution::new(1024, 576));
    }

    #[test]
    fn test_explicit_prompt_with_style() {
        let dir = TempDir::new().unwrap();
        let store = styles(&dir);
        store.save("ghibli", "painterly, soft").unwrap();

        let explicit = PartialSettings {
            style: StyleChoice::Named("ghibli".to_string()),
            ..prompt("a cat")
        };
        let settings = resolve(&explicit, None, &store).unwrap();
        assert_eq!(settings.prompt, "a cat, painterly, soft");
        assert_eq!(settings.base_prompt, "a cat");
        assert_eq!(settings.style_name.as_deref(), Some("ghibli"));
    }

    #[test]
    fn test_explicit_prompt_does_not_inherit_style() {
        let dir = TempDir::new().unwrap();
        let store = styles(&dir);
        store.save("ghibli", "painterly, soft").unwrap();
        let mut prev = previous();
        prev.style_name = Some("ghibli".to_string());

        let settings = resolve(&prompt("a dog"), Some(&prev), &store).unwrap();
        assert_eq!(settings.prompt, "a dog");
        assert_eq!(settings.style_name, None);
    }

    #[test]
    fn test_unknown_style_is_an_error() {
        let dir = TempDir::new().unwrap();
        let explicit = PartialSettings {
            style: StyleChoice::Named("missing".to_string()),
            ..prompt("a cat")
        };
        let err = resolve(&explicit, None, &styles(&dir)).unwrap_err();
        assert!(matches!(err, FluxError::UnknownStyle(name) if name == "missing"));
    }

    #[test]
    fn test_explicit_style_applied_to_inherited_prompt() {
        let dir = TempDir::new().unwrap();
        let store = styles(&dir);
        store.save("noir", "black and white").unwrap();
        let prev = previous();

        let explicit = PartialSettings {
            style: StyleChoice::Named("noir".to_string()),
            ..PartialSettings::default()
        };
        let settings = resolve(&explicit, Some(&prev), &store).unwrap();
        assert_eq!(settings.prompt, "a castle on a hill, black and white");
    }

    #[test]
    fn test_inherited_style_uses_current_text() {
        let dir = TempDir::new().unwrap();
        let store = styles(&dir);
        store.save("ghibli", "painterly, soft").unwrap();

        let first = resolve(
            &PartialSettings {
                style: StyleChoice::Named("ghibli".to_string()),
                ..prompt("a valley")
            },
            None,
            &store,
        )
        .unwrap();
        let prev = first.to_record(Utc::now());
        assert_eq!(prev.prompt, "a valley, painterly, soft");

        store.save("ghibli", "painterly, soft, muted").unwrap();
        let next = resolve(&PartialSettings::default(), Some(&prev), &store).unwrap();
        assert_eq!(next.prompt, "a valley, painterly, soft, muted");
        assert_eq!(next.style_name.as_deref(), Some("ghibli"));
    }

    #[test]
    fn test_style_none_clears_inherited_style() {
        let dir = TempDir::new().unwrap();
        let store = styles(&dir);
        store.save("ghibli", "painterly, soft").unwrap();
        let mut prev = previous();
        prev.prompt = "a castle on a hill, painterly, soft".to_string();
        prev.style_name = Some("ghibli".to_string());

        let explicit = PartialSettings {
            style: StyleChoice::Clear,
            ..PartialSettings::default()
        };
        let settings = resolve(&explicit, Some(&prev), &store).unwrap();
        assert_eq!(settings.prompt, "a castle on a hill");
        assert_eq!(settings.style_name, None);
    }

    #[test]
    fn test_deleted_inherited_style_is_dropped() {
        let dir = TempDir::new().unwrap();
        let mut prev = previous();
        prev.style_name = Some("gone".to_string());

        let settings = resolve(&PartialSettings::default(), Some(&prev), &styles(&dir)).unwrap();
        assert_eq!(settings.prompt, "a castle on a hill");
        assert_eq!(settings.style_name, None);
    }

    #[test]
    fn test_legacy_record_style_recovered_from_prompt() {
        let dir = TempDir::new().unwrap();
        let store = styles(&dir);
        store.save("ghibli", "painterly, soft").unwrap();
        let mut prev = previous();
        prev.base_prompt = None;
        prev.prompt = "a castle on a hill, painterly, soft".to_string();

        let settings = resolve(&PartialSettings::default(), Some(&prev), &store).unwrap();
        assert_eq!(settings.base_prompt, "a castle on a hill");
        assert_eq!(settings.prompt, "a castle on a hill, painterly, soft");
        assert_eq!(settings.style_name.as_deref(), Some("ghibli"));
    }

    #[test]
    fn test_step_variation_forces_count() {
        let dir = TempDir::new().unwrap();
        let prev = previous();
        let explicit = PartialSettings {
            vary_steps: Some(vec![1, 3, 5, 9]),
            seed: Some(42),
            steps: Some(20),
            ..prompt("a fox")
        };
        let settings = resolve(&explicit, Some(&prev), &styles(&dir)).unwrap();
        assert_eq!(settings.variation_count, 4);
        assert_eq!(settings.steps, Steps::Sequence(vec![1, 3, 5, 9]));
        assert_eq!(settings.seed_base, Some(42));
    }

    #[test]
    fn test_step_variation_overrides_explicit_count() {
        let dir = TempDir::new().unwrap();
        let explicit = PartialSettings {
            vary_steps: Some(vec![2, 4]),
            seed: Some(1),
            variation_count: Some(10),
            ..prompt("a fox")
        };
        let settings = resolve(&explicit, None, &styles(&dir)).unwrap();
        assert_eq!(settings.variation_count, 2);
    }

    #[test]
    fn test_step_variation_requires_seed() {
        let dir = TempDir::new().unwrap();
        let explicit = PartialSettings {
            vary_steps: Some(vec![1, 3]),
            ..prompt("a fox")
        };
        let err = resolve(&explicit, None, &styles(&dir)).unwrap_err();
        assert!(matches!(err, FluxError::StepVariationRequiresSeed));
    }

    #[test]
    fn test_seed_must_fit_every_variation() {
        let dir = TempDir::new().unwrap();
        let explicit = PartialSettings {
            seed: Some(u64::MAX),
            variation_count: Some(2),
            ..prompt("a fox")
        };
        let err = resolve(&explicit, None, &styles(&dir)).unwrap_err();
        assert!(matches!(err, FluxError::SeedOutOfRange { seed: u64::MAX, count: 2 }));

        // The last seed lands exactly on the maximum.
        let edge = PartialSettings {
            seed: Some(u64::MAX - 3),
            variation_count: Some(4),
            ..prompt("a fox")
        };
        assert_eq!(resolve(&edge, None, &styles(&dir)).unwrap().seed_base, Some(u64::MAX - 3));

        // A single image, or step variation, never counts up.
        let single = PartialSettings {
            seed: Some(u64::MAX),
            variation_count: Some(1),
            ..prompt("a fox")
        };
        assert!(resolve(&single, None, &styles(&dir)).is_ok());
        let stepped = PartialSettings {
            seed: Some(u64::MAX),
            vary_steps: Some(vec![1, 3, 5]),
            ..prompt("a fox")
        };
        assert!(resolve(&stepped, None, &styles(&dir)).is_ok());
    }

    #[test]
    fn test_inherited_count_checked_against_seed() {
        let dir = TempDir::new().unwrap();
        let prev = previous();
        let explicit = PartialSettings {
            seed: Some(u64::MAX - 1),
            ..PartialSettings::default()
        };
        let err = resolve(&explicit, Some(&prev), &styles(&dir)).unwrap_err();
        assert!(matches!(err, FluxError::SeedOutOfRange { count: 6, .. }));
    }

    #[test]
    fn test_explicit_count_and_steps() {
        let dir = TempDir::new().unwrap();
        let prev = previous();
        let explicit = PartialSettings {
            variation_count: Some(2),
            steps: Some(8),
            ..PartialSettings::default()
        };
        let settings = resolve(&explicit, Some(&prev), &styles(&dir)).unwrap();
        assert_eq!(settings.variation_count, 2);
        assert_eq!(settings.steps, Steps::Single(8));
    }

    #[test]
    fn test_to_record_status() {
        let dir = TempDir::new().unwrap();
        let settings = resolve(&prompt("a fox"), None, &styles(&dir)).unwrap();
        let record = settings.to_record(Utc::now());
        assert_eq!(record.status, RunStatus::InProgress);
        assert_eq!(record.base_prompt.as_deref(), Some("a fox"));

        let zero = PartialSettings {
            variation_count: Some(0),
            ..prompt("a fox")
        };
        let record = resolve(&zero, None, &styles(&dir))
            .unwrap()
            .to_record(Utc::now());
        assert_eq!(record.status, RunStatus::Pending);
    }
}
