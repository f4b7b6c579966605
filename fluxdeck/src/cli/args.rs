//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser, Subcommand};

use crate::brainstorm::DEFAULT_PROMPT_COUNT;
use crate::models::{Model, Preset, Resolution};
use crate::server::DEFAULT_PORT;

/// Fluxdeck - Session-aware image generation with FLUX models
#[derive(Parser, Debug)]
#[command(name = "fluxdeck")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("size")
        .multiple(false)
        .args([
            "resolution", "format", "landscape", "portrait", "landscape_sm", "portrait_sm",
            "square_sm", "landscape_lg", "portrait_lg", "square_lg", "landscape_xl",
            "portrait_xl", "square_xl",
        ])
))]
pub struct Cli {
    /// Text prompt (inherited from the previous run in the session if omitted)
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Model to use
    #[arg(short, long, value_enum)]
    pub model: Option<Model>,

    /// Starting seed (random per image if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Inference steps (defaults to the model's default)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub steps: Option<u32>,

    /// Number of images to generate
    #[arg(long, visible_alias = "vary-seed")]
    pub variations: Option<u32>,

    /// Comma-separated step counts, one image each with the same seed (requires --seed)
    #[arg(long, value_name = "STEPS")]
    pub vary_steps: Option<String>,

    /// Saved style to append to the prompt ("none" drops an inherited style)
    #[arg(short, long)]
    pub style: Option<String>,

    /// Save generator metadata next to each image
    #[arg(long)]
    pub metadata: bool,

    // === Resolution ===
    /// Exact size as WIDTHxHEIGHT
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Named size preset
    #[arg(long, value_enum)]
    pub format: Option<Preset>,

    /// 1024x576
    #[arg(long)]
    pub landscape: bool,

    /// 768x1024
    #[arg(long)]
    pub portrait: bool,

    /// 512x288
    #[arg(long)]
    pub landscape_sm: bool,

    /// 384x512
    #[arg(long)]
    pub portrait_sm: bool,

    /// 512x512
    #[arg(long)]
    pub square_sm: bool,

    /// 1536x864
    #[arg(long)]
    pub landscape_lg: bool,

    /// 1152x1536
    #[arg(long)]
    pub portrait_lg: bool,

    /// 1536x1536
    #[arg(long)]
    pub square_lg: bool,

    /// 2048x1152
    #[arg(long)]
    pub landscape_xl: bool,

    /// 1536x2048
    #[arg(long)]
    pub portrait_xl: bool,

    /// 2048x2048
    #[arg(long)]
    pub square_xl: bool,

    // === Session ===
    /// Start a new session even if a recent one exists
    #[arg(long, visible_alias = "new")]
    pub force_new_session: bool,

    /// Base directory for session directories
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Open the run gallery in a browser when done
    #[arg(long)]
    pub open: bool,

    // === Styles ===
    /// Save a named style
    #[arg(long, num_args = 2, value_names = ["NAME", "DESCRIPTION"])]
    pub save_style: Option<Vec<String>>,

    /// List saved styles
    #[arg(long)]
    pub list_styles: bool,

    /// Delete a saved style
    #[arg(long, value_name = "NAME")]
    pub delete_style: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The preset selected by one of the size flags, if any.
    pub fn preset(&self) -> Option<Preset> {
        let flags = [
            (self.landscape, Preset::Landscape),
            (self.portrait, Preset::Portrait),
            (self.landscape_sm, Preset::LandscapeSm),
            (self.portrait_sm, Preset::PortraitSm),
            (self.square_sm, Preset::SquareSm),
            (self.landscape_lg, Preset::LandscapeLg),
            (self.portrait_lg, Preset::PortraitLg),
            (self.square_lg, Preset::SquareLg),
            (self.landscape_xl, Preset::LandscapeXl),
            (self.portrait_xl, Preset::PortraitXl),
            (self.square_xl, Preset::SquareXl),
        ];
        self.format
            .or_else(|| flags.into_iter().find_map(|(set, preset)| set.then_some(preset)))
    }

    /// Explicitly requested size from `--resolution`, `--format` or a preset flag.
    pub fn requested_resolution(&self) -> Option<Resolution> {
        self.resolution.or_else(|| self.preset().map(Preset::resolution))
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List sessions and their runs
    List,

    /// Re-render the gallery pages of a session
    Gallery {
        /// Session directory (defaults to the current session)
        #[arg(long)]
        session: Option<PathBuf>,

        /// Open the session gallery in a browser
        #[arg(long)]
        open: bool,
    },

    /// Ask a text model (via `llm`) for prompts about a concept
    Brainstorm {
        /// What the prompts should be about
        concept: String,

        /// Number of prompts to request
        #[arg(
            short = 'n',
            long,
            default_value_t = DEFAULT_PROMPT_COUNT,
            value_parser = clap::value_parser!(u32).range(1..=50)
        )]
        count: u32,
    },

    /// Generate images for prompts from the last brainstorm, e.g. `run-prompts 1,3,5`
    ///
    /// Generation flags given before the subcommand apply to every prompt.
    /// Each prompt gets one image unless --variations says otherwise.
    RunPrompts {
        /// Comma-separated prompt numbers as listed by `brainstorm`
        indices: String,
    },

    /// Serve a session directory over HTTP
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Open browser automatically
        #[arg(long)]
        open: bool,

        /// Session directory (defaults to the current session)
        #[arg(long)]
        session: Option<PathBuf>,
    },
}
