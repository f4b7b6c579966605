//! Generation parameters shared by the resolver, the run record and the CLI.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FluxError;

/// Model variant passed to the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// Distilled model, few steps ("schnell").
    #[default]
    #[value(alias = "schnell")]
    #[serde(alias = "schnell")]
    Fast,
    /// Full model, more steps ("dev").
    #[value(alias = "dev")]
    #[serde(alias = "dev")]
    Quality,
}

impl Model {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Quality => "quality",
        }
    }

    /// Identifier understood by the generator's `--model` flag.
    pub const fn generator_id(self) -> &'static str {
        match self {
            Self::Fast => "schnell",
            Self::Quality => "dev",
        }
    }

    /// Step count used when neither `--steps` nor `--vary-steps` is given.
    pub const fn default_steps(self) -> u32 {
        match self {
            Self::Fast => 1,
            Self::Quality => 5,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const DEFAULT: Self = Self::new(1024, 1024);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = FluxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FluxError::InvalidResolution(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Named resolution presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// 1024x1024
    Default,
    /// 16:9, 1024x576
    Landscape,
    /// 3:4, 768x1024
    Portrait,
    /// 16:9, 512x288
    #[value(alias = "landscape_sm")]
    LandscapeSm,
    /// 3:4, 384x512
    #[value(alias = "portrait_sm")]
    PortraitSm,
    /// 512x512
    #[value(alias = "square_sm")]
    SquareSm,
    /// 16:9, 1536x864
    #[value(alias = "landscape_lg")]
    LandscapeLg,
    /// 3:4, 1152x1536
    #[value(alias = "portrait_lg")]
    PortraitLg,
    /// 1536x1536
    #[value(alias = "square_lg")]
    SquareLg,
    /// 16:9, 2048x1152
    #[value(alias = "landscape_xl")]
    LandscapeXl,
    /// 3:4, 1536x2048
    #[value(alias = "portrait_xl")]
    PortraitXl,
    /// 2048x2048
    #[value(alias = "square_xl")]
    SquareXl,
}

impl Preset {
    pub const fn resolution(self) -> Resolution {
        match self {
            Self::Default => Resolution::DEFAULT,
            Self::Landscape => Resolution::new(1024, 576),
            Self::Portrait => Resolution::new(768, 1024),
            Self::LandscapeSm => Resolution::new(512, 288),
            Self::PortraitSm => Resolution::new(384, 512),
            Self::SquareSm => Resolution::new(512, 512),
            Self::LandscapeLg => Resolution::new(1536, 864),
            Self::PortraitLg => Resolution::new(1152, 1536),
            Self::SquareLg => Resolution::new(1536, 1536),
            Self::LandscapeXl => Resolution::new(2048, 1152),
            Self::PortraitXl => Resolution::new(1536, 2048),
            Self::SquareXl => Resolution::new(2048, 2048),
        }
    }
}

/// Step count for a run: one value for every variation, or one per variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Steps {
    Single(u32),
    Sequence(Vec<u32>),
}

impl Steps {
    /// Steps for the 0-based variation `index`.
    pub fn for_variation(&self, index: usize) -> Option<u32> {
        match self {
            Self::Single(steps) => Some(*steps),
            Self::Sequence(seq) => seq.get(index).copied(),
        }
    }

    pub const fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    /// Parse a `--vary-steps` list such as `1, 3,5,9`.
    pub fn parse_sequence(s: &str) -> Result<Self, FluxError> {
        let invalid = || FluxError::InvalidStepList(s.to_string());
        let seq = s
            .split(',')
            .map(|part| match part.trim().parse::<u32>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if seq.is_empty() {
            return Err(invalid());
        }
        Ok(Self::Sequence(seq))
    }
}

impl fmt::Display for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(steps) => write!(f, "{steps}"),
            Self::Sequence(seq) => {
                let parts: Vec<String> = seq.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse() {
        assert_eq!("512x288".parse::<Resolution>().unwrap(), Resolution::new(512, 288));
        assert_eq!(" 640X480 ".parse::<Resolution>().unwrap(), Resolution::new(640, 480));
        assert!("1024".parse::<Resolution>().is_err());
        assert!("0x512".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::new(1536, 864).to_string(), "1536x864");
    }

    #[test]
    fn test_model_defaults() {
        assert_eq!(Model::Fast.default_steps(), 1);
        assert_eq!(Model::Quality.default_steps(), 5);
        assert_eq!(Model::Quality.generator_id(), "dev");
        assert_eq!(Model::default(), Model::Fast);
    }

    #[test]
    fn test_model_serde_accepts_generator_ids() {
        let model: Model = serde_json::from_str("\"schnell\"").unwrap();
        assert_eq!(model, Model::Fast);
        let model: Model = serde_json::from_str("\"quality\"").unwrap();
        assert_eq!(model, Model::Quality);
        assert_eq!(serde_json::to_string(&Model::Quality).unwrap(), "\"quality\"");
    }

    #[test]
    fn test_preset_resolutions() {
        assert_eq!(Preset::Landscape.resolution(), Resolution::new(1024, 576));
        assert_eq!(Preset::SquareSm.resolution(), Resolution::new(512, 512));
        assert_eq!(Preset::PortraitXl.resolution(), Resolution::new(1536, 2048));
    }

    #[test]
    fn test_parse_step_sequence() {
        assert_eq!(
            Steps::parse_sequence("1, 3,5 ,9").unwrap(),
            Steps::Sequence(vec![1, 3, 5, 9])
        );
        assert!(Steps::parse_sequence("").is_err());
        assert!(Steps::parse_sequence("1,,3").is_err());
        assert!(Steps::parse_sequence("1,zero").is_err());
        assert!(Steps::parse_sequence("0,2").is_err());
    }

    #[test]
    fn test_steps_serde_shape() {
        assert_eq!(serde_json::to_string(&Steps::Single(4)).unwrap(), "4");
        assert_eq!(
            serde_json::to_string(&Steps::Sequence(vec![1, 3])).unwrap(),
            "[1,3]"
        );
        let steps: Steps = serde_json::from_str("[2,4]").unwrap();
        assert_eq!(steps.for_variation(1), Some(4));
        assert_eq!(steps.for_variation(2), None);
        assert_eq!(Steps::Single(5).for_variation(9), Some(5));
    }
}
