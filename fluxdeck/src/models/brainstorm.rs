//! Prompts suggested for a concept, kept per session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FluxError;

/// Contents of `brainstorm_results.json`.
///
/// Older files carry only `prompts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainstormResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub prompts: Vec<String>,
}

impl BrainstormResults {
    pub fn new(concept: &str, prompts: Vec<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            concept: Some(concept.to_string()),
            created_at: Some(created_at),
            prompts,
        }
    }

    /// Pick prompts by 1-based number from a list like `1,3,5`.
    ///
    /// Order and repeats are kept. Any bad or missing number rejects the
    /// whole selection.
    pub fn select(&self, raw: &str) -> Result<Vec<(usize, String)>, FluxError> {
        let invalid = || FluxError::InvalidPromptIndices(raw.to_string());
        let numbers = raw
            .split(',')
            .map(|part| part.trim().parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        numbers
            .into_iter()
            .map(|number| {
                number
                    .checked_sub(1)
                    .and_then(|i| self.prompts.get(i))
                    .map(|prompt| (number, prompt.clone()))
                    .ok_or(FluxError::PromptIndexOutOfRange {
                        index: number,
                        available: self.prompts.len(),
                    })
            })
            .collect()
    }

    /// Numbered listing for the terminal.
    pub fn format(&self) -> String {
        let rule = "-".repeat(40);
        let mut lines = vec!["Generated prompts:".to_string(), rule.clone()];
        lines.extend(
            self.prompts
                .iter()
                .enumerate()
                .map(|(i, prompt)| format!("{}. {prompt}", i + 1)),
        );
        lines.push(rule);
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> BrainstormResults {
        BrainstormResults::new(
            "lighthouse",
            vec![
                "a lighthouse in a storm".to_string(),
                "a lighthouse at dawn".to_string(),
                "an abandoned lighthouse".to_string(),
            ],
            Utc::now(),
        )
    }

    #[test]
    fn test_select_keeps_order() {
        let picked = results().select("3, 1").unwrap();
        assert_eq!(
            picked,
            vec![
                (3, "an abandoned lighthouse".to_string()),
                (1, "a lighthouse in a storm".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_rejects_bad_numbers() {
        let results = results();
        assert!(matches!(
            results.select("1,x"),
            Err(FluxError::InvalidPromptIndices(raw)) if raw == "1,x"
        ));
        assert!(matches!(results.select(""), Err(FluxError::InvalidPromptIndices(_))));
        assert!(matches!(
            results.select("0"),
            Err(FluxError::PromptIndexOutOfRange { index: 0, available: 3 })
        ));
        assert!(matches!(
            results.select("2,4"),
            Err(FluxError::PromptIndexOutOfRange { index: 4, .. })
        ));
    }

    #[test]
    fn test_reads_prompts_only_file() {
        let parsed: BrainstormResults =
            serde_json::from_str(r#"{"prompts": ["one", "two"]}"#).unwrap();
        assert_eq!(parsed.concept, None);
        assert_eq!(parsed.prompts, vec!["one", "two"]);
    }

    #[test]
    fn test_format_numbers_prompts() {
        let text = results().format();
        assert!(text.starts_with("Generated prompts:\n"));
        assert!(text.contains("\n2. a lighthouse at dawn\n"));
    }
}
