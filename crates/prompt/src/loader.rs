//! Prompt loader for built-in and workspace YAML prompt definitions.

use crate::builder::build_prompt;
use crate::ids;
use crate::types::{BuiltPrompt, PromptDefinition};
use agriqa_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// Prompts compiled into the binary.
const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        ids::INTENT_CLASSIFY,
        include_str!("../prompts/intent.classify.yml"),
    ),
    (
        ids::ANSWER_DIRECT,
        include_str!("../prompts/answer.direct.yml"),
    ),
    (
        ids::ANSWER_HYBRID,
        include_str!("../prompts/answer.hybrid.yml"),
    ),
    (
        ids::ANSWER_FALLBACK,
        include_str!("../prompts/answer.fallback.yml"),
    ),
];

/// Load a prompt definition by ID.
///
/// A file named `<id>.yml` in `overrides_dir` wins over the built-in
/// prompt of the same ID.
///
/// # Example
/// ```no_run
/// use agriqa_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Some(Path::new(".agriqa/prompts")), "answer.direct")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(overrides_dir: Option<&Path>, prompt_id: &str) -> AppResult<PromptDefinition> {
    if let Some(dir) = overrides_dir {
        let prompt_file = dir.join(format!("{}.yml", prompt_id));
        if prompt_file.is_file() {
            tracing::debug!("Loading prompt override from: {:?}", prompt_file);

            let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
                AppError::Prompt(format!(
                    "Failed to read prompt file {:?}: {}",
                    prompt_file, e
                ))
            })?;

            let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
            if definition.id != prompt_id {
                return Err(AppError::Prompt(format!(
                    "Prompt file {:?} declares id '{}', expected '{}'",
                    prompt_file, definition.id, prompt_id
                )));
            }

            tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
            return Ok(definition);
        }
    }

    let contents = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .map(|(_, contents)| *contents)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;

    parse_prompt(contents, "built-in")
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: '{}'. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

/// The prompts the query engine renders, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: HashMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Load every built-in prompt, honouring workspace overrides.
    pub fn load(overrides_dir: Option<&Path>) -> AppResult<Self> {
        let prompts = BUILTIN_PROMPTS
            .iter()
            .map(|(id, _)| load_prompt(overrides_dir, id).map(|def| (id.to_string(), def)))
            .collect::<AppResult<HashMap<_, _>>>()?;

        Ok(Self { prompts })
    }

    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        Self::load(None)
    }

    pub fn get(&self, prompt_id: &str) -> AppResult<&PromptDefinition> {
        self.prompts
            .get(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
    }

    pub fn render(
        &self,
        prompt_id: &str,
        variables: HashMap<String, String>,
    ) -> AppResult<BuiltPrompt> {
        build_prompt(self.get(prompt_id)?, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        fs::create_dir_all(dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Custom Prompt"
apiVersion: "1.0"
createdBy: test
behavior:
  tone: professional
  style: concise
template: "Custom: {{{{question}}}}"
output:
  format: markdown
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_builtin_prompts_are_valid() {
        for (id, _) in BUILTIN_PROMPTS {
            let def = load_prompt(None, id).unwrap();
            assert_eq!(def.id, *id);
            assert!(def.system.is_some());
        }
    }

    #[test]
    fn test_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), ids::ANSWER_DIRECT, true);

        let prompt = load_prompt(Some(temp_dir.path()), ids::ANSWER_DIRECT).unwrap();
        assert_eq!(prompt.title, "Custom Prompt");

        // Other prompts still come from the built-ins
        let fallback = load_prompt(Some(temp_dir.path()), ids::ANSWER_FALLBACK).unwrap();
        assert_ne!(fallback.title, "Custom Prompt");
    }

    #[test]
    fn test_load_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(Some(temp_dir.path()), "nonexistent").is_err());
        assert!(load_prompt(None, "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), ids::ANSWER_HYBRID, false);

        let result = load_prompt(Some(temp_dir.path()), ids::ANSWER_HYBRID);
        assert!(result.is_err());
    }

    #[test]
    fn test_override_with_mismatched_id() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_prompt(temp_dir.path(), "other.id", true);
        fs::rename(&path, temp_dir.path().join("answer.direct.yml")).unwrap();

        assert!(load_prompt(Some(temp_dir.path()), ids::ANSWER_DIRECT).is_err());
    }

    #[test]
    fn test_library_renders_builtin() {
        let library = PromptLibrary::builtin().unwrap();
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Rainfall in Kerala in 2020?".to_string());
        vars.insert("language_name".to_string(), "English".to_string());
        vars.insert("marker".to_string(), "---GENERAL---".to_string());
        vars.insert("record_count".to_string(), "2".to_string());
        vars.insert("records".to_string(), "- state: Kerala".to_string());

        let built = library.render(ids::ANSWER_HYBRID, vars).unwrap();
        assert!(built.user.contains("Rainfall in Kerala in 2020?"));
        assert!(built.system.unwrap().contains("---GENERAL---"));
        assert!(!built.user.contains("Focus:"));
    }
}
