//! Prompt builder for rendering system and user templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use agriqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the optional system template and the user template are rendered
/// with the same variables. Missing variables render as empty strings, so
/// `{{#if focus}}` blocks simply disappear when no focus is supplied.
///
/// # Example
/// ```no_run
/// use agriqa_prompt::{build_prompt, load_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = load_prompt(None, "answer.fallback")?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "Average wheat yield in Punjab?".to_string());
/// vars.insert("language_name".to_string(), "English".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let handlebars = registry(definition)?;

    let system = match definition.system {
        Some(_) => Some(render(&handlebars, "system", &variables)?),
        None => None,
    };
    let user = render(&handlebars, "user", &variables)?;

    Ok(BuiltPrompt::new(
        system.map(|s| s.trim_end().to_string()),
        user.trim_end().to_string(),
        definition.id.clone(),
        variables,
    ))
}

fn registry(definition: &PromptDefinition) -> AppResult<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();

    // Plain text, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("user", &definition.template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    if let Some(system) = &definition.system {
        handlebars
            .register_template_string("system", system)
            .map_err(|e| AppError::Prompt(format!("Failed to register system template: {}", e)))?;
    }

    Ok(handlebars)
}

fn render(
    handlebars: &Handlebars<'_>,
    name: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
