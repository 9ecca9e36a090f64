use serde::Deserialize;
use std::fs;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::models::chat::{ PromptMessage, Role };

/// System preamble prepended to every model invocation. The defaults carry
/// the financial-advisor persona; a JSON file can replace them wholesale:
///
/// ```json
/// { "system_instructions": ["You are..."], "language": "Spanish" }
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub system_instructions: Vec<String>,
    /// Target language the assistant is told to answer in.
    #[serde(default)]
    pub language: Option<String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_instructions: vec![
                "You are a virtual assistant.".to_string(),
                "You are a financial advisor who helps calculate expenses and manage budgets.".to_string(),
                "Respond formally.".to_string(),
                "Answer requested calculations precisely.".to_string(),
                "Show the calculation you performed.".to_string()
            ],
            language: None,
        }
    }
}

impl PromptConfig {
    /// The preamble as system turns, ready to precede the stored context.
    pub fn system_messages(&self) -> Vec<PromptMessage> {
        let mut messages: Vec<PromptMessage> = self.system_instructions
            .iter()
            .map(|instruction| PromptMessage::new(Role::System, instruction))
            .collect();

        if let Some(language) = &self.language {
            messages.push(PromptMessage::new(Role::System, &format!("Respond in {}.", language)));
        }

        messages
    }
}

/// Load the preamble from `path`, or fall back to the built-in persona when
/// no path is configured. A configured-but-unreadable file is a startup
/// error, not something to paper over mid-conversation.
pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, ConfigError> {
    let Some(path) = path else {
        return Ok(Arc::new(PromptConfig::default()));
    };

    let file_content = fs::read_to_string(path)?;
    let config: PromptConfig = serde_json
        ::from_str(&file_content)
        .map_err(|e| ConfigError::Invalid(format!("failed to parse prompts file '{}': {}", path, e)))?;

    if config.system_instructions.is_empty() {
        return Err(
            ConfigError::Invalid(format!("prompts file '{}' defines no system instructions", path))
        );
    }

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preamble_is_all_system_turns() {
        let config = PromptConfig::default();
        let messages = config.system_messages();
        assert!(!messages.is_empty());
        assert!(messages.iter().all(|m| m.role == Role::System));
    }

    #[test]
    fn language_parameter_appends_a_directive() {
        let config = PromptConfig {
            system_instructions: vec!["You are a helper.".to_string()],
            language: Some("Spanish".to_string()),
        };

        let messages = config.system_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Respond in Spanish.");
    }

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let config = load_prompts(None).unwrap();
        assert_eq!(config.system_instructions, PromptConfig::default().system_instructions);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        assert!(matches!(
            load_prompts(Some("/nonexistent/prompts.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
