//! Prompt templates for Shabda.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    /// Prompts for LLM vocabulary extraction.
    pub extraction: ExtractionPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// System instruction for the lyrics agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that finds Marathi song lyrics and builds vocabulary lists for language learners.

You work step by step. In every reply, think briefly about what to do next and then call exactly ONE tool using this exact format on its own line:

Tool: tool_name(arg1="value1", arg2="value2")

Available tools:
- search_web(query="...", max_results="5")
  Search the web. Use it to find pages with the song's lyrics.
- get_page_content(url="...")
  Fetch a web page and extract Marathi (Devanagari) and phonetic lyrics from it.
- generate_song_id(title="...", artist="...")
  Create a stable ID for the song. Returns {"song_id": "..."}.
- extract_vocabulary(text="...")
  Extract vocabulary items from Marathi text. Returns a JSON list.
- save_results(song_id="...", lyrics="...", vocabulary="...")
  Save the lyrics and vocabulary. If you omit an argument, the most recent value is used.

Process:
1. Search for the lyrics.
2. Fetch the most promising page.
3. Generate a song ID.
4. Extract vocabulary from the lyrics.
5. Save the results.

Rules:
- Keep every argument value inside double quotes. Escape quotes inside values as \".
- You may leave out long texts: tools reuse the lyrics and vocabulary from earlier steps.
- Tool results are sent back to you as system messages. Read them before choosing the next step.
- When everything is saved, reply with FINISHED and the ID, like: FINISHED song_id: "the-song-id""#
                .to_string(),
        }
    }
}

/// Prompts for LLM vocabulary extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            system: "You are a Marathi language expert. You extract vocabulary from Marathi text and answer only with JSON.".to_string(),

            user: r#"Extract vocabulary from this Marathi text. For each word, provide:
1. The word in Devanagari
2. Phonetic transcription
3. English meaning (best guess)
4. Break down of parts (if compound word)

FORMAT each entry as valid JSON. The output should be a JSON array where each item has this structure:
{
  "marathi": "पैसे देणे",
  "phonetic": "paisē dēṇē",
  "english": "to pay",
  "parts": [
    { "marathi": "पैसे", "phonetic": ["paisē"] },
    { "marathi": "देणे", "phonetic": ["dēṇē"] }
  ]
}

TEXT TO ANALYZE:
{{text}}

IMPORTANT: Your entire response must be ONLY the JSON array. Do not include any explanations or notes."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        // Store custom variables
        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let extraction_path = custom_path.join("extraction.toml");
            if extraction_path.exists() {
                let content = std::fs::read_to_string(&extraction_path)?;
                prompts.extraction = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The agent system prompt with custom variables applied.
    pub fn agent_system(&self) -> String {
        Self::render(&self.agent.system, &self.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.agent.system.contains("Tool: tool_name("));
        assert!(prompts.agent.system.contains("FINISHED"));
        assert!(prompts.extraction.user.contains("{{text}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("text".to_string(), "from config".to_string());

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), "गाणे".to_string());

        let rendered = prompts.render_with_custom("{{text}}", &vars);
        assert_eq!(rendered, "गाणे");
    }

    #[test]
    fn test_load_custom_agent_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("agent.toml"),
            "system = \"Answer in {{tone}} tone.\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("tone".to_string(), "friendly".to_string());

        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();
        assert_eq!(prompts.agent_system(), "Answer in friendly tone.");
        // Untouched sections keep their defaults
        assert!(prompts.extraction.user.contains("{{text}}"));
    }
}
