use std::collections::HashMap;

use regex::Regex;
use verirag_core::{Value, VeriragError};

const PLACEHOLDER: &str = r"\{\{\s*(\w+)\s*\}\}";

/// A text template with `{{name}}` placeholders. Unknown placeholders render
/// as the empty string.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn input_variables(&self) -> Result<Vec<String>, VeriragError> {
        let pattern =
            Regex::new(PLACEHOLDER).map_err(|e| VeriragError::InvalidConfig(e.to_string()))?;
        let mut names: Vec<String> = Vec::new();
        for caps in pattern.captures_iter(&self.template) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn render(&self, vars: &HashMap<String, Value>) -> Result<String, VeriragError> {
        let pattern =
            Regex::new(PLACEHOLDER).map_err(|e| VeriragError::InvalidConfig(e.to_string()))?;
        let rendered = pattern.replace_all(&self.template, |caps: &regex::Captures| {
            let key = &caps[1];
            match vars.get(key) {
                Some(value) => value
                    .as_str()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| value.to_string()),
                None => "".to_string(),
            }
        });
        Ok(rendered.to_string())
    }

    pub fn render_pairs(&self, pairs: &[(&str, &str)]) -> Result<String, VeriragError> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect::<HashMap<_, _>>();
        self.render(&vars)
    }
}
