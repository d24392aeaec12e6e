use std::collections::HashMap;

use promptcraft_core::{PromptcraftError, Value};

use crate::{eval, parser, validate::validate_template};

/// A prompt template held as its raw source. Validation and parsing happen on
/// every render: a template is never executed without passing the safety scan
/// first.
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

    pub fn source(&self) -> &str {
        &self.template
    }

    /// Runs the safety scan and syntax check. Empty result means accepted.
    pub fn validate(&self) -> Vec<String> {
        validate_template(&self.template)
    }

    /// Renders against `vars` overlaid on `defaults`. Keys in `vars` win;
    /// the merge is shallow. Variables referenced by the template but present
    /// in neither map render as empty.
    pub fn render(
        &self,
        vars: &HashMap<String, Value>,
        defaults: Option<&HashMap<String, Value>>,
    ) -> Result<String, PromptcraftError> {
        let errors = self.validate();
        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "template rejected by safety validation");
            return Err(PromptcraftError::TemplateRejected(errors.join("; ")));
        }
        let nodes = parser::parse(&self.template)
            .map_err(|err| PromptcraftError::TemplateSyntax(err.to_string()))?;
        let merged = merge_variables(defaults, vars);
        Ok(eval::render_nodes(&nodes, &merged))
    }
}

/// Shallow merge: overrides replace defaults entirely, nothing is deep-merged.
pub fn merge_variables(
    defaults: Option<&HashMap<String, Value>>,
    vars: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    let mut merged = defaults.cloned().unwrap_or_default();
    for (key, value) in vars {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
