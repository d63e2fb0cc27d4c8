//! Prompt assembly: role persona + task instructions + upstream output

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::provider::PromptRequest;
use crate::role::Role;
use crate::task::TaskSpec;

/// `{name}` placeholders filled from run inputs
static INPUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_-]*)\}").unwrap());

/// Separator between upstream outputs in the context block
const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// Replace `{name}` with the matching input; unknown names are left as-is
pub fn interpolate<'a>(template: &'a str, inputs: &HashMap<String, String>) -> Cow<'a, str> {
    if inputs.is_empty() {
        return Cow::Borrowed(template);
    }
    INPUT_PATTERN.replace_all(template, |caps: &Captures| {
        inputs
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
}

/// System message describing who the model is playing
pub fn system_prompt(role: &Role) -> String {
    format!(
        "You are {}. {}\nYour personal goal is: {}",
        role.role,
        role.backstory.trim(),
        role.goal.trim()
    )
}

/// User message for one task, with upstream outputs appended verbatim
pub fn task_prompt(
    task: &TaskSpec,
    upstream: &[&str],
    inputs: &HashMap<String, String>,
) -> String {
    let description = interpolate(task.description.trim(), inputs);
    let expected = interpolate(task.expected_output.trim(), inputs);

    let mut prompt = format!(
        "Current task: {description}\n\n\
         Expected criteria for your final answer: {expected}\n\
         Return the complete content as your final answer, not a summary."
    );

    if !upstream.is_empty() {
        prompt.push_str("\n\nThis is the context you are working with:\n");
        prompt.push_str(&upstream.join(CONTEXT_SEPARATOR));
    }

    prompt.push_str("\n\nBegin!");
    prompt
}

/// Full request for `task` performed by `role`
pub fn build_prompt(
    role: &Role,
    task: &TaskSpec,
    upstream: &[&str],
    inputs: &HashMap<String, String>,
) -> PromptRequest {
    PromptRequest::new(task_prompt(task, upstream, inputs), String::new())
        .with_system_prompt(system_prompt(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn writer() -> Role {
        Role::new("writer", "Redator Criativo", "Escrever artigos", "Você é premiado.")
    }

    #[test]
    fn interpolate_known_and_unknown() {
        let vars = inputs(&[("topic", "IA")]);
        assert_eq!(interpolate("Sobre {topic} em {year}", &vars), "Sobre IA em {year}");
    }

    #[test]
    fn interpolate_without_inputs_borrows() {
        let result = interpolate("keep {this}", &HashMap::new());
        assert!(matches!(result, Cow::Borrowed(_)));
    }

    #[test]
    fn system_prompt_carries_persona() {
        let system = system_prompt(&writer());
        assert!(system.contains("Redator Criativo"));
        assert!(system.contains("Você é premiado."));
        assert!(system.contains("Escrever artigos"));
    }

    #[test]
    fn task_prompt_without_upstream_has_no_context_block() {
        let task = TaskSpec::new("t", "Pesquise", "Relatório", "writer");
        let prompt = task_prompt(&task, &[], &HashMap::new());
        assert!(prompt.contains("Pesquise"));
        assert!(prompt.contains("Relatório"));
        assert!(!prompt.contains("context you are working with"));
    }

    #[test]
    fn task_prompt_contains_every_upstream_verbatim() {
        let task = TaskSpec::new("t", "Combine", "Texto", "writer");
        let prompt = task_prompt(&task, &["RESULT_A\nline two", "RESULT_B"], &HashMap::new());
        assert!(prompt.contains("RESULT_A\nline two"));
        assert!(prompt.contains("RESULT_B"));
        assert!(prompt.find("RESULT_A").unwrap() < prompt.find("RESULT_B").unwrap());
    }

    #[test]
    fn build_prompt_sets_system_and_user() {
        let task = TaskSpec::new("t", "Escreva sobre {topic}", "Artigo", "writer");
        let request = build_prompt(&writer(), &task, &["UP"], &inputs(&[("topic", "Rust")]));
        assert!(request.prompt.contains("Escreva sobre Rust"));
        assert!(request.prompt.contains("UP"));
        assert!(request.system_prompt.unwrap().contains("Redator Criativo"));
        assert!(request.model.is_empty());
    }
}
