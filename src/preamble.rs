//! Seed messages sent ahead of every conversation.

use crate::models::{AiExample, Catalog, Message, MessageRole, Snippet};

pub const SYSTEM_PROMPT_ID: &str = "system-1";
pub const CURRENT_CODE_ID: &str = "initial-code";
pub const WELCOME_ID: &str = "welcome";

pub const WELCOME_WITH_CODE: &str = "What changes would you like to make?";
pub const WELCOME_EMPTY: &str = "Describe what you'd like to build!";

const INTRO: &str = "You are an expert React developer specializing in UI component composition. \
                     Your task is to help users create UI layouts using only the components provided.";

const INSTRUCTIONS: &str = "\
## Instructions

1. Create concise, elegant layouts using ONLY the components listed above.
2. Generate valid JSX with proper nesting and indentation.
3. Use props as shown in the component definitions.
4. When modifying existing code, preserve the structure while making requested changes.
5. If the user asks for a component you don't have, use the closest available alternative.
6. MUST follow snippets examples and syntax. For example, if a component is nested in a provider, you must always add the provider.
";

const RESPONSE_FORMAT: &str = r#"## Response Format (VERY IMPORTANT)

Return a JSON object in the following format:

{
  "1": "<JSX code>",
  "2": "<JSX code>",
  "3": "<JSX code>",
  "4": "<JSX code>",
  "5": "<JSX code>",
  "6": "<JSX code>",
  "7": "<JSX code>",
  "8": "<JSX code>",
  "9": "<JSX code>",
  "message": "<message>"
}

1 must contain valid JSX. No explanations, no markdown, no code blocks (e.g. ```jsx). The code will be directly rendered in the UI. Ensure all opening tags have matching closing tags.
2 to 9 are optional and can be used to provide alternative suggestions. If you have multiple suggestions, return them in the order of preference.
message must contain the follow-up message to the end user.

Generate and return only 1 unless specifically asked to generate multiple versions, options, or variants.
"#;

fn snippet_block(snippet: &Snippet) -> String {
    format!("### {} ({})\n```jsx\n{}\n```\n", snippet.name, snippet.group, snippet.code)
}

fn example_block(example: &AiExample) -> String {
    let heading = match example.description.as_deref() {
        Some(d) if !d.is_empty() => format!("{} - {d}", example.name),
        _ => example.name.clone(),
    };
    format!("### {heading}\n```jsx\n{}\n```\n", example.code)
}

/// Renders the instruction block from the host's catalog.
pub fn system_prompt(catalog: &Catalog) -> String {
    let mut prompt = String::new();
    prompt.push_str(INTRO);
    prompt.push_str("\n\n## Available Components\n\n");
    prompt.push_str(&catalog.components.join(", "));
    prompt.push_str("\n\n## Component Snippets\n\n");
    for snippet in &catalog.snippets {
        prompt.push_str(&snippet_block(snippet));
        prompt.push('\n');
    }
    prompt.push_str(INSTRUCTIONS);

    if !catalog.examples.is_empty() {
        prompt.push_str("\n## Example usage\n\n");
        prompt.push_str("Here are some example components that demonstrate best practices:\n\n");
        let blocks: Vec<String> = catalog.examples.iter().map(example_block).collect();
        prompt.push_str(&blocks.join("\n"));
    }

    prompt.push('\n');
    prompt.push_str(RESPONSE_FORMAT);
    prompt
}

/// Builds the seed: instructions, the current document when there is one,
/// and the welcome message.
pub fn seed(catalog: &Catalog, current_code: Option<&str>) -> Vec<Message> {
    let current_code = current_code.filter(|c| !c.trim().is_empty());

    let mut messages = vec![Message::with_id(
        SYSTEM_PROMPT_ID,
        MessageRole::System,
        system_prompt(catalog),
    )];
    if let Some(code) = current_code {
        messages.push(Message::with_id(
            CURRENT_CODE_ID,
            MessageRole::System,
            format!("Current code to modify if requested:\n\n{code}"),
        ));
    }
    let welcome = if current_code.is_some() { WELCOME_WITH_CODE } else { WELCOME_EMPTY };
    messages.push(Message::with_id(WELCOME_ID, MessageRole::Assistant, welcome));
    messages
}
