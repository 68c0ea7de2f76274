//! Prompt assembly for the text endpoint

/// Trailing cue the model completes
pub const ASSISTANT_CUE: &str = "Assistant:";

/// Build the composite prompt sent to the provider.
///
/// Sections always appear as System, Context, User, separated by a blank
/// line, and end with the assistant cue. An empty system message or an
/// empty context list is treated as absent.
pub fn assemble_prompt(system_message: Option<&str>, context_texts: &[String], prompt: &str) -> String {
    let mut full_prompt = String::new();

    if let Some(system) = system_message.filter(|s| !s.is_empty()) {
        full_prompt.push_str("System: ");
        full_prompt.push_str(system);
        full_prompt.push_str("\n\n");
    }

    if !context_texts.is_empty() {
        full_prompt.push_str("Context:\n");
        full_prompt.push_str(&context_texts.join("\n"));
        full_prompt.push_str("\n\n");
    }

    full_prompt.push_str("User: ");
    full_prompt.push_str(prompt);
    full_prompt.push_str("\n\n");
    full_prompt.push_str(ASSISTANT_CUE);

    full_prompt
}
