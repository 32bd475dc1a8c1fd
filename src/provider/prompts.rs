//! Prompt text shared by every provider

/// System message for chat-style providers that accept one
pub const ORGANIZER_SYSTEM_PROMPT: &str = "You are an AI assistant that helps organize files.";

/// User prompt asking for an organization structure for `file_paths`
pub fn organization_prompt(file_paths: &[String]) -> String {
    format!(
        "Analyze the following list of files and suggest an efficient organization structure:\n\n{}\n\nProposed organization:",
        file_paths.join("\n")
    )
}
