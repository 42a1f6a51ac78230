//! Prompt construction.

/// Build the generation prompt for a task description.
///
/// The task is embedded verbatim: no escaping, trimming or length limit.
pub fn build_prompt(task: &str) -> String {
    format!(
        r#"You are a command line expert. Given a task description, provide the exact command or series of commands to accomplish it. Only output the commands, no explanations.

Task: {}

Commands:"#,
        task
    )
}
