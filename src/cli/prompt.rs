//! Terminal interaction: confirmations, content sources, the editor

use std::fs;
use std::io::Read;

use anyhow::{Context, Result};
use dialoguer::{Confirm, Editor};

/// Asks for confirmation unless `assume_yes` is set
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation (use --yes in non-interactive mode)")
}

/// Reads content from a file path, or from standard input for `-`
pub fn read_content_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read content from standard input")?;
        return Ok(content);
    }

    fs::read_to_string(source).with_context(|| format!("Failed to read content file: {}", source))
}

/// Opens `content` in the editor; `None` if the editor left it unsaved
pub fn edit(content: &str, editor: Option<&str>) -> Result<Option<String>> {
    let mut session = Editor::new();
    if let Some(editor) = editor {
        session.executable(editor);
    }
    session.extension(".html");

    session
        .edit(content)
        .context("Failed to run the editor")
}
