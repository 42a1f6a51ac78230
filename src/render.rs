//! Terminal markdown rendering.
//!
//! Built-in styles map onto termimad's skins. A style sheet is a termimad
//! skin written as YAML, each entry a compound style string:
//!
//! ```yaml
//! headers: "#ff8700"
//! bold: "yellow"
//! inline_code: "ansi(229) #303030"
//! bullet: "▸ cyan"
//! ```

use crate::config::StyleSource;
use std::path::{Path, PathBuf};
use termimad::MadSkin;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure to set up rendering. Never fatal: callers fall back to raw text.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read style file {}: {source}", .path.display())]
    ReadStyle {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse style file {}: {source}", .path.display())]
    ParseStyle {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Markdown renderer bound to a skin and a wrap width.
pub struct TermRenderer {
    skin: MadSkin,
    width: usize,
}

impl TermRenderer {
    /// Build a renderer for the given style.
    pub fn new(style: &StyleSource, width: usize) -> Result<Self, RenderError> {
        let skin = match style {
            StyleSource::File(path) => load_style_sheet(path)?,
            builtin => builtin_skin(builtin),
        };
        Ok(Self { skin, width })
    }

    /// Render markdown into wrapped, styled terminal text.
    pub fn render(&self, markdown: &str) -> String {
        self.skin.text(markdown, Some(self.width)).to_string()
    }
}

/// Render the response, or hand it back untouched if no renderer is available.
pub fn render_or_raw(renderer: Result<TermRenderer, RenderError>, text: &str) -> String {
    match renderer {
        Ok(renderer) => renderer.render(text),
        Err(e) => {
            warn!("Rendering unavailable, printing raw output: {}", e);
            text.to_string()
        }
    }
}

fn builtin_skin(style: &StyleSource) -> MadSkin {
    match style {
        StyleSource::Auto => {
            if atty::is(atty::Stream::Stdout) {
                MadSkin::default_dark()
            } else {
                MadSkin::no_style()
            }
        }
        StyleSource::Dark => MadSkin::default_dark(),
        StyleSource::Light => MadSkin::default_light(),
        StyleSource::NoTty | StyleSource::File(_) => MadSkin::no_style(),
    }
}

fn load_style_sheet(path: &Path) -> Result<MadSkin, RenderError> {
    debug!("Loading style sheet {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|source| RenderError::ReadStyle {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(MadSkin::default());
    }
    serde_yaml::from_str::<MadSkin>(&contents).map_err(|source| RenderError::ParseStyle {
        path: path.to_path_buf(),
        source,
    })
}
