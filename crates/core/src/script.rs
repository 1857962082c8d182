//! Edit scripts
//!
//! A JSON list of [`EditAction`]s replayed against a session, so the engine
//! can be driven without an interactive host. Positions and sizes in a
//! script are displayed document units; they are converted to the page's
//! raster pixels before they reach the session.

use crate::annotation::{Annotation, Color, SignatureRole, TextAnnotation};
use crate::error::{EditorError, EditorResult};
use crate::geometry::{Point, Rect};
use crate::interaction::PendingSignature;
use crate::session::{EditorSession, HistoryStack};
use crate::stamps::{PageNumberOptions, WatermarkOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    AddWhiteout {
        page: usize,
        rect: Rect,
    },
    AddText {
        page: usize,
        /// Baseline start of the first line.
        x: f32,
        y: f32,
        text: String,
        #[serde(default)]
        font_size: Option<f32>,
        #[serde(default)]
        font_family: Option<String>,
        #[serde(default)]
        bold: bool,
        #[serde(default)]
        italic: bool,
        #[serde(default)]
        color: Option<Color>,
    },
    /// Places an image centered on `center`; relative paths resolve
    /// against the script's directory.
    AddSignature {
        page: usize,
        image: PathBuf,
        center: Point,
        #[serde(default)]
        role: SignatureRole,
    },
    Watermark(WatermarkOptions),
    PageNumbers(PageNumberOptions),
    MovePage {
        from: usize,
        to: usize,
    },
    RotatePage {
        page: usize,
        degrees: i32,
    },
    DeletePage {
        page: usize,
    },
    DuplicatePage {
        page: usize,
    },
    Undo {
        stack: HistoryStack,
    },
    Redo {
        stack: HistoryStack,
    },
}

impl EditAction {
    pub fn name(&self) -> &'static str {
        match self {
            EditAction::AddWhiteout { .. } => "add_whiteout",
            EditAction::AddText { .. } => "add_text",
            EditAction::AddSignature { .. } => "add_signature",
            EditAction::Watermark(_) => "watermark",
            EditAction::PageNumbers(_) => "page_numbers",
            EditAction::MovePage { .. } => "move_page",
            EditAction::RotatePage { .. } => "rotate_page",
            EditAction::DeletePage { .. } => "delete_page",
            EditAction::DuplicatePage { .. } => "duplicate_page",
            EditAction::Undo { .. } => "undo",
            EditAction::Redo { .. } => "redo",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("invalid edit script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("action {index} ({action}) failed: {source}")]
    Action {
        index: usize,
        action: &'static str,
        #[source]
        source: EditorError,
    },
    #[error("action {index}: cannot read {}: {source}", path.display())]
    Image {
        index: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub applied: usize,
}

pub fn parse_script(json: &str) -> Result<Vec<EditAction>, ScriptError> {
    Ok(serde_json::from_str(json)?)
}

/// Applies `actions` in order, stopping at the first failure. Actions
/// applied before the failure stay applied.
pub fn apply_script(
    session: &mut EditorSession,
    actions: &[EditAction],
    base_dir: &Path,
) -> Result<ScriptReport, ScriptError> {
    for (index, action) in actions.iter().enumerate() {
        let image_bytes = match action {
            EditAction::AddSignature { image, .. } => {
                let path = base_dir.join(image);
                let bytes = std::fs::read(&path)
                    .map_err(|source| ScriptError::Image { index, path, source })?;
                Some(bytes)
            }
            _ => None,
        };
        apply_action(session, action, image_bytes.as_deref()).map_err(|source| {
            ScriptError::Action { index, action: action.name(), source }
        })?;
        tracing::debug!(index, action = action.name(), "edit applied");
    }
    tracing::info!(actions = actions.len(), "edit script applied");
    Ok(ScriptReport { applied: actions.len() })
}

fn apply_action(
    session: &mut EditorSession,
    action: &EditAction,
    image_bytes: Option<&[u8]>,
) -> EditorResult<()> {
    match action {
        EditAction::AddWhiteout { page, rect } => {
            let scale = session.page_scale(*page)?;
            let rect = Rect::new(
                rect.x * scale,
                rect.y * scale,
                rect.width * scale,
                rect.height * scale,
            );
            session.add_annotation(*page, Annotation::whiteout(rect))?;
        }
        EditAction::AddText { page, x, y, text, font_size, font_family, bold, italic, color } => {
            if text.trim().is_empty() {
                return Err(EditorError::InvalidOperation("text is empty".to_owned()));
            }
            let scale = session.page_scale(*page)?;
            let defaults = session.text_style().clone();
            let requested = font_size.unwrap_or(defaults.font_size) * scale;
            let size = session.config().clamp_font_size(requested);
            session.add_annotation(
                *page,
                Annotation::text(TextAnnotation {
                    x: x * scale,
                    y: y * scale,
                    text: text.clone(),
                    font_size: size,
                    font_family: font_family
                        .clone()
                        .unwrap_or_else(|| defaults.font_family.name().to_owned()),
                    bold: *bold,
                    italic: *italic,
                    color: color.unwrap_or(defaults.color),
                }),
            )?;
        }
        EditAction::AddSignature { page, center, role, .. } => {
            let bytes = image_bytes.ok_or_else(|| {
                EditorError::InvalidOperation("signature image was not loaded".to_owned())
            })?;
            let scale = session.page_scale(*page)?;
            let image = session.images.register(bytes)?;
            let aspect_ratio = session.images.require(image)?.aspect_ratio();
            let point = Point::new(center.x * scale, center.y * scale);
            session.place_signature(
                *page,
                point,
                PendingSignature { image, role: *role, aspect_ratio },
            )?;
        }
        EditAction::Watermark(options) => {
            session.watermark_all_pages(options)?;
        }
        EditAction::PageNumbers(options) => {
            session.add_page_numbers(options)?;
        }
        EditAction::MovePage { from, to } => session.move_page(*from, *to)?,
        EditAction::RotatePage { page, degrees } => session.rotate_page(*page, *degrees)?,
        EditAction::DeletePage { page } => session.delete_page(*page)?,
        EditAction::DuplicatePage { page } => {
            session.duplicate_page(*page)?;
        }
        EditAction::Undo { stack } => {
            if !session.undo(*stack)? {
                return Err(EditorError::EmptyHistory("undo"));
            }
        }
        EditAction::Redo { stack } => {
            if !session.redo(*stack)? {
                return Err(EditorError::EmptyHistory("redo"));
            }
        }
    }
    Ok(())
}
