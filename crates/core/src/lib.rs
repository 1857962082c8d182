//! Folio editing engine
//!
//! Annotation and page-geometry editing over loaded PDF and image pages.
//! Everything is owned by one [`EditorSession`]; output goes through the
//! `pdf-engine` collaborators.

pub mod annotation;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod fonts;
pub mod geometry;
pub mod history;
pub mod images;
pub mod ingest;
pub mod interaction;
pub mod manipulation;
pub mod notice;
pub mod pages;
pub mod renderer;
pub mod script;
pub mod session;
pub mod stamps;
pub mod surface;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationMap, Color, PageNumber,
    SignatureAnnotation, SignatureRole, TextAnnotation, Watermark, Whiteout,
};
pub use config::{ConfigError, EditorConfig, TextDefaults};
pub use document::{Document, PageEntry, PageId, SourceDocument, SourceId};
pub use error::{EditorError, EditorResult};
pub use export::{build_output, build_selected, ExportError, ExportOutcome, PageProjection};
pub use fonts::{FontFamily, FontMetrics, StandardFontMetrics};
pub use geometry::{Corner, Point, PointerEvent, PointerKind, Rect, SurfaceLayout};
pub use images::{ImageId, ImageRegistry};
pub use ingest::IncomingFile;
pub use interaction::{Cursor, InteractionState, Redraw, Response, TextStyleUpdate, Tool, ZoomStep};
pub use notice::{Notice, NoticeLevel};
pub use script::{apply_script, parse_script, EditAction, ScriptError, ScriptReport};
pub use session::{EditorSession, HistoryStack, IngestReport};
pub use stamps::{PageNumberOptions, PageNumberPosition, WatermarkOptions};
pub use surface::{RasterSurface, Surface};
