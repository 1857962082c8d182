use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_core::{
    apply_script, parse_script, EditorConfig, EditorSession, IncomingFile, Notice, NoticeLevel,
};
use pdf_engine::{default_engine, OpenSource, PdfEngine, ThumbnailSize};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "folio-cli")]
#[command(about = "Folio annotation and page editing CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a thumbnail PNG for a page.
    RenderThumb {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 320)]
        width: u32,
        #[arg(long, default_value_t = 320)]
        height: u32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Load files, replay an edit script and write the result.
    Apply {
        #[arg(long, value_name = "EDITS")]
        script: PathBuf,
        #[arg(long, value_name = "OUT")]
        output: PathBuf,
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    width: f32,
    height: f32,
    rotation: u16,
}

#[derive(Debug, Serialize)]
struct ApplyOutput {
    output: String,
    page_count: usize,
    annotation_count: usize,
    passthrough: bool,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::RenderThumb { file, page, width, height, output } => {
            run_render_thumb(&file, page, width, height, output.as_deref())
        }
        Commands::Apply { script, output, config, files } => {
            run_apply(&script, &output, config.as_deref(), &files)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_file_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let pages = (0..page_count)
        .map(|index| {
            let size = engine.page_size(handle, index)?;
            Ok(PageOutput {
                width: size.width_pt,
                height: size.height_pt,
                rotation: size.rotation,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload = InfoOutput { path: file.display().to_string(), page_count, pages };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    engine.close(handle)?;
    Ok(())
}

fn run_render_thumb(
    file: &Path,
    page: u32,
    width: u32,
    height: u32,
    output: Option<&Path>,
) -> Result<()> {
    ensure_file_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let target = ThumbnailSize { width_px: width, height_px: height };
    let image = engine
        .render_thumbnail(handle, page - 1, 0, target)
        .context("failed to render thumbnail")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_thumbnail_output(file, page));
    create_parent_dir(&output)?;
    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    engine.close(handle)?;
    Ok(())
}

fn run_apply(
    script: &Path,
    output: &Path,
    config: Option<&Path>,
    files: &[PathBuf],
) -> Result<()> {
    let config = match config {
        Some(path) => EditorConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let script_text = fs::read_to_string(script)
        .with_context(|| format!("failed to read edit script {}", script.display()))?;
    let actions = parse_script(&script_text)?;

    let incoming = files
        .iter()
        .map(|path| {
            ensure_file_exists(path)?;
            IncomingFile::read(path).with_context(|| format!("failed to read {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut session = EditorSession::new(config);
    let report = session.add_files(incoming).context("failed to load input files")?;
    log_notices(session.drain_notices());
    if report.pages_added == 0 {
        anyhow::bail!("no pages could be loaded from the input files");
    }

    let base_dir = script.parent().unwrap_or_else(|| Path::new("."));
    let applied = apply_script(&mut session, &actions, base_dir);
    log_notices(session.drain_notices());
    let applied = applied.context("failed to apply edit script")?;
    tracing::info!(actions = applied.applied, "edits applied");

    let outcome = session.export().context("failed to export document")?;
    create_parent_dir(output)?;
    fs::write(output, &outcome.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let payload = ApplyOutput {
        output: output.display().to_string(),
        page_count: outcome.page_count,
        annotation_count: outcome.annotation_count,
        passthrough: outcome.passthrough,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn log_notices(notices: Vec<Notice>) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Warning | NoticeLevel::Error => {
                tracing::warn!(level = ?notice.level, "{}", notice.message)
            }
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!("{}", notice.message),
        }
    }
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn default_thumbnail_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("thumbnail");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
