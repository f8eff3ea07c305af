//! tags – command-line price-label generator.
//!
//! Usage:
//!   tags export <sheet.json> [-o labels.pdf] [--images DIR] [--template NAME]
//!   tags preview <sheet.json> [--index N] [-o label.png] [--font FILE.ttf]
//!
//! The sheet is a JSON array of rows, header row first. If `-o` is omitted
//! the output is written next to the sheet with the same stem.

use std::{fs, path::Path, path::PathBuf, process};

use clap::{Args, Parser, Subcommand};

use price_tags::fonts::{FontManager, Weight};
use price_tags::images::ImageCache;
use price_tags::pipeline::{generate_pdf, products_from_sheet, PipelineConfig};
use price_tags::preview::PreviewSession;
use price_tags::sheet::{ColumnMapping, Field};
use price_tags::{LabelError, Template};

/// tags - Barcode price labels from product sheets
#[derive(Parser, Debug)]
#[command(name = "tags")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every product to a paginated PDF sheet
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output PDF (default: sheet stem with .pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Document title in PDF metadata (default: sheet filename stem)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Render one label to a PNG
    Preview {
        #[command(flatten)]
        input: InputArgs,

        /// Product position in the sheet (0-based, wraps around)
        #[arg(long, default_value = "0")]
        index: usize,

        /// Output PNG (default: sheet stem with the index appended)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// TTF face replacing the built-in Helvetica for preview text
        #[arg(long, value_name = "FILE")]
        font: Option<PathBuf>,

        /// TTF face for bold text (default: --font)
        #[arg(long, value_name = "FILE")]
        bold_font: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// JSON cell grid, header row first
    sheet: PathBuf,

    /// Folder of `<reference>.png|jpg` product photos
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// compact, branded-image or branded-no-image
    #[arg(long)]
    template: Option<Template>,

    /// JSON pipeline config (grid, style, column mapping)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Header of the barcode column
    #[arg(long)]
    barcode_column: Option<String>,

    /// Header of the quantity column
    #[arg(long)]
    quantity_column: Option<String>,

    /// Header of the price column
    #[arg(long)]
    price_column: Option<String>,

    /// Header of the designation column
    #[arg(long)]
    designation_column: Option<String>,

    /// Header of the reference column
    #[arg(long)]
    reference_column: Option<String>,
}

impl InputArgs {
    /// Load the config file and apply command-line overrides on top.
    fn config(&self) -> Result<PipelineConfig, LabelError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json(&read(path)?)?,
            None => PipelineConfig::default(),
        };
        if let Some(template) = self.template {
            config.template = template;
        }

        let overrides = [
            (Field::Barcode, &self.barcode_column),
            (Field::Quantity, &self.quantity_column),
            (Field::Price, &self.price_column),
            (Field::Designation, &self.designation_column),
            (Field::Reference, &self.reference_column),
        ];
        if overrides.iter().any(|(_, v)| v.is_some()) {
            let mapping = config.mapping.get_or_insert_with(ColumnMapping::default);
            for (field, header) in overrides {
                if let Some(header) = header {
                    mapping.set(field, header.as_str());
                }
            }
        }
        Ok(config)
    }

    fn images(&self) -> Result<ImageCache, LabelError> {
        match &self.images {
            Some(dir) => ImageCache::load_dir(dir),
            None => Ok(ImageCache::new()),
        }
    }

    fn stem(&self) -> String {
        self.sheet
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("labels")
            .to_string()
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), LabelError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            title,
        } => {
            let mut config = input.config()?;
            config.title = title.unwrap_or_else(|| input.stem());
            let mapped = products_from_sheet(&read(&input.sheet)?, &config)?;
            let images = input.images()?;

            let (bytes, report) = generate_pdf(&mapped.products, &images, &config)?;
            let output = output.unwrap_or_else(|| input.sheet.with_extension("pdf"));
            write(&output, &bytes)?;

            eprintln!(
                "Wrote '{}' ({} bytes, {} label{} on {} page{}, {} row{} skipped)",
                output.display(),
                bytes.len(),
                report.labels,
                plural(report.labels),
                report.pages,
                plural(report.pages),
                mapped.skipped.len(),
                plural(mapped.skipped.len()),
            );
        }
        Commands::Preview {
            input,
            index,
            output,
            font,
            bold_font,
        } => {
            let config = input.config()?;
            let mapped = products_from_sheet(&read(&input.sheet)?, &config)?;
            let images = input.images()?;

            let mut fonts = FontManager::builtin();
            if let Some(path) = &font {
                fonts.load_font(Weight::Regular, read_bytes(path)?)?;
            }
            if let Some(path) = &bold_font {
                fonts.load_font(Weight::Bold, read_bytes(path)?)?;
            }

            let mut session = PreviewSession::new(&mapped.products, config.template);
            session.style = config.style.clone();
            session.geometry = config.geometry;
            session.select(index);

            let bitmap = session
                .render(&images, fonts)?
                .ok_or(LabelError::NoProducts)?;
            let output = output.unwrap_or_else(|| {
                input
                    .sheet
                    .with_file_name(format!("{}-{}.png", input.stem(), session.index()))
            });
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            bitmap
                .save(&output)
                .map_err(|e| LabelError::Export(format!("{}: {e}", output.display())))?;

            eprintln!(
                "Wrote '{}' ({}x{} px, label {}/{})",
                output.display(),
                bitmap.width(),
                bitmap.height(),
                session.index() + 1,
                session.len()
            );
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, LabelError> {
    fs::read_to_string(path).map_err(|source| LabelError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, LabelError> {
    fs::read(path).map_err(|source| LabelError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), LabelError> {
    // Create output directory if necessary.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)
        .map_err(|e| LabelError::Export(format!("writing '{}': {e}", path.display())))
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
