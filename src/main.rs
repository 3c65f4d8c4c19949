use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use docxide_tree::export::{self, ExportFormat};
use docxide_tree::{ConvertOptions, Error};

#[derive(Parser)]
#[command(name = "docxide-tree", version)]
#[command(about = "Extract the reading-order document tree from a DOCX file")]
struct Cli {
    /// Input DOCX file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "markdown")]
    format: ExportFormat,

    /// Truncate node text in the indented text format
    #[arg(long, default_value = "70")]
    max_text_len: usize,

    /// Maximum nesting through table cells and text boxes
    #[arg(long)]
    max_depth: Option<usize>,

    /// Do not append footnotes after the body
    #[arg(long)]
    no_footnotes: bool,
}

fn run(cli: &Cli) -> Result<(), Error> {
    let mut options = ConvertOptions {
        include_footnotes: !cli.no_footnotes,
        ..ConvertOptions::default()
    };
    if let Some(depth) = cli.max_depth {
        options.max_nesting_depth = depth;
    }

    let conversion = docxide_tree::convert_docx_with(&cli.input, &options)?;
    for diagnostic in &conversion.diagnostics {
        match &diagnostic.provenance {
            Some(p) => log::warn!(
                "{:?}: {} ({} <{}> at byte {})",
                diagnostic.kind,
                diagnostic.message,
                p.part,
                p.element,
                p.offset
            ),
            None => log::warn!("{:?}: {}", diagnostic.kind, diagnostic.message),
        }
    }

    let rendered = export::export(&conversion.document, cli.format, cli.max_text_len)?;
    match &cli.output {
        Some(path) => std::fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error converting {}: {e}", cli.input.display());
            ExitCode::FAILURE
        }
    }
}
