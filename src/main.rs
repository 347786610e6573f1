//! spectra2scidata: convert JCAMP-DX and RRUFF spectra to and from SciData JSON-LD.

use clap::Parser;
use std::path::Path;

use spectra_scidata::{convert_with, IoFormat};

#[derive(Parser)]
#[command(
    name = "spectra2scidata",
    version,
    about = "Convert JCAMP-DX and RRUFF spectra to and from SciData JSON-LD"
)]
struct Cli {
    /// Input file
    #[arg(short, long)]
    r#in: String,

    /// Output file
    #[arg(short, long)]
    out: String,

    /// Input format (jcamp, rruff, scidata-jsonld); detected from the extension if omitted
    #[arg(long)]
    from: Option<IoFormat>,

    /// Output format; detected from the extension if omitted
    #[arg(long)]
    to: Option<IoFormat>,

    /// Decimal places of written data values
    #[arg(long)]
    precision: Option<usize>,

    /// Cut written data values to this many characters
    #[arg(long)]
    trim: Option<usize>,

    /// Verbose mode
    #[arg(short, long, default_value_t = false)]
    verb: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verb { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    let input = Path::new(&cli.r#in);
    let output = Path::new(&cli.out);

    let to = match cli.to {
        Some(f) => f,
        None => spectra_scidata::detect_format(output)?,
    };
    let mut options = to.write_options();
    if let Some(precision) = cli.precision {
        options.precision = precision;
    }
    if cli.trim.is_some() {
        options.trim = cli.trim;
    }

    let doc = convert_with(input, output, cli.from, Some(to), Some(&options))?;

    if cli.verb {
        let dataset = &doc.graph.scidata.dataset;
        eprintln!("Conversion complete.");
        eprintln!("  Title: {}", doc.graph.title.as_deref().unwrap_or("-"));
        eprintln!("  Data groups: {}", dataset.datagroup.len());
        if let Some(series) = dataset.dataseries.first() {
            eprintln!("  Points: {}", series.parameter.valuearray.numberarray.len());
        }
    }

    log::info!("Wrote {} as {}", output.display(), to);
    Ok(())
}
