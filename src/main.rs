use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{Term, measure_text_width, style};
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf::{
    Config, ConversionProgress, ConvertOptions, FileOutcome, OutputFormat, SourceFile, Theme,
    ThemeRegistry, convert_tree,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "md2pdf", version)]
#[command(about = "Convert Markdown files to beautifully styled PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recursively convert a directory of Markdown files to PDFs
    Convert(ConvertArgs),
    /// List all available themes with descriptions
    Themes,
}

#[derive(Args)]
struct ConvertArgs {
    /// Directory containing Markdown files to convert
    input_dir: PathBuf,

    /// Directory to save the generated files
    output_dir: PathBuf,

    /// Theme to use for styling (see `md2pdf themes`)
    #[arg(short, long)]
    theme: Option<String>,

    /// Config file (defaults to md2pdf.toml in the input directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Pdf)]
    format: Format,

    /// Exit with an error if any file fails to convert
    #[arg(long)]
    strict: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// Print debug logs
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pdf,
    Html,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pdf => OutputFormat::Pdf,
            Format::Html => OutputFormat::Html,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", style("Error").red().bold());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => convert(args),
        Commands::Themes => {
            list_themes(&ThemeRegistry::builtin()?);
            Ok(())
        }
    }
}

fn convert(args: ConvertArgs) -> Result<()> {
    // The bar is the feedback while it is visible; keep info logs out of its way
    let show_progress = !args.quiet && Term::stderr().is_term();
    let filter = if args.verbose {
        "debug"
    } else if args.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    run_convert(&args, show_progress)
}

/// One conversion run; errors decide the exit code.
fn run_convert(args: &ConvertArgs, show_progress: bool) -> Result<()> {
    let config = Config::discover(args.config.as_deref(), &args.input_dir)
        .context("Failed to load configuration")?;
    let options = ConvertOptions {
        theme: args.theme.clone(),
        config,
        format: args.format.into(),
    };

    let progress = CliProgress::new(&args.output_dir, show_progress, args.quiet);
    let report = convert_tree(&args.input_dir, &args.output_dir, &options, &progress)?;
    progress.finish();

    if report.is_empty() {
        if !args.quiet {
            println!(
                "{}",
                style("No markdown files found in the specified directory.").yellow()
            );
        }
        return Ok(());
    }

    let failed = report.failed().count();
    if !args.quiet {
        println!();
        if failed == 0 {
            println!(
                "{} Files saved to: {}",
                style("✓ Done!").green().bold(),
                style(args.output_dir.display()).cyan()
            );
        } else {
            println!(
                "{} {} of {} files converted, saved to: {}",
                style("⚠ Done with errors.").yellow().bold(),
                report.succeeded(),
                report.outcomes.len(),
                style(args.output_dir.display()).cyan()
            );
        }
    }

    if args.strict && failed > 0 {
        bail!("{failed} file(s) failed to convert");
    }
    Ok(())
}

/// Summary panel, progress bar and per-file failure lines.
struct CliProgress {
    bar: ProgressBar,
    output: PathBuf,
    quiet: bool,
}

impl CliProgress {
    fn new(output: &Path, show_bar: bool, quiet: bool) -> Self {
        let bar = if show_bar {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message("Converting...");
        Self {
            bar,
            output: output.to_path_buf(),
            quiet,
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Print above the bar, or straight to the terminal when it is hidden.
    fn print(&self, line: String) {
        if self.bar.is_hidden() {
            eprintln!("{line}");
        } else {
            self.bar.println(line);
        }
    }
}

impl ConversionProgress for CliProgress {
    fn on_start(&self, total: usize, theme: &Theme) {
        self.bar.set_length(total as u64);
        if !self.quiet {
            self.print(panel(
                "MD2PDF Conversion",
                &[
                    format!("{} {}", style("Theme:").bold(), theme.name),
                    format!("{} {} markdown files", style("Files:").bold(), total),
                    format!("{} {}", style("Output:").bold(), self.output.display()),
                ],
            ));
        }
    }

    fn on_file_start(&self, source: &SourceFile) {
        self.bar
            .set_message(format!("Converting {}", source.relative.display()));
    }

    fn on_file_done(&self, outcome: &FileOutcome) {
        if let Err(e) = &outcome.result {
            let line = format!(
                "{} {}: {e}",
                style(format!("Error converting {}", outcome.source.relative.display()))
                    .red()
                    .bold(),
                outcome.output.display()
            );
            self.print(line);
        }
        self.bar.inc(1);
    }
}

fn list_themes(registry: &ThemeRegistry) {
    let width = registry
        .names()
        .map(str::len)
        .max()
        .unwrap_or(0)
        .max("Theme".len());

    println!("{}", style("Available Themes").bold());
    println!();
    println!(
        "{}  {}",
        style(format!("{:<width$}", "Theme")).cyan().bold(),
        style("Description").magenta().bold()
    );
    for theme in registry.list() {
        println!(
            "{}  {}",
            style(format!("{:<width$}", theme.name)).cyan(),
            theme.description
        );
    }
    println!();
    println!(
        "{}",
        style("Use a theme with: md2pdf convert INPUT_DIR OUTPUT_DIR --theme THEME_NAME").dim()
    );
}

/// A box around `lines` with `title` set in the top border.
fn panel(title: &str, lines: &[String]) -> String {
    let inner = lines
        .iter()
        .map(|l| measure_text_width(l))
        .chain([measure_text_width(title) + 2])
        .max()
        .unwrap_or(0);

    let border = |s: &str| style(s.to_string()).blue().to_string();
    let title_fill = inner - measure_text_width(title);
    let mut out = format!(
        "{} {} {}\n",
        border("╭─"),
        style(title).bold(),
        border(&format!("{}╮", "─".repeat(title_fill - 1)))
    );
    for line in lines {
        let pad = inner - measure_text_width(line);
        out.push_str(&format!(
            "{} {}{} {}\n",
            border("│"),
            line,
            " ".repeat(pad),
            border("│")
        ));
    }
    out.push_str(&border(&format!("╰{}╯", "─".repeat(inner + 2))));
    out
}
