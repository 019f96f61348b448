use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use hydra_tweak::analyzer::{EvalRange, Position, SourceBlock};
use hydra_tweak::config::TweakConfig;
use hydra_tweak::controls::{ControlValue, ControlView};
use hydra_tweak::error::ParseError;
use hydra_tweak::formatter::{format_number, Replacement};
use hydra_tweak::Report;

#[derive(Parser)]
#[command(name = "hydra-tweak", version)]
#[command(about = "Live controls for the numbers in a Hydra sketch")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the literals of a sketch and the controls they bind to
    Analyze {
        /// Input sketch (.js)
        file: PathBuf,

        /// Only literals inside LINE:COL-LINE:COL (1-based)
        #[arg(long, value_parser = parse_range)]
        range: Option<EvalRange>,

        /// Print a JSON report instead of a table
        #[arg(long)]
        json: bool,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Rewrite literals by site index, e.g. `0=20 3=0.5 1="() => time"`
    Set {
        /// Input sketch (.js)
        file: PathBuf,

        /// SITE=VALUE pairs; a value that is not a number is inserted verbatim
        #[arg(required = true, value_parser = parse_edit)]
        edits: Vec<(usize, Replacement)>,

        /// Write output to file instead of stdout
        #[arg(short)]
        o: Option<PathBuf>,

        /// Overwrite the input file
        #[arg(long, conflicts_with = "o")]
        in_place: bool,
    },

    /// Bind a sketch file to terminal controls and write edits back to it
    Live {
        /// Sketch file to watch and rewrite
        file: PathBuf,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            range,
            json,
            config,
        } => {
            let config = load_config(config.as_deref()).unwrap_or_else(|e| fail(e));
            let source = read_source(&file);
            let block = SourceBlock::document(source.as_str());
            let analyzer = config.analyzer();
            let result = match range {
                Some(range) => analyzer.analyze_in(block, range),
                None => analyzer.analyze(block),
            };
            let analysis = match result {
                Ok(a) => a,
                Err(e) => {
                    print_error(&e, &source);
                    process::exit(1);
                }
            };

            let report = Report::new(&analysis, &config.panel_title);
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(e) => fail(e.into()),
                }
            } else {
                print_report(&report);
            }
        }

        Commands::Set {
            file,
            edits,
            o,
            in_place,
        } => {
            let source = read_source(&file);
            let edits: BTreeMap<usize, Replacement> = edits.into_iter().collect();
            let analysis = match hydra_tweak::analyze_source(&source) {
                Ok(a) => a,
                Err(e) => {
                    print_error(&e, &source);
                    process::exit(1);
                }
            };
            for site in edits.keys().filter(|site| analysis.site(**site).is_none()) {
                eprintln!(
                    "warning: no literal #{site} ({} in file)",
                    analysis.sites.len()
                );
            }
            let output = analysis.rewrite(&edits);

            let target = if in_place { Some(file) } else { o };
            match target {
                Some(path) => {
                    if let Err(e) = fs::write(&path, &output) {
                        eprintln!("error: cannot write '{}': {e}", path.display());
                        process::exit(1);
                    }
                    eprintln!("wrote {} ({} bytes)", path.display(), output.len());
                }
                None => print!("{output}"),
            }
        }

        Commands::Live { file, config } => {
            let config = load_config(config.as_deref()).unwrap_or_else(|e| fail(e));
            let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| fail(e.into()));
            rt.block_on(async {
                if let Err(e) = hydra_tweak::live::run(&file, &config).await {
                    eprintln!("error: live session failed: {e}");
                    process::exit(1);
                }
            });
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TweakConfig> {
    match path {
        Some(path) => TweakConfig::from_path(path)
            .with_context(|| format!("cannot load config '{}'", path.display())),
        None => Ok(TweakConfig::default()),
    }
}

fn read_source(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {e}", path.display());
            process::exit(1);
        }
    }
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!("error: {e:#}");
    process::exit(1);
}

fn parse_range(text: &str) -> Result<EvalRange, String> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| format!("expected LINE:COL-LINE:COL, got `{text}`"))?;
    Ok(EvalRange::new(parse_position(start)?, parse_position(end)?))
}

fn parse_position(text: &str) -> Result<Position, String> {
    let (line, column) = text
        .split_once(':')
        .ok_or_else(|| format!("expected LINE:COL, got `{text}`"))?;
    let line: u32 = line.trim().parse().map_err(|_| format!("bad line `{line}`"))?;
    let column: u32 = column
        .trim()
        .parse()
        .map_err(|_| format!("bad column `{column}`"))?;
    if line == 0 || column == 0 {
        return Err("lines and columns start at 1".into());
    }
    Ok(Position::new(line - 1, column - 1))
}

fn parse_edit(text: &str) -> Result<(usize, Replacement), String> {
    let (site, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected SITE=VALUE, got `{text}`"))?;
    let site = site
        .trim()
        .parse()
        .map_err(|_| format!("bad site index `{site}`"))?;
    let replacement = match value.trim().parse::<f64>() {
        Ok(v) => Replacement::Number(v),
        Err(_) => Replacement::Expression(value.to_string()),
    };
    Ok((site, replacement))
}

fn print_report(report: &Report) {
    println!("literals:");
    for (site, param) in report.sites.iter().zip(&report.parameters) {
        let at = format!("{}:{}", site.line + 1, site.column + 1);
        println!(
            "  #{:<3} {at:<8} {:<8} {}.{} ({:?})",
            param.site_index, site.raw, param.function, param.name, param.param_type
        );
    }
    println!("controls:");
    for binding in &report.controls {
        let value = match binding.display {
            ControlValue::Color { r, g, b } => format!(
                "rgb({}, {}, {})",
                format_number(r),
                format_number(g),
                format_number(b)
            ),
            ControlValue::Point { x, y } => {
                format!("({}, {})", format_number(x), format_number(y))
            }
            ControlValue::Number(v) | ControlValue::Choice(v) => format_number(v),
        };
        let view = match &binding.view {
            ControlView::Color => "color".to_string(),
            ControlView::Point { min, max } => format!("pad {min}..{max}"),
            ControlView::Number(r) => format!("{}..{} step {}", r.min, r.max, r.step),
            ControlView::Select { options } => format!("select {options:?}"),
        };
        let sites: Vec<String> = binding.group.site_indices().map(|i| format!("#{i}")).collect();
        println!(
            "  {:<12} {value:<22} {view:<24} {}",
            binding.group.label,
            sites.join(" ")
        );
    }
}

fn print_error(e: &ParseError, source: &str) {
    eprintln!("error: {e}");

    if let Some(span) = &e.span {
        if span.start <= source.len() && source.is_char_boundary(span.start) {
            let line_num = source[..span.start].chars().filter(|c| *c == '\n').count() + 1;
            let line_start = source[..span.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let line_end = source[span.start..]
                .find('\n')
                .map(|i| span.start + i)
                .unwrap_or(source.len());
            let line = &source[line_start..line_end];
            let col = source[line_start..span.start].chars().count();

            eprintln!();
            eprintln!("  {line_num} | {line}");
            eprintln!(
                "  {} | {}^",
                " ".repeat(line_num.to_string().len()),
                " ".repeat(col)
            );
        }
    }
}
