// ABOUTME: Main entry point for the slide-bridge program.
// ABOUTME: Provides the CLI interface and runs conversions through the library router.

use anyhow::{anyhow, Context};
use clap::Parser;
use slide_bridge::compose::{available_themes, BUILTIN_THEMES};
use slide_bridge::{utils, Config, MarpCli, Mode, OutputFormat, RgbColor, Router};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Markdown file to convert
    input: Option<PathBuf>,

    /// Output filename without extension (defaults to the input file name)
    #[arg(short, long)]
    output: Option<String>,

    /// Conversion path: auto, fast, precise or hybrid
    #[arg(short, long, default_value = "auto")]
    mode: Mode,

    /// Output format for the fast path: pptx, pdf or html
    #[arg(short, long, default_value = "pptx")]
    format: OutputFormat,

    /// Marp theme to use
    #[arg(short, long)]
    theme: Option<String>,

    /// Directory holding custom theme CSS files
    #[arg(long)]
    theme_dir: Option<PathBuf>,

    /// Existing .pptx deck the precise path appends to
    #[arg(long)]
    template: Option<PathBuf>,

    /// Directory artifacts are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Disable slide pagination
    #[arg(long)]
    no_paginate: bool,

    /// Background color (#rrggbb)
    #[arg(long)]
    bg_color: Option<RgbColor>,

    /// Text color (#rrggbb)
    #[arg(long)]
    text_color: Option<RgbColor>,

    /// Check the Marp CLI installation and exit
    #[arg(long)]
    check_marp: bool,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env();
    if let Some(dir) = cli.theme_dir {
        config.theme_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(color) = cli.bg_color {
        config.palette.background = color;
    }
    if let Some(color) = cli.text_color {
        config.palette.foreground = color;
    }
    if cli.no_paginate {
        config.paginate = false;
    }

    let marp = MarpCli::new(config.marp_path.clone())
        .with_theme_dir(config.theme_dir.clone())
        .with_html(config.enable_html);

    if cli.check_marp {
        match marp.check_installation() {
            Ok(version) => println!("Marp CLI is installed: {}", version),
            Err(e) => {
                println!("Marp CLI is not installed ({})", e);
                println!("To install it, run: npm install -g @marp-team/marp-cli");
            }
        }
        return Ok(());
    }

    if cli.list_themes {
        println!("Available themes:");
        for theme in available_themes(&config.theme_dir)? {
            let kind = if BUILTIN_THEMES.contains(&theme.as_str()) {
                "built-in"
            } else {
                "custom"
            };
            println!("  {:<20} {}", theme, kind);
        }
        return Ok(());
    }

    let input = cli
        .input
        .ok_or_else(|| anyhow!("No input file given. Use --help for usage information."))?;
    let name = cli.output.unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });
    let basename = utils::sanitize_filename(&name);

    utils::validate_directory_writable(&config.output_dir)
        .with_context(|| format!("Cannot write to {:?}", config.output_dir))?;

    let router_config =
        config.get_router_config(&basename, Some(cli.mode), Some(cli.format), cli.theme, cli.template);
    println!(
        "Converting {:?} (mode: {}, format: {}, theme: {})",
        input, router_config.mode, router_config.format, router_config.directives.theme
    );

    let router = Router::new(router_config, marp);
    let output = router
        .convert_file(&input)
        .with_context(|| format!("Failed to convert {:?}", input))?;

    println!("Content category: {}", output.category);
    for artifact in &output.artifacts {
        println!("Output: {:?}", artifact);
    }
    if let Some(markdown) = &output.markdown_path {
        println!("Markdown: {:?}", markdown);
    }
    if let Some(report) = &output.assembly {
        println!(
            "Slides added: {}, charts deferred: {}, elements skipped: {}",
            report.slides_added,
            report.charts_deferred,
            report.skipped.len()
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
