mod cli;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use hf_av::{EncodeProgress, LadderRequest, ToolRegistry};
use hf_core::config::Config;
use hf_media::DEFAULT_BOUNDARY_TOLERANCE;

fn main() -> Result<()> {
    // Argument errors exit 1; help and version exit 0 the usual way.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlsforge=debug,hf_av=debug,hf_media=debug,hf_core=debug".to_string()
        } else {
            "hlsforge=info,hf_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Convert {
            input,
            output_dir,
            segment_duration,
            preset,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(config, input, output_dir, segment_duration, preset))
        }
        Commands::FixPaths { dir } => fix_paths(&dir),
        Commands::Verify { master } => verify(&master),
        Commands::CheckTools => check_tools(&config),
        Commands::Version => {
            println!("hlsforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Config {
    let config = Config::load_or_default(path);
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }
    config
}

async fn convert(
    config: Config,
    input: PathBuf,
    output_dir: Option<PathBuf>,
    segment_duration: Option<u32>,
    preset: Option<String>,
) -> Result<()> {
    let mut encode = config.encode;
    if let Some(secs) = segment_duration {
        encode.segment_duration_secs = secs;
    }
    if let Some(preset) = preset {
        encode.video_preset = preset;
    }

    let tools = ToolRegistry::discover(&config.tools);
    let request = LadderRequest::new(input, output_dir, encode);

    // Dropping the encode future kills ffmpeg.
    let output = tokio::select! {
        result = hf_av::segment_source(&tools, &request, print_progress, None) => result?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("Interrupted"),
    };

    println!("Master: {}", output.master_path.display());
    println!(
        "Renditions: {} ({} segments each, max drift {:.3}s)",
        output.segment_counts.len(),
        output.alignment.min_segments,
        output.alignment.max_drift
    );
    if output.normalize.changed() {
        println!("Rewrote {} playlist(s) to relative paths", output.normalize.fixed.len());
    }

    Ok(())
}

fn print_progress(update: &EncodeProgress) {
    let speed = update.speed.as_deref().unwrap_or("-");
    match update.pct {
        Some(pct) => eprintln!("Encoding: {:5.1}% (speed {speed})", pct * 100.0),
        None => eprintln!("Encoding: {:.1}s (speed {speed})", update.out_time_secs),
    }
}

fn fix_paths(dir: &Path) -> Result<()> {
    let layouts = hf_media::discover_layouts(dir)?;
    if layouts.is_empty() {
        println!("No HLS ladders found in {}", dir.display());
        return Ok(());
    }

    let mut fixed = 0;
    let mut correct = 0;
    for layout in &layouts {
        let report = hf_media::normalize_layout(layout)?;
        for path in &report.fixed {
            println!("fixed: {}", path.display());
        }
        fixed += report.fixed.len();
        correct += report.already_correct.len();
    }

    println!(
        "{} ladder(s): {fixed} playlist(s) fixed, {correct} already correct",
        layouts.len()
    );
    Ok(())
}

fn verify(master: &Path) -> Result<()> {
    let report = hf_media::verify_master(master, DEFAULT_BOUNDARY_TOLERANCE)?;

    println!("Master: {}", master.display());
    println!("Variants: {}", report.master.variants.len());

    for bad in &report.unresolved {
        println!("✗ unresolved {} in {}", bad.uri, bad.playlist.display());
    }
    if report.unresolved.is_empty() {
        println!("✓ All references resolve");
    }

    match &report.alignment {
        Ok(a) => println!(
            "✓ {} renditions aligned ({}-{} segments, max drift {:.3}s)",
            a.renditions, a.min_segments, a.max_segments, a.max_drift
        ),
        Err(msg) => println!("✗ Alignment: {msg}"),
    }

    report.into_result()?;
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. ffmpeg is required for convert.");
    }

    Ok(())
}
