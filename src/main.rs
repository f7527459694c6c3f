mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bus_compressor=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let preset_path = cli.preset.as_deref();

    match cli.command {
        Commands::Process {
            inputs,
            output,
            out_dir,
            params,
        } => {
            let preset = cli::resolve_preset(preset_path, &params)?;
            let report = cli::process(&inputs, output.as_deref(), out_dir.as_deref(), &preset)?;
            if !report.is_success() {
                anyhow::bail!("{} of the inputs failed to process", report.failed.len());
            }
        }
        Commands::Analyze {
            input,
            format,
            meter_interval,
            meter_width,
            no_meter,
            params,
        } => {
            let preset = cli::resolve_preset(preset_path, &params)?;
            cli::analyze(&input, &preset, &format, meter_interval, meter_width, !no_meter)?;
        }
        Commands::Play { input, params } => {
            let preset = cli::resolve_preset(preset_path, &params)?;
            cli::play(&input, &preset)?;
        }
        Commands::Preset { output, params } => {
            let preset = cli::resolve_preset(preset_path, &params)?;
            cli::write_preset(&preset, output.as_deref())?;
        }
    }

    Ok(())
}
