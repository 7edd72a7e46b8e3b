use clap::Parser;
use ux_overlay::cli::commands::{OllamaSettings, cmd_audit, cmd_compare, cmd_project};
use ux_overlay::cli::config::{Cli, Commands, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    // Resolve Ollama settings: CLI > config > defaults
    let ollama = OllamaSettings::resolve(
        &config,
        cli.ollama_endpoint.as_deref(),
        cli.ollama_model.as_deref(),
    );

    match cli.command {
        Commands::Audit {
            url,
            force,
            analyzer,
        } => {
            cmd_audit(&url, force, &analyzer, &config, &ollama, cli.verbose)?;
        }
        Commands::Project {
            report,
            hidden,
            width,
            output,
        } => {
            cmd_project(&report, hidden, width, &output, &config, cli.verbose)?;
        }
        Commands::Compare {
            old,
            new,
            screenshot,
            analyzer,
        } => {
            let same = cmd_compare(
                &old,
                &new,
                screenshot.as_deref(),
                &analyzer,
                &config,
                &ollama,
                cli.verbose,
            )?;
            if !same {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
