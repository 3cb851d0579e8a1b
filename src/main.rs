use clap::{Parser, Subcommand};
use std::path::PathBuf;
use webp_variants::factory::BackendKind;
use webp_variants::imaging::ProcessingBackend;
use webp_variants::{config, factory, output, process, remote, scan};

/// Backend selection shared by `run` and `check`.
#[derive(clap::Args, Clone)]
struct BackendArgs {
    /// Backend to use (repeatable). Defaults to `backends` from the config.
    #[arg(long = "backend", value_name = "KIND")]
    backends: Vec<BackendKind>,
}

#[derive(Parser)]
#[command(name = "webp-variants")]
#[command(version)]
#[command(about = "Generate responsive WebP variants from a directory of photos")]
#[command(long_about = "\
Generate responsive WebP variants from a directory of photos

Every image directly inside the input directory is converted into each
configured (category, width) pair, once per selected backend:

  output/
  ├── Tuned/
  │   ├── thumbnails/
  │   │   ├── 200/dawn_thumbnails_200.webp
  │   │   └── 400/dawn_thumbnails_400.webp
  │   └── grid/
  │       └── 800/dawn_grid_800.webp
  └── KrakenSdk/
      └── ...

Backends:
  tuned       local codec, graded sharpening, lossless from quality 85
  basic       local codec, fixed sharpening, always lossy
  kraken      remote service, one upload per variant
  kraken-sdk  remote service, one batch upload per file (sequential)

Remote backends read KRAKEN_API_KEY / KRAKEN_API_SECRET, falling back to
the [kraken] section of the config.

Run 'webp-variants gen-config' to generate a documented variants.toml.")]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every input image with the selected backends
    Run(BackendArgs),
    /// Validate config and inputs, and list the outputs a run would write
    Check(BackendArgs),
    /// Print a stock variants.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = config::load_config(&cli.config)?;
            let kinds = selected_backends(&args, &config)?;
            let sizes = config.size_configuration()?;
            let inputs = scan::discover_inputs(&config.input_dir)?;
            warn_missing_credentials(&kinds, &config);

            let remote = remote::RemoteContext::new(
                config.kraken.credentials(),
                config.kraken.remote_settings(),
            )?;
            let threads = config::effective_threads(&config.processing);

            for kind in kinds {
                let mut backend = factory::create_backend(kind, &remote);
                backend.configure(sizes.clone());

                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_batch_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                let report =
                    process::run_batch(&backend, &inputs, &config.output_dir, threads, Some(tx))?;
                printer
                    .join()
                    .map_err(|_| "progress printer thread panicked")?;
                output::print_batch_report(&report);
            }
        }
        Command::Check(args) => {
            let config = config::load_config(&cli.config)?;
            let kinds = selected_backends(&args, &config)?;
            let sizes = config.size_configuration()?;
            println!("==> Checking {}", cli.config.display());
            let inputs = scan::discover_inputs(&config.input_dir)?;
            output::print_plan(
                &config.input_dir,
                &inputs,
                &kinds,
                &sizes,
                &config.output_dir,
            );
            warn_missing_credentials(&kinds, &config);
            println!("==> Configuration is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Backends from the command line, or from the config when none were given.
fn selected_backends(
    args: &BackendArgs,
    config: &config::VariantsConfig,
) -> Result<Vec<BackendKind>, factory::UnsupportedBackend> {
    if args.backends.is_empty() {
        config.backend_kinds()
    } else {
        Ok(args.backends.clone())
    }
}

fn warn_missing_credentials(kinds: &[BackendKind], config: &config::VariantsConfig) {
    if kinds.iter().any(|k| k.is_remote()) && !config.kraken.credentials().is_complete() {
        eprintln!(
            "warning: remote backend selected but {} / {} are not set; requests will be rejected",
            config::API_KEY_ENV,
            config::API_SECRET_ENV
        );
    }
}
