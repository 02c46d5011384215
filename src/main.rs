//! Command-line interface for promptgen.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use promptgen::{load_generator, RemoteBackend, Settings};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("promptgen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Print a pretrained language model's continuation of a prompt")
        .arg(
            Arg::new("prompt")
                .help("Input prompt text")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON settings file (created with defaults if missing)"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .help("Hub model id for both tokenizer and weights"),
        )
        .arg(
            Arg::new("max_new_tokens")
                .short('n')
                .long("max-new-tokens")
                .help("Maximum number of tokens to generate")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("temperature")
                .short('t')
                .long("temperature")
                .help("Sampling temperature (0.0 = greedy)")
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(
            Arg::new("top_p")
                .short('p')
                .long("top-p")
                .help("Top-p (nucleus) sampling threshold")
                .value_parser(clap::value_parser!(f32)),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .help("Random seed for sampling")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("cpu")
                .long("cpu")
                .help("Run on the CPU even when an accelerator is available")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log progress to stderr")
                .action(ArgAction::SetTrue),
        )
}

/// Defaults, then the settings file, then flags.
fn settings_from(matches: &ArgMatches) -> Result<Settings> {
    let mut settings = match matches.get_one::<String>("config") {
        Some(path) => Settings::load_or_create(path)
            .with_context(|| format!("failed to load settings from {}", path))?,
        None => Settings::default(),
    };

    if let Some(model) = matches.get_one::<String>("model") {
        settings.model_name = model.clone();
    }
    if let Some(&n) = matches.get_one::<usize>("max_new_tokens") {
        settings.max_new_tokens = n;
    }
    if let Some(&t) = matches.get_one::<f32>("temperature") {
        settings.temperature = t;
    }
    if let Some(&p) = matches.get_one::<f32>("top_p") {
        settings.top_p = p;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        settings.seed = seed;
    }
    if matches.get_flag("cpu") {
        settings.force_cpu = true;
    }

    settings.validate().context("invalid settings")?;
    Ok(settings)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let settings = settings_from(&matches)?;
    let prompt = matches
        .get_one::<String>("prompt")
        .context("prompt argument is required")?;

    let output = if settings.runs_in_process() {
        let mut generator = load_generator(&settings)
            .with_context(|| format!("failed to load {}", settings.model_name))?;
        generator.generate(prompt).context("generation failed")?.text
    } else {
        let backend = RemoteBackend::from_settings(&settings)?;
        backend.complete(prompt).context("remote completion failed")?
    };

    println!("{}", output);
    Ok(())
}
