use std::path::PathBuf;

use clap::Parser;
use rudolph_core::runtime::{self, RuntimeOptions};
use rudolph_core::trigger::DEFAULT_TRIGGER_PATH;

#[derive(Debug, Parser)]
#[command(name = "rudolph-core", version, about = "Keyboard-driven quick launcher")]
struct Cli {
    /// Directory holding config.toml and command_history.txt.
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Run a single command, print the result and exit.
    #[arg(long, value_name = "TEXT")]
    query: Option<String>,

    /// Marker file whose appearance toggles the window.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TRIGGER_PATH)]
    trigger_file: PathBuf,

    #[arg(long)]
    no_trigger: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Some(dir) = &cli.config_dir {
        std::env::set_var("RUDOLPH_CONFIG_DIR", dir);
    }

    if let Err(error) = rudolph_core::logging::init(cli.verbose) {
        eprintln!("[rudolph-core] logging disabled: {error}");
    }

    let options = RuntimeOptions {
        config_dir: cli.config_dir,
        query: cli.query,
        trigger_file: (!cli.no_trigger && cfg!(unix)).then_some(cli.trigger_file),
    };

    if let Err(error) = runtime::run(options) {
        tracing::error!("runtime failed: {error}");
        eprintln!("[rudolph-core] runtime failed: {error}");
        std::process::exit(1);
    }
}
