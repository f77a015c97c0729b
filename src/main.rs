use clap::Parser;
use logtail::cli::{print_error, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose());

    if let Err(e) = cli.execute().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Log to stderr so stdout only carries command output
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("logtail=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
