//! Agentuity bundler - builds agent projects for deployment.
//!
//! This binary installs dependencies, gates on the installed SDK version and
//! bundles the project into `.agentuity/`.

use std::process;

use agentuity_bundler::{
    bundler::Registry,
    cli::{self, Args, OutputManager},
};

fn init_logging(level: Option<log::LevelFilter>) {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    init_logging(args.log_level);
    let output = OutputManager::new(args.verbose, args.quiet);

    let registry = match Registry::builtin() {
        Ok(registry) => registry,
        Err(e) => {
            let _ = output.error(&format!("Error: invalid built-in catalog: {e}"));
            process::exit(1);
        }
    };

    let exit_code = match cli::run(args, &registry).await {
        Ok(()) => 0,
        Err(e) => {
            log::debug!("build failed: {e:?}");
            cli::report_error(&output, &e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
