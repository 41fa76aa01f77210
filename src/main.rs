use clap::Parser;
use fsorter::cli::{self, Args, run_cli};
use fsorter::logging::init_logging;
use fsorter::output;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run_cli(&args) {
        Ok(report) => {
            tracing::debug!(?report, "run complete");
            std::process::exit(cli::EXIT_SUCCESS);
        }
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}
