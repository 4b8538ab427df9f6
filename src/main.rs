// src/main.rs

use packpipe::{cli, logging, run};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("packpipe error: {err:?}");
        std::process::exit(packpipe::errors::SETUP_FAILURE_EXIT_CODE);
    }

    if let Err(err) = run(args).await {
        eprintln!("packpipe error: {err}");
        std::process::exit(err.exit_code());
    }
}
