//! forksync binary entry point.

fn main() {
    if let Err(err) = forksync::cli::run() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
