fn main() {
    if let Err(error) = treeq_cli::run() {
        // run() installs the subscriber before any fallible work.
        tracing::error!(error = format!("{error:#}"), "treeq failed");
        std::process::exit(1);
    }
}
