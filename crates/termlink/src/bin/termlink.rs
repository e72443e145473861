#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let result = termlink::cli::run().await;

    // Leave the terminal in a sane state before any error is printed
    use std::io::{self, Write};
    let _ = io::stderr().flush();
    let _ = io::stdout().flush();

    result
}
