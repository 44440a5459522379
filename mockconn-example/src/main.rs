//! mockconn example — demo runner for the in-process connection emulator.
//!
//! Runs three built-in demos against emulated links:
//!   1. bidirectional echo over a 256 msg/s, 100 ms link
//!   2. lossy satellite link with a metrics summary
//!   3. read deadline on an idle link
//!
//! Run with:
//!   cargo run -p mockconn-example
//!   cargo run -p mockconn-example -- --seed 7

use clap::Parser;

// ---

mod deadline_demo;
mod echo_demo;
mod lossy_demo;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "mockconn-example", about = "mockconn demo runner")]
struct Config {
    // ---
    /// RNG seed for the lossy-link demo. Omit for a fresh loss pattern
    /// each run.
    #[arg(long)]
    seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---
    let cfg = Config::parse();

    let no_color = std::env::var("EMACS").is_ok()
        || std::env::var("NO_COLOR").is_ok()
        || std::env::var("CARGO_TERM_COLOR").as_deref() == Ok("never")
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .with_ansi(!no_color)
        .init();

    println!("=== 1. Bidirectional echo demo ===");
    echo_demo::run().await?;

    println!();
    println!("=== 2. Lossy satellite link demo ===");
    lossy_demo::run(cfg.seed).await?;

    println!();
    println!("=== 3. Read deadline demo ===");
    deadline_demo::run().await?;

    Ok(())
}
