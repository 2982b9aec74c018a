//! Format and render a model reply from the command line.
//!
//! Reads raw reply text from the named files (or stdin when none are
//! given), runs it through the response formatter, and prints it the way
//! the chat shows assistant messages.
//!
//! # Usage
//!
//! ```bash
//! # Render a saved reply
//! aidsnap-format reply.txt
//!
//! # Show the intermediate markdown instead of rendering it
//! echo "Steps: 1.Cool the burn 2.Cover it" | aidsnap-format --markdown
//! ```

use std::io::Read;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use aidsnap::{PlainTextRenderer, Renderer, format_response};

/// Command-line arguments for the aidsnap-format tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    /// Print the formatted markdown without rendering it.
    #[arrrg(flag, "Print formatted markdown instead of rendering it")]
    markdown: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    no_color: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_env("AIDSNAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (args, files) = Args::from_command_line_relaxed("aidsnap-format [OPTIONS] [FILE...]");

    let mut inputs = Vec::new();
    if files.is_empty() {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        inputs.push(raw);
    } else {
        for file in &files {
            tracing::debug!(file = %file, "reading reply");
            inputs.push(std::fs::read_to_string(file)?);
        }
    }

    let mut renderer = PlainTextRenderer::with_color(!args.no_color);
    for raw in inputs {
        let formatted = format_response(&raw);
        if args.markdown {
            println!("{formatted}");
        } else {
            renderer.print_markdown(&formatted);
        }
    }

    Ok(())
}
