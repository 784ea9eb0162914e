//! airtable-cli entry point.

use std::process::ExitCode;

use clap::Parser;
use toolbelt_cli::tools::airtable::{self, AirtableCli};
use toolbelt_cli::{block_on_main, logging};
use toolbelt_core::ToolContext;

fn main() -> ExitCode {
    let cli = AirtableCli::parse();
    logging::init(cli.global.verbose);

    block_on_main(async move {
        let ctx = ToolContext::from_home(airtable::TOOL)?;
        airtable::run(&ctx, cli, &mut std::io::stdout().lock()).await
    })
}
