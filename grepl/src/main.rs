//! # Grepl CLI Entry Point
//!
//! The main executable for grepl. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Installs the `tracing` subscriber and parses [`cli::Cli`].
//! 2. **Schema**: Builds the descriptor source selected on the command line (proto files, a
//!    descriptor set, or server reflection) and loads it into a [`session::Session`].
//! 3. **Execution**: Runs the command loop, or a single `call`, `list` or `desc` command.
//! 4. **Presentation**: Prints responses through the selected presenter and errors in red.
mod call;
mod cli;
mod formatter;
mod repl;
mod session;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, Schema};
use formatter::FormattedString;
use grepl_core::{
    fill::{InteractiveFiller, LinePrompter, SilentFiller},
    source::{DescriptorSource, FileDescriptorSource, ReflectionDescriptorSource},
    tonic::transport::{Channel, Endpoint},
};
use session::Session;
use std::{
    fs::File,
    io::{self, BufReader, Read},
    process,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let channel = Endpoint::from_shared(cli.url.clone())
        .with_context(|| format!("Invalid server URL '{}'", cli.url))?
        .connect_lazy();

    match cli.source.schema() {
        Schema::Protos(protos) => {
            let source = FileDescriptorSource::from_proto_files(&cli.import_paths, protos)?;
            dispatch(cli, channel, source).await
        }
        Schema::FileDescriptorSet(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            let source = FileDescriptorSource::from_file_descriptor_set(&bytes)?;
            dispatch(cli, channel, source).await
        }
        Schema::Reflection => {
            let source = ReflectionDescriptorSource::new(channel.clone());
            dispatch(cli, channel, source).await
        }
    }
}

async fn dispatch<D: DescriptorSource>(
    cli: Cli,
    channel: Channel,
    source: D,
) -> anyhow::Result<()> {
    let Cli {
        url,
        fill,
        output,
        headers,
        command,
        ..
    } = cli;

    let mut session = Session::load(url, channel, source, fill, output, headers).await?;

    match command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl::run(&mut session).await,
        Commands::Call {
            endpoint: (service, method),
            file,
            interactive,
        } => {
            let method = session.idl.method(&service, &method)?;

            let output = if interactive {
                let prompter = LinePrompter::new(io::stdin().lock(), io::stdout());
                let mut filler = InteractiveFiller::new(prompter, session.fill.into())?;
                session.call(&method, &mut filler).await?
            } else {
                let reader: Box<dyn Read> = match file {
                    Some(path) => Box::new(BufReader::new(
                        File::open(&path)
                            .with_context(|| format!("Failed to open '{}'", path.display()))?,
                    )),
                    None => Box::new(io::stdin()),
                };
                session.call(&method, &mut SilentFiller::new(reader)).await?
            };

            session.print(output)
        }
        Commands::List { target } => {
            let table = session.list(target.as_deref())?;
            session.print_table(table)
        }
        Commands::Desc { symbol } => {
            let descriptor = session.describe(&symbol).await?;
            println!("{}", FormattedString::from(descriptor));
            Ok(())
        }
    }
}
