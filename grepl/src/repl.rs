//! # Command Loop
//!
//! Reads one command per line from stdin. Commands are parsed with `clap`, so `call` accepts the
//! same fill switches as the command line, and `help` works for every command.
//!
//! Navigation and fill errors are printed and the loop keeps going. End of input (Ctrl-D on an
//! empty prompt) or `exit` leaves it.
use crate::{
    cli::{FillArgs, parse_header},
    formatter::{FormattedString, GenericError},
    session::Session,
};
use clap::{Parser, Subcommand, ValueEnum};
use grepl_core::{
    fill::{InteractiveFiller, LinePrompter, PromptError, Prompter},
    present::Table,
    source::DescriptorSource,
};
use std::io::{self, BufRead, Write};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: ReplCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum ReplCommand {
    /// Select the current package ('' selects the default package)
    Package { name: String },

    /// Select a service of the current package
    Service { name: String },

    /// List packages, services, RPCs or messages of the current selection
    Show {
        #[arg(value_enum)]
        target: ShowTarget,
    },

    /// Describe a symbol, by full name or relative to the current package
    Desc { symbol: String },

    /// Call an RPC of the current service, prompting for the request
    Call {
        rpc: String,

        #[command(flatten)]
        fill: FillArgs,
    },

    /// Show the headers, set one ('key: value') or remove one (--remove key)
    Header {
        #[arg(long, conflicts_with = "header")]
        remove: Option<String>,

        #[arg(trailing_var_arg = true)]
        header: Vec<String>,
    },

    /// Leave the command loop
    #[command(alias = "quit")]
    Exit,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ShowTarget {
    Package,
    Service,
    Rpc,
    Message,
}

enum Flow {
    Continue,
    Exit,
}

pub async fn run<D: DescriptorSource>(session: &mut Session<D>) -> anyhow::Result<()> {
    let mut prompter = LinePrompter::new(io::stdin().lock(), io::stdout());

    loop {
        let line = match prompter.input(&session.prompt()) {
            Ok(line) => line,
            Err(PromptError::EndOfInput) => break,
            Err(err) => return Err(err.into()),
        };

        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match execute(session, &mut prompter, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(err) => eprintln!("{}", FormattedString::from(err)),
        }
    }

    writeln!(prompter.output_mut())?;
    Ok(())
}

fn parse(line: &str) -> Result<Option<ReplCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }

    Line::try_parse_from(words).map(|line| Some(line.command))
}

async fn execute<D, R, W>(
    session: &mut Session<D>,
    prompter: &mut LinePrompter<R, W>,
    command: ReplCommand,
) -> anyhow::Result<Flow>
where
    D: DescriptorSource,
    R: BufRead,
    W: Write,
{
    match command {
        ReplCommand::Package { name } => session.select_package(&name)?,
        ReplCommand::Service { name } => session.select_service(&name)?,
        ReplCommand::Show { target } => {
            let table = match target {
                ShowTarget::Package => session.packages(),
                ShowTarget::Service => session.services(&session.package)?,
                ShowTarget::Rpc => session.rpcs()?,
                ShowTarget::Message => session.messages()?,
            };
            session.print_table(table)?;
        }
        ReplCommand::Desc { symbol } => {
            let descriptor = session.describe(&symbol).await?;
            println!("{}", FormattedString::from(descriptor));
        }
        ReplCommand::Call { rpc, fill } => {
            let method = session.idl.rpc(&session.package, &session.service, &rpc)?;
            let options = fill.or(session.fill).into();

            let mut filler = InteractiveFiller::new(&mut *prompter, options)?;
            match session.call(&method, &mut filler).await {
                Ok(output) => session.print(output)?,
                Err(err) => {
                    let err = FormattedString::from(GenericError("Call Failed", err));
                    println!("{err}");
                }
            }
        }
        ReplCommand::Header { remove: Some(key), .. } => {
            session.headers.retain(|(k, _)| *k != key);
        }
        ReplCommand::Header { header, .. } if header.is_empty() => {
            let mut table = Table::new(["key", "value"]);
            for (key, value) in &session.headers {
                table.push_row([key.as_str(), value.as_str()]);
            }
            session.print_table(table)?;
        }
        ReplCommand::Header { header, .. } => {
            let (key, value) = parse_header(&header.join(" ")).map_err(anyhow::Error::msg)?;
            session.headers.retain(|(k, _)| *k != key);
            session.headers.push((key, value));
        }
        ReplCommand::Exit => return Ok(Flow::Exit),
    }

    Ok(Flow::Continue)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn call_accepts_fill_switches() {
        let command = parse("call GetItem --dig-manually --bytes-as-base64").unwrap();

        assert_eq!(
            command,
            Some(ReplCommand::Call {
                rpc: "GetItem".into(),
                fill: FillArgs {
                    dig_manually: true,
                    bytes_as_base64: true,
                    ..FillArgs::default()
                },
            })
        );
    }

    #[test]
    fn headers_may_contain_spaces() {
        let Some(ReplCommand::Header { remove, header }) =
            parse("header authorization: Bearer abc").unwrap()
        else {
            panic!("expected a header command");
        };

        assert_eq!(remove, None);
        assert_eq!(
            parse_header(&header.join(" ")).unwrap(),
            ("authorization".to_string(), "Bearer abc".to_string())
        );
    }

    #[test]
    fn show_targets_are_closed() {
        assert_eq!(
            parse("show rpc").unwrap(),
            Some(ReplCommand::Show {
                target: ShowTarget::Rpc
            })
        );
        assert!(parse("show everything").is_err());
    }

    #[test]
    fn quit_is_an_alias_of_exit() {
        assert_eq!(parse("quit").unwrap(), Some(ReplCommand::Exit));
    }
}
