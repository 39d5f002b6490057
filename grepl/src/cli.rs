//! # CLI
//!
//! The command-line interface of `grepl`, defined with `clap`.
//!
//! Global flags select where the schema comes from and how requests are filled. Without a
//! subcommand `grepl` starts the interactive command loop.
use clap::{Args, Parser, Subcommand, ValueEnum};
use grepl_core::fill::FillOptions;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "grepl", version, about = "Interactive dynamic gRPC client")]
pub struct Cli {
    /// The server URL to connect to
    #[arg(long, short, default_value = "http://127.0.0.1:50051")]
    pub url: String,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Import paths used to resolve the imports of --proto files (defaults to the current
    /// directory)
    #[arg(long = "path", requires = "protos")]
    pub import_paths: Vec<PathBuf>,

    #[command(flatten)]
    pub fill: FillArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Headers sent with every call, as 'key:value'
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the schema is loaded from. Server reflection is used when nothing else is given.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct SourceArgs {
    /// Load the schema through the server reflection service
    #[arg(long, short)]
    pub reflection: bool,

    /// Proto files to compile (comma separated or repeated)
    #[arg(long = "proto", value_delimiter = ',')]
    pub protos: Vec<PathBuf>,

    /// Path to an encoded FileDescriptorSet (.bin)
    #[arg(long)]
    pub file_descriptor_set: Option<PathBuf>,
}

/// The schema origin picked by [`SourceArgs`].
#[derive(Debug, PartialEq, Eq)]
pub enum Schema<'a> {
    Reflection,
    Protos(&'a [PathBuf]),
    FileDescriptorSet(&'a Path),
}

impl SourceArgs {
    pub fn schema(&self) -> Schema<'_> {
        match (&self.file_descriptor_set, self.protos.as_slice()) {
            _ if self.reflection => Schema::Reflection,
            (Some(path), _) => Schema::FileDescriptorSet(path),
            (None, []) => Schema::Reflection,
            (None, protos) => Schema::Protos(protos),
        }
    }
}

/// Switches of the interactive filler.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillArgs {
    /// Ask before descending into each nested message
    #[arg(long)]
    pub dig_manually: bool,

    /// Read bytes fields as base64
    #[arg(long, conflicts_with_all = ["bytes_as_quoted_literals", "bytes_from_file"])]
    pub bytes_as_base64: bool,

    /// Read bytes fields as quoted literals with escape sequences ("\x00\n")
    #[arg(long, conflicts_with = "bytes_from_file")]
    pub bytes_as_quoted_literals: bool,

    /// Read bytes fields from the file at the given path
    #[arg(long)]
    pub bytes_from_file: bool,

    /// Ask after each repeated element whether to add another one
    #[arg(long)]
    pub add_repeated_manually: bool,
}

impl FillArgs {
    /// Switches enabled here or in `base`.
    pub fn or(self, base: FillArgs) -> FillArgs {
        FillArgs {
            dig_manually: self.dig_manually || base.dig_manually,
            bytes_as_base64: self.bytes_as_base64 || base.bytes_as_base64,
            bytes_as_quoted_literals: self.bytes_as_quoted_literals
                || base.bytes_as_quoted_literals,
            bytes_from_file: self.bytes_from_file || base.bytes_from_file,
            add_repeated_manually: self.add_repeated_manually || base.add_repeated_manually,
        }
    }
}

impl From<FillArgs> for FillOptions {
    fn from(args: FillArgs) -> Self {
        FillOptions {
            dig_manually: args.dig_manually,
            bytes_as_base64: args.bytes_as_base64,
            bytes_as_quoted_literals: args.bytes_as_quoted_literals,
            bytes_from_file: args.bytes_from_file,
            add_repeated_manually: args.add_repeated_manually,
        }
    }
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OutputArgs {
    /// How responses are printed
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Print fields that hold their default value
    #[arg(long)]
    pub emit_defaults: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the interactive command loop (the default)
    Repl,

    /// Call a method once
    ///
    /// The request is read as JSON documents from --file (or stdin). With --interactive the
    /// request is prompted for field by field instead. Streaming methods take one document
    /// (or one prompted message) per request until the input ends.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// echo '{"message": "hi"}' | grepl --proto echo.proto call echo.EchoService/UnaryEcho
    /// ```
    Call {
        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),

        /// Read the JSON request from this file instead of stdin
        #[arg(long, short, conflicts_with = "interactive")]
        file: Option<PathBuf>,

        /// Prompt for the request field by field
        #[arg(long, short)]
        interactive: bool,
    },

    /// List packages, the services of a package or the methods of a service
    List {
        /// A package or a fully qualified service name. Lists packages when omitted.
        target: Option<String>,
    },

    /// Describe a service, method, message or enum by its fully qualified name
    Desc {
        /// Fully qualified symbol (e.g. my.package.Message)
        symbol: String,
    },
}

pub fn parse_endpoint(value: &str) -> Result<(String, String), String> {
    let (service, method) = value.split_once('/').ok_or_else(|| {
        format!("Invalid endpoint format: '{value}'. Expected 'package.Service/Method'",)
    })?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and Method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

pub fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}
