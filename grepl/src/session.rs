//! # Session
//!
//! Everything a `grepl` run needs once the schema is loaded: the navigator, the type resolver
//! wrapping the descriptor source, a client over the shared channel, the headers sent with every
//! call and the current package/service selection of the command loop.
use crate::{
    call::{self, Output},
    cli::{FillArgs, OutputArgs, OutputFormat},
    formatter::FormattedString,
};
use anyhow::Context;
use grepl_core::{
    fill::Filler,
    grpc::GrpcClient,
    idl::{DEFAULT_PACKAGE, IdlError, IdlNavigator},
    present::{JsonPresenter, Presenter, Shape, Table, TablePresenter},
    prost_reflect::MethodDescriptor,
    resolver::TypeResolver,
    source::{Descriptor, DescriptorSource, SourceError},
    tonic::transport::Channel,
};

pub struct Session<D> {
    pub url: String,
    pub idl: IdlNavigator,
    pub resolver: TypeResolver<D>,
    pub client: GrpcClient<Channel>,
    pub headers: Vec<(String, String)>,
    pub fill: FillArgs,
    pub output: OutputArgs,
    pub package: String,
    pub service: String,
}

impl<D: DescriptorSource> Session<D> {
    /// Loads the schema from `source` and prepares a client over `channel`.
    pub async fn load(
        url: String,
        channel: Channel,
        mut source: D,
        fill: FillArgs,
        output: OutputArgs,
        headers: Vec<(String, String)>,
    ) -> anyhow::Result<Self> {
        let idl = IdlNavigator::load(&mut source)
            .await
            .context("Failed to load the schema")?;

        Ok(Self {
            url,
            idl,
            resolver: TypeResolver::new(source),
            client: GrpcClient::new(channel),
            headers,
            fill,
            output,
            package: String::new(),
            service: String::new(),
        })
    }

    pub fn presenter(&self) -> Box<dyn Presenter> {
        match self.output.output {
            OutputFormat::Json => Box::new(JsonPresenter::new(self.output.emit_defaults)),
            OutputFormat::Table => Box::new(TablePresenter),
        }
    }

    pub fn print(&self, output: Output) -> anyhow::Result<()> {
        output.print(
            self.presenter().as_ref(),
            self.output.output == OutputFormat::Table,
        )
    }

    pub fn print_table(&self, table: Table) -> anyhow::Result<()> {
        let text = self.presenter().format(&Shape::Table(table))?;
        println!("{}", FormattedString(text));
        Ok(())
    }

    /// Fills and sends requests for `method`, collecting every response.
    pub async fn call<F: Filler>(
        &mut self,
        method: &MethodDescriptor,
        filler: &mut F,
    ) -> anyhow::Result<Output> {
        call::run(
            &mut self.client,
            &mut self.resolver,
            filler,
            method,
            self.headers.clone(),
        )
        .await
    }

    /// Resolves `symbol` as given, then relative to the selected package.
    pub async fn describe(&mut self, symbol: &str) -> anyhow::Result<Descriptor> {
        let source = self.resolver.source_mut();

        match (source.find_symbol(symbol).await, qualify(&self.package, symbol)) {
            (Err(SourceError::NotFound(_)), Some(qualified)) => {
                Ok(source.find_symbol(&qualified).await?)
            }
            (result, _) => Ok(result?),
        }
    }

    pub fn select_package(&mut self, package: &str) -> Result<(), IdlError> {
        self.idl.service_names(package)?;
        self.package = package.to_string();
        self.service.clear();
        Ok(())
    }

    pub fn select_service(&mut self, service: &str) -> Result<(), IdlError> {
        self.idl.rpcs(&self.package, service)?;
        self.service = service.to_string();
        Ok(())
    }

    /// Packages, the services of a package, or the RPCs of a fully qualified service.
    pub fn list(&self, target: Option<&str>) -> anyhow::Result<Table> {
        let Some(target) = target else {
            return Ok(self.packages());
        };

        match self.idl.service_names(target) {
            Ok(_) => Ok(self.services(target)?),
            Err(IdlError::UnknownPackageName(_)) => {
                let service = self
                    .idl
                    .service(target)
                    .with_context(|| format!("'{target}' is neither a package nor a service"))?;
                Ok(rpc_table(service.methods()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn packages(&self) -> Table {
        let mut table = Table::new(["package"]);
        for package in self.idl.package_names() {
            table.push_row([package]);
        }
        table
    }

    pub fn services(&self, package: &str) -> Result<Table, IdlError> {
        let mut table = Table::new(["service", "rpcs"]);
        for service in self.idl.service_names(package)? {
            let rpcs = self.idl.rpcs(package, &service)?.len();
            table.push_row([service, rpcs.to_string()]);
        }
        Ok(table)
    }

    pub fn rpcs(&self) -> Result<Table, IdlError> {
        Ok(rpc_table(self.idl.rpcs(&self.package, &self.service)?))
    }

    pub fn messages(&self) -> Result<Table, IdlError> {
        let mut table = Table::new(["message"]);
        for message in self.idl.message_names(&self.package)? {
            table.push_row([message]);
        }
        Ok(table)
    }

    /// The command loop prompt, e.g. `shop.v1.InventoryService@http://localhost:50051> `.
    pub fn prompt(&self) -> String {
        prompt(&self.package, &self.service, &self.url)
    }
}

fn rpc_table(methods: impl IntoIterator<Item = MethodDescriptor>) -> Table {
    let mut table = Table::new(["rpc", "request", "response"]);
    for method in methods {
        let stream = |streaming: bool, name: &str| {
            if streaming {
                format!("stream {name}")
            } else {
                name.to_string()
            }
        };
        table.push_row([
            method.name().to_string(),
            stream(method.is_client_streaming(), method.input().full_name()),
            stream(method.is_server_streaming(), method.output().full_name()),
        ]);
    }
    table
}

fn prompt(package: &str, service: &str, url: &str) -> String {
    match (package, service) {
        ("", _) => format!("{url}> "),
        (package, "") => format!("{package}@{url}> "),
        (package, service) => format!("{package}.{service}@{url}> "),
    }
}

/// `symbol` relative to `package`. Symbols of the default package are already fully qualified.
fn qualify(package: &str, symbol: &str) -> Option<String> {
    match package {
        "" | DEFAULT_PACKAGE => None,
        package => Some(format!("{package}.{symbol}")),
    }
}
