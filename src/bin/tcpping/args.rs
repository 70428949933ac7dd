
use clap::Parser;
use tcp_ping::DEFAULT_PORT;

pub const USAGE: &str = "tcpping [-s] [-c server parallel]";

#[derive(Parser, Debug, Clone)]
#[clap(name = "tcpping", author, version, about = "tcp round-trip throughput bench")]
pub struct Args {

    #[clap(long = "rt", long_help = "runtime", default_value = "std")]
    #[arg(value_enum)]
    pub runtime: RuntimeType,

    #[clap(short = 's', short_alias = 'S', long = "server", long_help = "run in server mode")]
    is_server: bool,

    #[clap(short = 'c', short_alias = 'C', long = "client", long_help = "run in client mode, connecting to <host>")]
    host: Option<String>,

    #[clap(long_help = "number of parallel client connections; default 1", value_parser = clap::value_parser!(u32).range(1..))]
    parallel: Option<u32>,

    #[clap(short = 'p', long = "port", long_help = "server port to listen on/connect to", default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeType {
    Std,
    Tokio,
}

impl RuntimeType {
    pub fn label(&self) -> &'static str {
        match self {
            RuntimeType::Std => "std threads",
            RuntimeType::Tokio => "tokio multi-thread",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerArgs {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientArgs {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Server(ServerArgs),
    Client(ClientArgs),
}

impl Args {
    /// None unless exactly one role is selected
    pub fn role(&self) -> Option<Role> {
        match (self.is_server, &self.host) {
            (true, None) if self.parallel.is_none() => Some(Role::Server(ServerArgs {
                port: self.port,
            })),
            (false, Some(host)) => Some(Role::Client(ClientArgs {
                host: host.clone(),
                port: self.port,
                workers: self.parallel.unwrap_or(1) as usize,
            })),
            _ => None,
        }
    }
}
