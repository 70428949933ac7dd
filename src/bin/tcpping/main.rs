/*
    tcp round-trip throughput bench

    server: tcpping -s
    client: tcpping -c <server> [parallel]
*/

use std::{io::Write, sync::Arc};

use anyhow::Result;
use args::{Args, Role, RuntimeType, USAGE};
use clap::{Parser, error::ErrorKind};
use tcp_ping::{stati::Stati, reporter::{period_report, Sample}, util::log, impl_std, impl_tokio};
use tracing::{info, error};

mod args;


fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                println!("{}", USAGE);
                return Ok(())
            },
        },
    };

    let Some(role) = args.role() else {
        println!("{}", USAGE);
        return Ok(())
    };

    log::init()?;
    info!("num_cpus {}, runtime {:?}, role {:?}", num_cpus::get(), args.runtime, role);

    print_banner(args.runtime);

    let r = run_me(role, args.runtime);
    if let Err(e) = r {
        error!("{:?}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn print_banner(runtime: RuntimeType) {
    let configuration = if cfg!(debug_assertions) { "Debug" } else { "Release" };
    println!("Configuration: {}", configuration);
    println!("Runtime: {}", runtime.label());
    println!();
}

fn run_me(role: Role, runtime: RuntimeType) -> Result<()> {
    let stati = Arc::new(Stati::new());

    // lives as long as the role runs
    let _guard = period_report(stati.clone(), print_sample)?;

    match role {
        Role::Server(server_args) => match runtime {
            RuntimeType::Std => impl_std::run_as_server(server_args.port, &stati),
            RuntimeType::Tokio => impl_tokio::run_tokio_server(server_args.port, stati),
        },
        Role::Client(client_args) => match runtime {
            RuntimeType::Std => impl_std::run_as_client(&client_args.host, client_args.port, client_args.workers, &stati),
            RuntimeType::Tokio => impl_tokio::run_tokio_client(client_args.host, client_args.port, client_args.workers, stati),
        },
    }
}

fn print_sample(sample: &Sample) {
    let mut out = std::io::stdout().lock();
    let r = writeln!(out, "{}", sample).and_then(|_| out.flush());
    if let Err(e) = r {
        error!("fail to write report [{}]", e);
        std::process::exit(1);
    }
}
