//! `svcsim` binary entrypoint.

use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use svc_sim::Simulator;
use tracing_subscriber::EnvFilter;

use svc_shell::{Cli, Commands, Server, Session};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.simulator_config().context("loading simulator configuration")?;
    let mut session = Session::new(Simulator::new(config)?);
    let format = cli.format;

    match cli.command {
        Commands::Exec { tokens } => {
            let reply = session.execute_argv(&tokens)?;
            reply.write(format, &mut io::stdout().lock(), &mut io::stderr().lock())?;
            Ok(exit_code(reply.is_success()))
        }
        Commands::Script { file } => {
            let input = File::open(&file)
                .with_context(|| format!("opening script {}", file.display()))?;
            let summary = session.run_lines(
                BufReader::new(input),
                format,
                &mut io::stdout().lock(),
                &mut io::stderr().lock(),
                None,
            )?;
            Ok(exit_code(summary.failed == 0))
        }
        Commands::Repl => {
            session.run_lines(
                io::stdin().lock(),
                format,
                &mut io::stdout().lock(),
                &mut io::stderr().lock(),
                Some("exit"),
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { listen } => {
            let runtime = tokio::runtime::Runtime::new().context("creating async runtime")?;
            runtime.block_on(async {
                let server = Server::bind(listen, session).await?;
                eprintln!("listening on {}", server.local_addr()?);
                server.serve().await
            })?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
