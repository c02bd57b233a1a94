use appctl_server::bootstrap;
use appctl_server::cli::{Cli, Command};
use appctl_server::version::print_version;
use clap::Parser;
use std::error::Error;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn Error + Send + Sync>> = match cli.command {
        Some(Command::Version(args)) => print_version(args.short, args.json).map_err(Into::into),
        None => bootstrap::execute(cli.server).await.map_err(Into::into),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(err.as_ref());
            ExitCode::FAILURE
        }
    }
}

fn report(err: &(dyn Error + 'static)) {
    let mut message = format!("FATAL: {}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    eprintln!("{}", message);
}
