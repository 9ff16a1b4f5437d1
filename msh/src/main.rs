use crate::repl::Repl;
use crate::shell::Shell;
use anyhow::Result;
use clap::Parser;
use msh_types::Context;
use std::process::ExitCode;
use tracing::debug;

mod input;
mod parser;
mod process;
mod prompt;
mod repl;
mod shell;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run a single command line and exit
    #[arg(short, long)]
    command: Option<String>,
}

fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("Failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let mut shell = match Shell::new() {
        Ok(shell) => shell,
        Err(err) => {
            eprintln!("{}: {err}", shell::APP_NAME);
            return ExitCode::FAILURE;
        }
    };
    let mut ctx = Context::new(shell.pid, is_interactive());

    if let Some(command) = cli.command.as_deref() {
        run_command(&mut shell, &mut ctx, command)
    } else {
        run_loop(&mut shell, &mut ctx)
    }
}

fn init_tracing() -> Result<()> {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("MSH_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn is_interactive() -> bool {
    use nix::unistd::isatty;
    use std::os::unix::io::AsRawFd;
    isatty(std::io::stdin().as_raw_fd()).unwrap_or(false)
}

fn run_command(shell: &mut Shell, ctx: &mut Context, command: &str) -> ExitCode {
    debug!("run command mode: {:?}", command);
    shell.set_signals();
    let code = match shell.eval_str(ctx, command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: {err:?}", shell::APP_NAME);
            ExitCode::FAILURE
        }
    };
    // One-shot mode still tears the segment down but skips the final
    // history dump to keep stdout clean for scripting.
    shell.shutdown(ctx, false);
    code
}

fn run_loop(shell: &mut Shell, ctx: &mut Context) -> ExitCode {
    debug!("start shell, interactive: {}", ctx.interactive);
    shell.set_signals();
    let mut repl = Repl::new(shell);
    if let Err(err) = repl.run(ctx) {
        eprintln!("{err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
