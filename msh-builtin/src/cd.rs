use super::ShellProxy;
use msh_types::{Context, ExitStatus};

/// `cd <path>`. Without an argument this is a usage error and the
/// working directory is left alone; `HOME` is never consulted.
pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    match argv.get(1) {
        Some(dir) => match proxy.changepwd(dir) {
            Ok(()) => ExitStatus::ExitedWith(0),
            Err(err) => {
                ctx.write_stderr(&format!("cd: {}: {}", err, dir)).ok();
                ExitStatus::ExitedWith(1)
            }
        },
        None => {
            ctx.write_stderr("cd: missing argument").ok();
            ExitStatus::ExitedWith(1)
        }
    }
}
