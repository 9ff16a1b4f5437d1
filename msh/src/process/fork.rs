use anyhow::{Context as _, Result, bail};
use nix::unistd::{ForkResult, Pid, execvp, fork, getpid};
use std::ffi::CString;
use tracing::{debug, error};

use super::Process;
use crate::shell::APP_NAME;
use msh_types::Context;

pub(crate) fn fork_process(ctx: &Context, process: &Process) -> Result<Pid> {
    debug!(
        "fork process {:?} foreground:{} redirects:{:?}",
        process.argv, ctx.foreground, process.redirects
    );
    let pid = unsafe { fork().context("failed fork")? };

    match pid {
        ForkResult::Parent { child } => {
            debug!("forked child pid: {}", child);
            Ok(child)
        }
        ForkResult::Child => {
            let pid = getpid();
            debug!("child {} launching {:?}", pid, process.argv);
            if let Err(err) = launch(process) {
                error!("child launch failed: {}", err);
                eprintln!("{APP_NAME}: {err}");
            }
            // Reached only when execvp failed; the image was not replaced.
            std::process::exit(127);
        }
    }
}

/// Child-side half of the spawn: rewire streams, then replace the
/// process image.
fn launch(process: &Process) -> Result<()> {
    for redirect in &process.redirects {
        redirect.apply_in_child();
    }

    let cmd = CString::new(process.argv[0].clone()).context("failed new CString")?;
    let argv: Result<Vec<CString>> = process
        .argv
        .iter()
        .cloned()
        .map(|a| CString::new(a).map_err(|e| anyhow::anyhow!("failed to create CString: {}", e)))
        .collect();
    let argv = argv?;

    match execvp(&cmd, &argv) {
        Ok(_) => Ok(()),
        Err(err) => bail!("{}: {}", process.argv[0], err),
    }
}
