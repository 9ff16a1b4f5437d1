use crate::input::{self, ReadLine};
use crate::prompt::Prompt;
use crate::shell::{APP_NAME, Shell, shutdown_requested};
use anyhow::Result;
use msh_types::Context;
use tracing::debug;

/// The read-eval loop. Single-threaded and synchronous: a foreground
/// child blocks the loop until it terminates. The same loop serves
/// piped stdin, just without the prompt.
pub struct Repl<'a> {
    pub shell: &'a mut Shell,
    prompt: Prompt,
}

impl<'a> Repl<'a> {
    pub fn new(shell: &'a mut Shell) -> Self {
        Repl {
            shell,
            prompt: Prompt::new(),
        }
    }

    pub fn run(&mut self, ctx: &mut Context) -> Result<()> {
        loop {
            if shutdown_requested() {
                debug!("interrupt observed, leaving loop");
                break;
            }
            if ctx.interactive {
                self.prompt.print(&mut std::io::stdout().lock())?;
            }
            match input::read_line()? {
                ReadLine::Line(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    if let Err(err) = self.shell.eval_str(ctx, input) {
                        eprintln!("{APP_NAME}: {err:?}");
                    }
                    if self.shell.exited.is_some() {
                        break;
                    }
                }
                ReadLine::Eof => break,
                ReadLine::Interrupted => continue,
            }
        }
        // exit, interrupt and end-of-input all funnel through here.
        self.shell.shutdown(ctx, true);
        Ok(())
    }
}
