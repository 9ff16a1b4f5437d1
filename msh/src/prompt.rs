use crate::shell::APP_NAME;
use anyhow::Result;
use std::io::Write;

/// `msh@<cwd>$ `, reprinted before every read. The working directory is
/// queried each time so `cd` shows up immediately.
#[derive(Debug, Default)]
pub struct Prompt;

impl Prompt {
    pub fn new() -> Self {
        Prompt
    }

    pub fn render(&self) -> String {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "?".to_string());
        format!("{APP_NAME}@{cwd}$ ")
    }

    pub fn print(&self, out: &mut impl Write) -> Result<()> {
        write!(out, "{}", self.render())?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_shell_name_and_cwd() {
        let rendered = Prompt::new().render();
        assert!(rendered.starts_with("msh@"));
        assert!(rendered.ends_with("$ "));
        let cwd = std::env::current_dir().unwrap().display().to_string();
        assert!(rendered.contains(&cwd));
    }
}
