use tracing::debug;

/// One parsed command, ready for the process runner. Transient: built
/// per execution and discarded after spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Original (trimmed) text, recorded verbatim in history.
    pub raw: String,
    /// argv[0] is the program name, resolved through PATH at exec time.
    pub argv: Vec<String>,
    pub redirect_out: Option<String>,
    pub redirect_in: Option<String>,
    pub background: bool,
}

/// Split an input line into command substrings on `;`. There is no
/// quoting or escaping: a `;` inside quotes still separates commands.
pub fn split_commands(line: &str) -> Vec<&str> {
    line.split(';').filter(|s| !s.trim().is_empty()).collect()
}

/// Parse one command substring. Returns `None` for a command that is
/// empty after parsing; the caller skips it silently.
///
/// The trailing `&` is stripped before the redirection targets are cut
/// off, so the background marker binds to the whole command and never
/// ends up inside a redirect path.
pub fn parse_command(text: &str) -> Option<Command> {
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }

    let mut rest = raw;
    let mut background = false;
    if let Some(stripped) = rest.strip_suffix('&') {
        background = true;
        rest = stripped.trim_end();
    }

    // The first `>` splits off the output path; everything after it,
    // including a later `<`, belongs to that path. No `>>` support.
    let (rest, redirect_out) = match rest.find('>') {
        Some(pos) => (&rest[..pos], Some(rest[pos + 1..].trim().to_string())),
        None => (rest, None),
    };
    let (rest, redirect_in) = match rest.find('<') {
        Some(pos) => (&rest[..pos], Some(rest[pos + 1..].trim().to_string())),
        None => (rest, None),
    };

    let argv: Vec<String> = rest
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if argv.is_empty() {
        debug!("empty argv, skipping {:?}", raw);
        return None;
    }

    Some(Command {
        raw: raw.to_string(),
        argv,
        redirect_out,
        redirect_in,
        background,
    })
}
