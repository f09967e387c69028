// src/process/escape.rs

//! Shell-style rendering of argument vectors for logs and error messages.

use std::borrow::Cow;

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '=' | ':' | ',' | '+' | '@' | '%' | '^')
}

/// Quote `arg` for a POSIX shell if it needs it.
pub fn escape_argument(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty() && arg.chars().all(is_safe) {
        return Cow::Borrowed(arg);
    }
    Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
}

/// Join arguments into a single copy-pasteable command line.
pub fn escape_command_line<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| escape_argument(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop a leading `sandbox-exec -p <profile>` wrapper.
pub fn strip_sandbox_wrapper(args: &[String]) -> &[String] {
    match args {
        [program, flag, _profile, rest @ ..]
            if program.ends_with("sandbox-exec") && flag == "-p" =>
        {
            rest
        }
        _ => args,
    }
}
