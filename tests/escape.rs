// tests/escape.rs

use proptest::prelude::*;

use procexec::process::escape::{escape_argument, escape_command_line, strip_sandbox_wrapper};

#[test]
fn safe_arguments_are_left_alone() {
    assert_eq!(escape_argument("ls"), "ls");
    assert_eq!(escape_argument("--color=auto"), "--color=auto");
    assert_eq!(escape_argument("/usr/bin/env"), "/usr/bin/env");
}

#[test]
fn unsafe_arguments_are_quoted() {
    assert_eq!(escape_argument(""), "''");
    assert_eq!(escape_argument("a b"), "'a b'");
    assert_eq!(escape_argument("$HOME"), "'$HOME'");
    assert_eq!(escape_argument("it's"), r"'it'\''s'");
}

#[test]
fn command_line_joins_with_spaces() {
    assert_eq!(
        escape_command_line(&["sh", "-c", "echo hi"]),
        "sh -c 'echo hi'"
    );
}

#[test]
fn sandbox_wrapper_is_stripped() {
    let args: Vec<String> = ["/usr/bin/sandbox-exec", "-p", "(version 1)", "make", "all"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(strip_sandbox_wrapper(&args), ["make", "all"]);

    let plain: Vec<String> = vec!["make".to_string()];
    assert_eq!(strip_sandbox_wrapper(&plain), ["make"]);
}

/// Undo single-quote escaping the way a POSIX shell would.
fn shell_unquote(escaped: &str) -> String {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('\'', _) => in_quotes = !in_quotes,
            ('\\', false) => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            (c, _) => out.push(c),
        }
    }
    out
}

proptest! {
    #[test]
    fn escaping_survives_shell_unquoting(arg in ".{0,24}") {
        prop_assert_eq!(shell_unquote(&escape_argument(&arg)), arg);
    }
}
