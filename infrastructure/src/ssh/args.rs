//! Building `ssh` argument lists and remote command lines.

use relay_domain::{Remote, ServerCommand};

/// Quote `arg` for the remote POSIX shell.
///
/// Words made only of safe characters pass through; anything else is wrapped
/// in single quotes with embedded quotes escaped as `'\''`.
pub(crate) fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | ',' | '=' | '+' | '@')
        })
    {
        return arg.to_string();
    }

    let mut escaped = String::with_capacity(arg.len() + 4);
    escaped.push('\'');
    for ch in arg.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

/// The single command line sent to the server.
pub(crate) fn remote_command_line(command: &ServerCommand) -> String {
    command
        .args()
        .iter()
        .map(|a| quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Options and destination for connecting to `remote`.
///
/// `keepalive` adds `ServerAliveInterval` for long-lived sessions.
pub(crate) fn connection_args(remote: &Remote, keepalive: bool) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        remote.port.to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", remote.timeout_secs),
    ];
    if keepalive && remote.keepalive_secs > 0 {
        args.push("-o".to_string());
        args.push(format!("ServerAliveInterval={}", remote.keepalive_secs));
    }
    if let Some(key) = &remote.key_filename {
        args.push("-i".to_string());
        args.push(key.display().to_string());
    }
    args.push(remote.destination());
    args
}
