use sha2::{Digest, Sha256};

use crate::profiles::{DEFAULT_SSH_PORT, Endpoint, Profile, RdpSettings, SshSettings};

pub const LINE_END: &str = "\r\n";
pub const SCRIPT_EXTENSION: &str = "bat";
/// Windows Credential Manager target prefix read by the Remote Desktop client.
pub const CREDENTIAL_TARGET_PREFIX: &str = "TERMSRV/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedScript {
    pub filename: String,
    pub text: String,
}

pub fn render(profile: &Profile) -> RenderedScript {
    RenderedScript {
        filename: filename(profile),
        text: script_text(profile),
    }
}

/// `<name>_<kind>_<host>.bat`. The host segment never contains `_`; a host
/// that loses characters to sanitizing gets a digest of the identity key.
pub fn filename(profile: &Profile) -> String {
    let (name, _) = sanitize(profile.name.trim());
    let key = profile.identity_key();
    let (host, lossy) = sanitize(key.host());
    let mut stem = format!("{name}_{}_{host}", key.kind());
    if lossy {
        let digest = Sha256::digest(key.to_string().as_bytes());
        stem.push('~');
        stem.push_str(&hex::encode(&digest[..8]));
    }
    format!("{stem}.{SCRIPT_EXTENSION}")
}

pub fn script_text(profile: &Profile) -> String {
    let mut lines = vec![
        "@echo off".to_owned(),
        "setlocal DisableDelayedExpansion".to_owned(),
        format!("title {}", escape_batch(&profile.name)),
    ];
    if !profile.note.is_empty() {
        lines.push(format!("rem {}", escape_batch(&profile.note)));
    }

    match &profile.endpoint {
        Endpoint::Rdp(rdp) => rdp_steps(&mut lines, profile, rdp),
        Endpoint::Ssh(ssh) => lines.push(ssh_command(&profile.host, ssh)),
    }
    lines.push("endlocal".to_owned());

    let mut text = lines.join(LINE_END);
    text.push_str(LINE_END);
    text
}

fn rdp_steps(lines: &mut Vec<String>, profile: &Profile, rdp: &RdpSettings) {
    if !rdp.rdp_username.is_empty() {
        let target = format!("{CREDENTIAL_TARGET_PREFIX}{}", profile.host);
        let mut command = format!(
            "cmdkey /generic:{} /user:{}",
            batch_arg(&target),
            batch_arg(&rdp.rdp_username)
        );
        if let Some(password) = &profile.password {
            command.push_str(&format!(" /pass:{}", batch_arg(password)));
        }
        lines.push(command);
    }

    let mut launch = format!("start \"\" mstsc /v:{}", batch_arg(&profile.host));
    if rdp.rdp_fullscreen {
        launch.push_str(" /f");
    }
    if rdp.rdp_admin {
        launch.push_str(" /admin");
    }
    lines.push(launch);
}

fn ssh_command(host: &str, ssh: &SshSettings) -> String {
    let mut command = String::from("ssh");
    if ssh.port != DEFAULT_SSH_PORT {
        command.push_str(&format!(" -p {}", ssh.port));
    }
    let target = if ssh.username.is_empty() {
        host.to_owned()
    } else {
        format!("{}@{host}", ssh.username)
    };
    command.push_str(" -- ");
    command.push_str(&batch_arg(&target));
    command
}

/// Escapes `value` so cmd.exe reads it back as literal text inside a batch
/// file: `%` is doubled and `^ & | < > ( ) "` are caret-prefixed. Control
/// characters become spaces since a value cannot span lines.
pub fn escape_batch(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '%' => escaped.push_str("%%"),
            '^' | '&' | '|' | '<' | '>' | '(' | ')' | '"' => {
                escaped.push('^');
                escaped.push(ch);
            }
            '\t' => escaped.push(ch),
            ch if ch.is_control() => escaped.push(' '),
            ch => escaped.push(ch),
        }
    }
    escaped
}

fn batch_arg(value: &str) -> String {
    escape_batch(&quote_argv(value))
}

// Quoting understood by the MSVC runtime's command-line splitter: embedded
// quotes become `\"` and the backslashes in front of a quote are doubled.
fn quote_argv(value: &str) -> String {
    if !value.is_empty() && !value.chars().any(|ch| ch.is_whitespace() || ch == '"') {
        return value.to_owned();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for ch in value.chars() {
        match ch {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(std::iter::repeat_n('\\', backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            ch => {
                quoted.extend(std::iter::repeat_n('\\', backslashes));
                quoted.push(ch);
                backslashes = 0;
            }
        }
    }
    quoted.extend(std::iter::repeat_n('\\', backslashes * 2));
    quoted.push('"');
    quoted
}

fn sanitize(value: &str) -> (String, bool) {
    let mut lossy = false;
    let sanitized: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-') {
                ch
            } else {
                lossy = true;
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        return ("profile".to_owned(), true);
    }
    (sanitized, lossy)
}
