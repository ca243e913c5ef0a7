//! Commit attempts and `git commit` command parsing.

use std::path::Path;

use tracing::debug;
use warden_policy::command_words;

/// Identity fields supplied with a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFields {
    /// `--author` value.
    pub author: Option<String>,
    /// `--trailer` values.
    pub trailers: Vec<String>,
}

/// A proposed commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitAttempt {
    /// Message text; `None` when git will open an editor or reuse a message.
    pub message: Option<String>,
    /// Author and trailers.
    pub author_fields: AuthorFields,
    /// Safety-relevant flags seen on the command (`--no-verify`, `--no-gpg-sign`).
    pub flags: Vec<String>,
    /// `-c key=value` overrides passed to git.
    pub config_overrides: Vec<String>,
}

impl CommitAttempt {
    /// Attempt with a message and nothing else.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Parse the first `git commit` in a command line.
    ///
    /// Returns `None` when the command contains no commit. `-m` values are
    /// joined with a blank line the way git does; `-F <file>` is read
    /// relative to `cwd` when the file exists.
    #[must_use]
    pub fn from_command(command: &str, cwd: &Path) -> Option<Self> {
        command_words(command)
            .into_iter()
            .find_map(|words| parse_git_commit(&words, cwd))
    }

    /// Whether git will prompt for the message itself.
    #[must_use]
    pub fn is_editor_mode(&self) -> bool {
        self.message.is_none()
    }
}

/// Git global options that take a separate value.
const GIT_GLOBAL_WITH_VALUE: &[&str] = &["-C", "-c", "--git-dir", "--work-tree", "--namespace"];

fn parse_git_commit(words: &[String], cwd: &Path) -> Option<CommitAttempt> {
    if words.first().map(String::as_str) != Some("git") {
        return None;
    }

    let mut attempt = CommitAttempt::default();
    let mut i = 1;
    while let Some(word) = words.get(i) {
        if !word.starts_with('-') {
            break;
        }
        if word == "-c" {
            if let Some(value) = words.get(i + 1) {
                attempt.config_overrides.push(value.clone());
            }
        } else if let Some(value) = word.strip_prefix("-c") {
            attempt.config_overrides.push(value.to_string());
        }
        i += if GIT_GLOBAL_WITH_VALUE.contains(&word.as_str()) { 2 } else { 1 };
    }
    if words.get(i).map(String::as_str) != Some("commit") {
        return None;
    }

    let mut messages: Vec<String> = Vec::new();
    let mut file_message: Option<String> = None;
    let mut args = words[i + 1..].iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--" => break,
            "-m" | "--message" => messages.extend(args.next().cloned()),
            "-F" | "--file" => file_message = args.next().and_then(|f| read_message_file(f, cwd)),
            "--author" => attempt.author_fields.author = args.next().cloned(),
            "--trailer" => attempt.author_fields.trailers.extend(args.next().cloned()),
            "--no-verify" | "--no-gpg-sign" => attempt.flags.push(arg.clone()),
            "-C" | "-c" | "--reuse-message" | "--reedit-message" | "--fixup" | "--squash" => {
                let _ = args.next();
            }
            long if long.starts_with("--") => {
                if let Some(v) = long.strip_prefix("--message=") {
                    messages.push(v.to_string());
                } else if let Some(v) = long.strip_prefix("--file=") {
                    file_message = read_message_file(v, cwd);
                } else if let Some(v) = long.strip_prefix("--author=") {
                    attempt.author_fields.author = Some(v.to_string());
                } else if let Some(v) = long.strip_prefix("--trailer=") {
                    attempt.author_fields.trailers.push(v.to_string());
                }
            }
            short if short.starts_with('-') && short.len() > 1 => {
                // clustered short flags such as `-am msg` or `-nm msg`
                let cluster = &short[1..];
                for (pos, flag) in cluster.char_indices() {
                    match flag {
                        'n' => attempt.flags.push("--no-verify".to_string()),
                        'm' | 'F' => {
                            let rest = &cluster[pos + 1..];
                            let value = if rest.is_empty() {
                                args.next().cloned()
                            } else {
                                Some(rest.to_string())
                            };
                            if flag == 'm' {
                                messages.extend(value);
                            } else {
                                file_message = value.and_then(|f| read_message_file(&f, cwd));
                            }
                            break;
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    attempt.message = if messages.is_empty() {
        file_message
    } else {
        Some(messages.join("\n\n"))
    };
    debug!(
        has_message = attempt.message.is_some(),
        flags = attempt.flags.len(),
        "parsed git commit"
    );
    Some(attempt)
}

fn read_message_file(file: &str, cwd: &Path) -> Option<String> {
    if file == "-" {
        return None;
    }
    let path = cwd.join(file);
    std::fs::read_to_string(&path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: &str) -> Option<CommitAttempt> {
        CommitAttempt::from_command(cmd, Path::new("/nonexistent"))
    }

    #[test]
    fn not_a_commit() {
        assert!(parse("git status").is_none());
        assert!(parse("echo git commit").is_none());
        assert!(parse("ls -la").is_none());
    }

    #[test]
    fn single_message() {
        let a = parse("git commit -m 'feat: add parser support'").unwrap();
        assert_eq!(a.message.as_deref(), Some("feat: add parser support"));
        assert!(a.flags.is_empty());
    }

    #[test]
    fn multiple_messages_joined_with_blank_line() {
        let a = parse(r#"git commit -m "fix: handle empty input" -m "Body text""#).unwrap();
        assert_eq!(a.message.as_deref(), Some("fix: handle empty input\n\nBody text"));
    }

    #[test]
    fn clustered_flags() {
        let a = parse("git commit -am 'chore: bump deps now'").unwrap();
        assert_eq!(a.message.as_deref(), Some("chore: bump deps now"));
        let b = parse("git commit -nm 'chore: skip hooks'").unwrap();
        assert_eq!(b.flags, vec!["--no-verify"]);
    }

    #[test]
    fn long_forms() {
        let a = parse("git commit --message='docs: explain config' --author='A <a@x>'").unwrap();
        assert_eq!(a.message.as_deref(), Some("docs: explain config"));
        assert_eq!(a.author_fields.author.as_deref(), Some("A <a@x>"));
    }

    #[test]
    fn compound_and_global_options() {
        let a = parse("git add -A && git -c core.hooksPath=/dev/null commit --no-verify -m 'x'")
            .unwrap();
        assert_eq!(a.config_overrides, vec!["core.hooksPath=/dev/null"]);
        assert_eq!(a.flags, vec!["--no-verify"]);
    }

    #[test]
    fn editor_mode() {
        let a = parse("git commit --amend --no-edit").unwrap();
        assert!(a.is_editor_mode());
    }

    #[test]
    fn message_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("msg.txt"), "feat: read from file\n").unwrap();
        let a = CommitAttempt::from_command("git commit -F msg.txt", dir.path()).unwrap();
        assert_eq!(a.message.as_deref(), Some("feat: read from file\n"));
    }
}
