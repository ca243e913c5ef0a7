//! Compound command splitting and normalization.
//!
//! A command's risk is the maximum risk of its parts, so the policy engine
//! evaluates every sub-command independently. Splitting is quote-aware and
//! also surfaces commands hidden inside `$(...)`, backticks, `sh -c '...'`
//! payloads, and `eval` arguments.

/// Nesting limit for substitutions and `sh -c` payloads.
const MAX_DEPTH: usize = 4;

/// Shells whose `-c` payload is itself a command line.
const SHELLS: &[&str] = &["sh", "bash", "zsh", "dash", "ksh"];

/// Prefix commands that run their arguments as a command.
const WRAPPERS: &[&str] = &["time", "nohup", "command", "builtin", "exec", "stdbuf"];

/// One simple command extracted from a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCommand {
    /// Text as written, whitespace-collapsed.
    pub text: String,
    /// Text with env assignments, wrapper commands, quotes, and binary
    /// paths removed. Prefix rules match against this form.
    pub normalized: String,
}

/// Split a command line into its simple commands.
///
/// Operators `&&`, `||`, `;`, `|`, `&`, and newlines separate commands.
/// Bodies of substitutions and shell payloads are appended after the
/// command that contains them.
pub fn split_command(command: &str) -> Vec<SubCommand> {
    let mut out = Vec::new();
    collect(command, 0, &mut out);
    out
}

/// Words of each top-level simple command, with quotes removed and wrapper
/// commands stripped. Quoted whitespace, newlines included, is kept.
pub fn command_words(command: &str) -> Vec<Vec<String>> {
    let (segments, _) = split_segments(command);
    segments
        .iter()
        .map(|segment| strip_wrappers(shell_words(strip_grouping(segment))))
        .filter(|words| !words.is_empty())
        .collect()
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect(command: &str, depth: usize, out: &mut Vec<SubCommand>) {
    let (segments, substitutions) = split_segments(command);
    for segment in segments {
        let text = collapse_whitespace(strip_grouping(&segment));
        if text.is_empty() {
            continue;
        }
        let words = shell_words(strip_grouping(&segment));
        let words = strip_wrappers(words);
        let normalized = words.join(" ");
        let payload = if depth < MAX_DEPTH {
            nested_payload(&words)
        } else {
            None
        };
        out.push(SubCommand { text, normalized });
        if let Some(payload) = payload {
            collect(&payload, depth + 1, out);
        }
    }
    if depth < MAX_DEPTH {
        for sub in substitutions {
            collect(&sub, depth + 1, out);
        }
    }
}

/// Split on unquoted operators. Returns the segments and the bodies of
/// every command substitution encountered.
fn split_segments(command: &str) -> (Vec<String>, Vec<String>) {
    let chars: Vec<char> = command.chars().collect();
    let mut segments = Vec::new();
    let mut substitutions = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if in_single {
            if c == '\'' {
                in_single = false;
            }
            current.push(c);
            i += 1;
            continue;
        }

        match c {
            '\\' => {
                current.push(c);
                if let Some(n) = next {
                    current.push(n);
                    i += 1;
                }
            }
            '\'' if !in_double => {
                in_single = true;
                current.push(c);
            }
            '"' => {
                in_double = !in_double;
                current.push(c);
            }
            '$' if next == Some('(') => {
                let close = matching_paren(&chars, i + 1);
                let end = close.unwrap_or(chars.len() - 1);
                let body: String = chars
                    .get(i + 2..close.unwrap_or(chars.len()))
                    .map(|body| body.iter().collect())
                    .unwrap_or_default();
                current.extend(&chars[i..=end]);
                substitutions.push(body);
                i = end;
            }
            '`' => {
                let end = (i + 1..chars.len())
                    .find(|&j| chars[j] == '`' && chars[j - 1] != '\\')
                    .unwrap_or(chars.len());
                let body: String = chars[i + 1..end].iter().collect();
                current.extend(&chars[i..end.min(chars.len())]);
                if end < chars.len() {
                    current.push('`');
                }
                substitutions.push(body);
                i = end;
            }
            _ if in_double => current.push(c),
            '#' if current.is_empty() || current.ends_with(char::is_whitespace) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            ';' | '\n' => segments.push(std::mem::take(&mut current)),
            '|' => {
                segments.push(std::mem::take(&mut current));
                if next == Some('|') || next == Some('&') {
                    i += 1;
                }
            }
            '&' => {
                let redirect = current.ends_with('>') || current.ends_with('<') || next == Some('>');
                if redirect {
                    current.push(c);
                } else {
                    segments.push(std::mem::take(&mut current));
                    if next == Some('&') {
                        i += 1;
                    }
                }
            }
            _ => current.push(c),
        }
        i += 1;
    }
    segments.push(current);
    (segments, substitutions)
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut in_single = false;
    let mut in_double = false;
    for (j, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' if !in_single && !in_double => depth += 1,
            ')' if !in_single && !in_double => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove unbalanced subshell / group delimiters around a segment.
fn strip_grouping(segment: &str) -> &str {
    let mut s = segment.trim();
    loop {
        let opens = s.matches(['(', '{']).count();
        let closes = s.matches([')', '}']).count();
        if opens > closes && (s.starts_with('(') || s.starts_with('{')) {
            s = s[1..].trim_start();
        } else if closes > opens && (s.ends_with(')') || s.ends_with('}')) {
            s = s[..s.len() - 1].trim_end();
        } else {
            return s;
        }
    }
}

/// Split into words the way a POSIX shell would, removing quotes.
pub fn shell_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if in_single {
            if c == '\'' {
                in_single = false;
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '\\' => {
                if let Some(n) = chars.next() {
                    current.push(n);
                }
                in_word = true;
            }
            '\'' if !in_double => {
                in_single = true;
                in_word = true;
            }
            '"' => {
                in_double = !in_double;
                in_word = true;
            }
            c if c.is_whitespace() && !in_double => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            _ => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

fn is_assignment(word: &str) -> bool {
    let Some((name, _)) = word.split_once('=') else {
        return false;
    };
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Drop leading env assignments and wrapper commands, and reduce an
/// absolute binary path to its file name.
fn strip_wrappers(words: Vec<String>) -> Vec<String> {
    let mut words = std::collections::VecDeque::from(words);
    loop {
        let Some(first) = words.front() else { break };
        if is_assignment(first) {
            let _ = words.pop_front();
        } else if first == "env" {
            let _ = words.pop_front();
            while words
                .front()
                .is_some_and(|w| w.starts_with('-') || is_assignment(w))
            {
                let _ = words.pop_front();
            }
        } else if first == "nice" {
            let _ = words.pop_front();
            if words.front().is_some_and(|w| w == "-n") {
                let _ = words.pop_front();
                let _ = words.pop_front();
            } else if words.front().is_some_and(|w| w.starts_with('-')) {
                let _ = words.pop_front();
            }
        } else if first == "timeout" {
            let _ = words.pop_front();
            while let Some(flag) = words.front().filter(|w| w.starts_with('-')).cloned() {
                let _ = words.pop_front();
                if flag == "-s" || flag == "-k" {
                    let _ = words.pop_front();
                }
            }
            let _ = words.pop_front();
        } else if WRAPPERS.contains(&first.as_str()) {
            let _ = words.pop_front();
        } else {
            break;
        }
    }
    if let Some(first) = words.front_mut() {
        if first.starts_with('/') && !first.ends_with('/') {
            if let Some(name) = first.rsplit('/').next() {
                *first = name.to_string();
            }
        }
    }
    words.into()
}

/// Payload of `sh -c '...'` or `eval ...`, if the command is one.
fn nested_payload(words: &[String]) -> Option<String> {
    let first = words.first()?;
    if first == "eval" && words.len() > 1 {
        return Some(words[1..].join(" "));
    }
    if !SHELLS.contains(&first.as_str()) {
        return None;
    }
    let flag_pos = words
        .iter()
        .position(|w| w.starts_with('-') && !w.starts_with("--") && w.contains('c'))?;
    words.get(flag_pos + 1).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(cmd: &str) -> Vec<String> {
        split_command(cmd).into_iter().map(|s| s.normalized).collect()
    }

    #[test]
    fn command_words_keep_quoted_newlines() {
        let words = command_words("git add . && /usr/bin/git commit -m \"feat: add x\n\nbody\"");
        assert_eq!(words.len(), 2);
        assert_eq!(words[1], vec!["git", "commit", "-m", "feat: add x\n\nbody"]);
    }

    #[test]
    fn splits_on_operators() {
        assert_eq!(
            normalized("rm -rf /tmp/x && ls; pwd | wc -l || echo fail"),
            vec!["rm -rf /tmp/x", "ls", "pwd", "wc -l", "echo fail"]
        );
    }

    #[test]
    fn quoted_operators_are_literal() {
        assert_eq!(
            normalized(r#"echo "a && b; c | d" && ls"#),
            vec!["echo a && b; c | d", "ls"]
        );
        assert_eq!(normalized("echo 'x;y'"), vec!["echo x;y"]);
    }

    #[test]
    fn background_and_newline_split() {
        assert_eq!(normalized("sleep 1 & rm -rf /\nls"), vec!["sleep 1", "rm -rf /", "ls"]);
    }

    #[test]
    fn redirect_ampersand_is_not_a_separator() {
        assert_eq!(normalized("make 2>&1 | tee log"), vec!["make 2>&1", "tee log"]);
        assert_eq!(normalized("make &> out"), vec!["make &> out"]);
    }

    #[test]
    fn substitution_bodies_are_included() {
        let subs = normalized("echo $(rm -rf / && ls) done");
        assert_eq!(subs[0], "echo $(rm -rf / && ls) done");
        assert!(subs.contains(&"rm -rf /".to_string()));
        assert!(subs.contains(&"ls".to_string()));
    }

    #[test]
    fn backtick_bodies_are_included() {
        let subs = normalized("echo `whoami`");
        assert!(subs.contains(&"whoami".to_string()));
    }

    #[test]
    fn shell_c_payload_is_included() {
        let subs = normalized("bash -c 'curl x && rm -rf ~'");
        assert_eq!(subs[0], "bash -c curl x && rm -rf ~");
        assert!(subs.contains(&"rm -rf ~".to_string()));
        assert!(subs.contains(&"curl x".to_string()));
    }

    #[test]
    fn eval_payload_is_included() {
        let subs = normalized("eval \"git push --force\"");
        assert!(subs.contains(&"git push --force".to_string()));
    }

    #[test]
    fn wrappers_and_assignments_stripped() {
        assert_eq!(normalized("FOO=1 BAR=2 env -i nohup time rm -rf x"), vec!["rm -rf x"]);
        assert_eq!(normalized("timeout -s KILL 10 make test"), vec!["make test"]);
        assert_eq!(normalized("nice -n 5 cargo build"), vec!["cargo build"]);
    }

    #[test]
    fn absolute_binary_path_reduced() {
        assert_eq!(normalized("/bin/rm -rf /"), vec!["rm -rf /"]);
    }

    #[test]
    fn subshell_grouping_stripped() {
        assert_eq!(normalized("(cd /tmp && ls)"), vec!["cd /tmp", "ls"]);
    }

    #[test]
    fn comments_ignored() {
        assert_eq!(normalized("ls # && rm -rf /"), vec!["ls"]);
    }

    #[test]
    fn unbalanced_substitution_does_not_panic() {
        let subs = normalized("echo $(");
        assert_eq!(subs[0], "echo $(");
        let subs = normalized("echo $(ls");
        assert!(subs.contains(&"ls".to_string()));
    }

    #[test]
    fn empty_segments_skipped() {
        assert!(split_command("  ;; && ").is_empty());
    }

    #[test]
    fn shell_words_handles_escapes() {
        assert_eq!(shell_words(r"a\ b 'c d' e"), vec!["a b", "c d", "e"]);
    }
}
