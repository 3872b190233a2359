/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single word for a generated script.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
///
/// Plain words (paths, hostnames, service names) are left untouched so the
/// composed scripts stay readable.
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote and join multiple words.
pub fn quote_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prefix a command with `cd <dir> && `.
pub fn cd_and(dir: &str, command: &str) -> String {
    format!("cd {} && {}", quote_arg(dir.trim()), command.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_arg_simple() {
        assert_eq!(quote_arg("openmrs"), "openmrs");
        assert_eq!(quote_arg("/var/docker-volumes/cambodia1"), "/var/docker-volumes/cambodia1");
    }

    #[test]
    fn quote_arg_with_spaces() {
        assert_eq!(quote_arg("hello world"), "'hello world'");
    }

    #[test]
    fn quote_arg_with_single_quote() {
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn quote_arg_empty() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn quote_args_mixed() {
        assert_eq!(quote_args(&["proxy", "my db"]), "proxy 'my db'");
    }

    #[test]
    fn cd_and_leaves_plain_dir_unquoted() {
        assert_eq!(
            cd_and("/srv/app", "docker-compose ps"),
            "cd /srv/app && docker-compose ps"
        );
    }

    #[test]
    fn cd_and_escapes_quotes_in_dir() {
        assert_eq!(cd_and("/srv/it's", "echo ok"), "cd '/srv/it'\\''s' && echo ok");
    }
}
