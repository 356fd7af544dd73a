//! Command parsing.
//!
//! Commands arrive either as a single line or as argv. Both forms are
//! validated at submission time on the caller's thread; only well-formed
//! commands reach the engine, so malformed input is always reported
//! synchronously and never burns a reply slot.

use crate::error::{Error, Result};

/// A validated command, ready to run on the engine thread.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// Load and play a file, or append it to the playlist.
    Loadfile { path: String, append: bool },
    /// Stop playback and clear the playlist.
    Stop,
    /// Seek relative to the current position, in seconds.
    Seek { offset: f64 },
    /// Advance to the next playlist entry.
    PlaylistNext,
    /// Tear the engine down.
    Quit,
    /// Dispatch a scripting binding to a named client.
    ScriptDispatch {
        target: String,
        arg0: i32,
        kind: String,
    },
    /// Set a property through the property layer.
    Set { name: String, value: String },
}

/// Parses the argv form.
pub(crate) fn parse_argv<S: AsRef<str>>(args: &[S]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    match *args.as_slice() {
        ["loadfile", path] => Ok(Command::Loadfile {
            path: path.to_string(),
            append: false,
        }),
        ["loadfile", path, "append"] => Ok(Command::Loadfile {
            path: path.to_string(),
            append: true,
        }),
        ["stop"] => Ok(Command::Stop),
        ["seek", offset] => offset
            .parse()
            .map(|offset| Command::Seek { offset })
            .map_err(|_| Error::InvalidParameter),
        ["playlist-next"] => Ok(Command::PlaylistNext),
        ["quit"] => Ok(Command::Quit),
        ["script-dispatch", target, arg0] => parse_dispatch(target, arg0, "press"),
        ["script-dispatch", target, arg0, kind] => parse_dispatch(target, arg0, kind),
        ["set", name, value] => Ok(Command::Set {
            name: name.to_string(),
            value: value.to_string(),
        }),
        _ => Err(Error::InvalidParameter),
    }
}

fn parse_dispatch(target: &str, arg0: &str, kind: &str) -> Result<Command> {
    let arg0 = arg0.parse().map_err(|_| Error::InvalidParameter)?;
    Ok(Command::ScriptDispatch {
        target: target.to_string(),
        arg0,
        kind: kind.to_string(),
    })
}

/// Parses the single-line form. Tokens are split on whitespace; double
/// quotes group a token and backslash escapes the next character inside
/// quotes.
pub(crate) fn parse_line(line: &str) -> Result<Command> {
    let tokens = tokenize(line)?;
    parse_argv(&tokens)
}

fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut started = false;
    let mut in_quotes = false;

    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                started = true;
            }
            '\\' if in_quotes => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err(Error::InvalidParameter),
            },
            c if c.is_whitespace() && !in_quotes => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if in_quotes {
        return Err(Error::InvalidParameter);
    }
    if started {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_argv() {
        assert_eq!(
            parse_argv(&["loadfile", "a.mkv"]).unwrap(),
            Command::Loadfile {
                path: "a.mkv".into(),
                append: false
            }
        );
        assert_eq!(
            parse_argv(&["loadfile", "a.mkv", "append"]).unwrap(),
            Command::Loadfile {
                path: "a.mkv".into(),
                append: true
            }
        );
        assert_eq!(parse_argv(&["stop"]).unwrap(), Command::Stop);
        assert_eq!(parse_argv(&["seek", "-2.5"]).unwrap(), Command::Seek { offset: -2.5 });
        assert_eq!(parse_argv(&["quit"]).unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_argv_rejects_malformed() {
        assert_eq!(parse_argv::<&str>(&[]), Err(Error::InvalidParameter));
        assert_eq!(parse_argv(&["frobnicate"]), Err(Error::InvalidParameter));
        assert_eq!(parse_argv(&["loadfile"]), Err(Error::InvalidParameter));
        assert_eq!(
            parse_argv(&["loadfile", "a", "b", "c"]),
            Err(Error::InvalidParameter)
        );
        assert_eq!(parse_argv(&["seek", "fast"]), Err(Error::InvalidParameter));
        assert_eq!(
            parse_argv(&["script-dispatch", "osc", "NaN"]),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn test_parse_line_splits_and_quotes() {
        assert_eq!(
            parse_line("loadfile \"with space.mkv\"").unwrap(),
            Command::Loadfile {
                path: "with space.mkv".into(),
                append: false
            }
        );
        assert_eq!(
            parse_line("  set   volume   85  ").unwrap(),
            Command::Set {
                name: "volume".into(),
                value: "85".into()
            }
        );
        assert_eq!(
            parse_line(r#"loadfile "quo\"ted.mkv""#).unwrap(),
            Command::Loadfile {
                path: "quo\"ted.mkv".into(),
                append: false
            }
        );
    }

    #[test]
    fn test_parse_line_rejects_unterminated_quote() {
        assert_eq!(parse_line("loadfile \"oops"), Err(Error::InvalidParameter));
        assert_eq!(parse_line(""), Err(Error::InvalidParameter));
    }

    #[test]
    fn test_parse_line_empty_quoted_token() {
        // An explicitly quoted empty argument is still an argument.
        assert_eq!(
            parse_line("loadfile \"\"").unwrap(),
            Command::Loadfile {
                path: String::new(),
                append: false
            }
        );
    }
}
