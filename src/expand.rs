//! `${NAME}` expansion.
//! Replaces braced variable references in arbitrary text with values supplied by
//! a lookup function, in the manner of `envsubst` but restricted to the braced form.
//! `$${NAME}` escapes a reference and yields the literal `${NAME}`.

use std::borrow::Cow;

/// Expands every `${name}` in `s` using `mapping`.
///
/// Malformed references (`${` with no closing brace, or `${}`) are dropped from
/// the output rather than reported. When nothing was expanded the input is
/// returned as-is, borrowed.
///
/// # Arguments
/// * `s` - Text to expand
/// * `mapping` - Resolves a variable name to its value; called once per reference,
///   left to right
///
/// # Example
/// ```
/// use subst::expand::expand;
///
/// let out = expand("home=${HOME}, raw=$${HOME}", |name| match name {
///     "HOME" => "/home/gopher",
///     _ => "",
/// });
/// assert_eq!(out, "home=/home/gopher, raw=${HOME}");
/// ```
pub fn expand<F, S>(s: &str, mapping: F) -> Cow<'_, str>
where
    F: FnMut(&str) -> S,
    S: AsRef<str>,
{
    match expand_bytes(s.as_bytes(), mapping) {
        Cow::Borrowed(_) => Cow::Borrowed(s),
        // Cuts only happen at ASCII delimiters and every value is a `str`, so
        // valid input always yields valid output.
        Cow::Owned(out) => Cow::Owned(
            String::from_utf8(out)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        ),
    }
}

/// Expands every `${name}` in arbitrary bytes using `mapping`.
///
/// Bytes outside references are copied through untouched, whether or not they
/// are valid UTF-8. A name that is not valid UTF-8 is looked up lossily.
///
/// # Example
/// ```
/// use subst::expand::expand_bytes;
///
/// let out = expand_bytes(b"caf\xe9 ${X}", |_| "<X>");
/// assert_eq!(&*out, b"caf\xe9 <X>");
/// ```
pub fn expand_bytes<F, S>(s: &[u8], mut mapping: F) -> Cow<'_, [u8]>
where
    F: FnMut(&str) -> S,
    S: AsRef<str>,
{
    let mut buf: Option<Vec<u8>> = None;
    let mut i = 0;
    let mut j = 0;

    while j < s.len() {
        if s[j] != b'$' || s.get(j + 1) != Some(&b'{') {
            j += 1;
            continue;
        }

        let out = buf.get_or_insert_with(|| Vec::with_capacity(2 * s.len()));
        out.extend_from_slice(&s[i..j]);

        if j > 0 && s[j - 1] == b'$' {
            // `$${`: the first `$` was just flushed, drop this one and copy
            // the braces through as ordinary text.
            i = j + 1;
            j += 2;
            continue;
        }

        let (name, width) = shell_name(&s[j + 1..]);
        if let Some(name) = name {
            out.extend_from_slice(mapping(&*String::from_utf8_lossy(name)).as_ref().as_bytes());
        }
        i = j + width + 1;
        j = i;
    }

    match buf {
        Some(mut out) => {
            out.extend_from_slice(&s[i..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(s),
    }
}

/// Reports whether `c` names a special shell variable such as `$*`.
fn is_shell_special_var(c: u8) -> bool {
    matches!(
        c,
        b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-' | b'0'..=b'9'
    )
}

/// Reads the name at the start of `s`, which begins with `{`.
///
/// Returns the name (`None` for invalid syntax) and the number of bytes consumed,
/// counting both braces. Invalid syntax still consumes bytes so the caller can
/// drop them: `{}` eats two, an unterminated `{` eats one.
fn shell_name(s: &[u8]) -> (Option<&[u8]>, usize) {
    if s.len() > 2 && is_shell_special_var(s[1]) && s[2] == b'}' {
        return (Some(&s[1..2]), 3);
    }

    match s.iter().skip(1).position(|&c| c == b'}') {
        Some(0) => (None, 2),
        Some(offset) => {
            let close = offset + 1;
            (Some(&s[1..close]), close + 1)
        }
        None => (None, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_getenv(name: &str) -> &'static str {
        match name {
            "*" => "all the args",
            "#" => "NARGS",
            "$" => "PID",
            "1" => "ARGUMENT1",
            "HOME" => "/usr/gopher",
            "H" => "(Value of H)",
            "home_1" => "/usr/foo",
            "_" => "underscore",
            _ => "",
        }
    }

    #[test]
    fn test_expand_table() {
        let cases = [
            ("", ""),
            ("$*", "$*"),
            ("${*}", "all the args"),
            ("$$", "$$"),
            ("${$}", "PID"),
            ("$1", "$1"),
            ("${1}", "ARGUMENT1"),
            ("now is the time", "now is the time"),
            ("$home_1", "$home_1"),
            ("${home_1}", "/usr/foo"),
            ("$${home_1}", "${home_1}"),
            ("$HOME", "$HOME"),
            ("${HOME}", "/usr/gopher"),
            ("$${HOME}", "${HOME}"),
            ("${H}OME", "(Value of H)OME"),
            ("$${H}OME", "${H}OME"),
            ("${_}", "underscore"),
            ("$", "$"),
            ("$}", "$}"),
            ("start$+middle$^end$", "start$+middle$^end$"),
            ("mixed$|bag$$$", "mixed$|bag$$$"),
            ("mixed$|bag${$}$", "mixed$|bagPID$"),
            ("A$$$#$1$H$home_1*B", "A$$$#$1$H$home_1*B"),
            ("A$${$}#${1}${H}${home_1}*B", "A${$}#ARGUMENT1(Value of H)/usr/foo*B"),
            (
                "Hello {{ printf \"${HOME}\" }}",
                "Hello {{ printf \"/usr/gopher\" }}",
            ),
            (
                "Hello {{ printf \"$HOME\" }}",
                "Hello {{ printf \"$HOME\" }}",
            ),
            (
                "Hello {{ printf \"$$HOME\" }}",
                "Hello {{ printf \"$$HOME\" }}",
            ),
            (
                "Hello {{ printf \"$${HOME}\" }}",
                "Hello {{ printf \"${HOME}\" }}",
            ),
            // invalid syntax is eaten
            ("${", ""),
            ("${}", ""),
            ("start${+middle}${^end}$", "start$"),
        ];

        for (input, expected) in cases {
            assert_eq!(expand(input, test_getenv), expected, "expand({input:?})");
        }
    }

    #[test]
    fn test_unterminated_reference_keeps_tail() {
        assert_eq!(expand("a${HOME", test_getenv), "aHOME");
        assert_eq!(expand("${}x", test_getenv), "x");
    }

    #[test]
    fn test_no_reference_is_borrowed() {
        let input = "plain $text, $$ and $ { } only";
        assert!(matches!(expand(input, test_getenv), Cow::Borrowed(s) if s == input));
    }

    #[test]
    fn test_non_ascii_passthrough() {
        assert_eq!(
            expand("héllo ${H} wörld ✓", test_getenv),
            "héllo (Value of H) wörld ✓"
        );
        assert_eq!(expand("${ñ}", |name: &str| name.to_uppercase()), "Ñ");
    }

    #[test]
    fn test_lookup_order_and_count() {
        let mut calls = Vec::new();
        let out = expand("${b}$${skip}${a}${}${b}${", |name: &str| {
            calls.push(name.to_string());
            name.len().to_string()
        });
        assert_eq!(out, "1${skip}11");
        assert_eq!(calls, ["b", "a", "b"]);
    }

    #[test]
    fn test_shell_name() {
        assert_eq!(shell_name(b"{*}"), (Some(&b"*"[..]), 3));
        assert_eq!(shell_name(b"{HOME}x"), (Some(&b"HOME"[..]), 6));
        assert_eq!(shell_name(b"{12}"), (Some(&b"12"[..]), 4));
        assert_eq!(shell_name(b"{}"), (None, 2));
        assert_eq!(shell_name(b"{"), (None, 1));
        assert_eq!(shell_name(b"{abc"), (None, 1));
    }

    #[test]
    fn test_expand_bytes_keeps_invalid_utf8() {
        let out = expand_bytes(b"caf\xe9 ${H} \xff$${H}\n", test_getenv);
        assert_eq!(&*out, b"caf\xe9 (Value of H) \xff${H}\n");

        let plain = b"\xc3\x28 no references";
        assert!(matches!(expand_bytes(plain, test_getenv), Cow::Borrowed(b) if b == plain));
    }

    #[test]
    fn test_expand_bytes_lossy_name() {
        let out = expand_bytes(b"${a\xe9}", |name: &str| format!("<{name}>"));
        assert_eq!(&*out, "<a\u{FFFD}>".as_bytes());
    }
}
