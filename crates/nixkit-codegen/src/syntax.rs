//! Lexical rendering of Nix literals

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use nixkit_core::names::is_identifier;

static URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+\-.]*:[a-zA-Z0-9%/?:@&=+$,\-_.!~*']+$")
        .expect("URI regex is valid")
});

static PATH_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/[a-zA-Z0-9._+\-]+)+$").expect("path regex is valid"));

/// Double-quoted string literal
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // `${` would start an interpolation
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Attribute name, bare when possible
pub fn attr_name(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        string_literal(key)
    }
}

/// Integer literal; negative values are returned unparenthesized
pub fn int_literal(n: i64) -> String {
    if n == i64::MIN {
        // The literal 9223372036854775808 does not fit, so it cannot be negated.
        format!("{} - 1", i64::MIN + 1)
    } else {
        n.to_string()
    }
}

/// Float literal for a finite value, always with a decimal point
pub fn float_literal(n: f64) -> String {
    let mut text = n.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Whether `url` can be written as a bare URI literal
pub fn is_uri(url: &str) -> bool {
    URI.is_match(url)
}

/// Path expression for an absolute, normalized path
///
/// Returns `None` for paths that are not valid UTF-8.
pub fn path_literal(path: &Path) -> Option<String> {
    let text = path.to_str()?;
    if text == "/" {
        Some("/.".to_string())
    } else if PATH_LITERAL.is_match(text) {
        Some(text.to_string())
    } else {
        Some(format!("(/. + {})", string_literal(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain", r#""plain""#)]
    #[case(r#"say "hi""#, r#""say \"hi\"""#)]
    #[case(r"C:\dir", r#""C:\\dir""#)]
    #[case("line1\nline2", r#""line1\nline2""#)]
    #[case("tab\there", r#""tab\there""#)]
    #[case("${out}/bin", r#""\${out}/bin""#)]
    #[case("$out/bin", r#""$out/bin""#)]
    #[case("costs $5", r#""costs $5""#)]
    #[case("", r#""""#)]
    fn test_string_literal(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(string_literal(input), expected);
    }

    #[rstest]
    #[case("name", "name")]
    #[case("configure-flags", "configure-flags")]
    #[case("with", r#""with""#)]
    #[case("1st", r#""1st""#)]
    #[case("a.b", r#""a.b""#)]
    #[case("", r#""""#)]
    fn test_attr_name(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(attr_name(key), expected);
    }

    #[rstest]
    #[case(1.0, "1.0")]
    #[case(0.25, "0.25")]
    #[case(-2.5, "-2.5")]
    #[case(1e21, "1000000000000000000000.0")]
    #[case(1e-7, "0.0000001")]
    fn test_float_literal(#[case] n: f64, #[case] expected: &str) {
        assert_eq!(float_literal(n), expected);
    }

    #[test]
    fn test_int_literal() {
        assert_eq!(int_literal(42), "42");
        assert_eq!(int_literal(-3), "-3");
        assert_eq!(int_literal(i64::MIN), "-9223372036854775807 - 1");
    }

    #[rstest]
    #[case("http://python.org", true)]
    #[case("mirror://gnu/hello/hello-2.12.tar.gz", true)]
    #[case("https://example.com/a?b=c&d=e", true)]
    #[case("no-scheme", false)]
    #[case("http://example.com/has space", false)]
    #[case("http://example.com/#fragment", false)]
    #[case("1http://x", false)]
    fn test_is_uri(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_uri(url), expected);
    }

    #[rstest]
    #[case("/pkgs/foo/patch.diff", "/pkgs/foo/patch.diff")]
    #[case("/", "/.")]
    #[case("/pkgs/my pkg/a", r#"(/. + "/pkgs/my pkg/a")"#)]
    fn test_path_literal(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(path_literal(Path::new(path)).unwrap(), expected);
    }
}
