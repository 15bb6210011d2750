//! Name escaping for stack and function names.
//!
//! Names are embedded in whitespace-separated token streams, so every
//! whitespace character is written as `\u` plus four hex digits and literal
//! backslashes are doubled.

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' {
            out.push_str("\\\\");
        } else if c.is_whitespace() {
            out.push_str(&format!("\\u{:04x}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

pub fn unescape(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('\\') => {
                out.push('\\');
                i += 2;
            }
            Some('u') => match decode_hex4(&chars[i + 2..]) {
                Some(c) => {
                    out.push(c);
                    i += 6;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            },
            _ => {
                out.push('\\');
                i += 1;
            }
        }
    }

    out
}

fn decode_hex4(chars: &[char]) -> Option<char> {
    if chars.len() < 4 {
        return None;
    }
    let digits: String = chars[..4].iter().collect();
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_whitespace_and_backslash() {
        assert_eq!(escape("my stack"), "my\\u0020stack");
        assert_eq!(escape("tab\there"), "tab\\u0009here");
        assert_eq!(escape("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        for name in ["my stack", "a\\b", "\\u0020 literal", "line\nbreak", "plain"] {
            assert_eq!(unescape(&escape(name)), name);
        }
    }

    #[test]
    fn test_unescape_respects_escaped_backslash() {
        // `\\u0020` is an escaped backslash followed by the text `u0020`
        assert_eq!(unescape("\\\\u0020"), "\\u0020");
        assert_eq!(unescape("x\\u0020y"), "x y");
        assert_eq!(unescape("bad\\uzz"), "bad\\uzz");
    }
}
