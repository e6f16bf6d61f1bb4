//! Escape decoding for URLs lifted out of JSON-in-HTML.
//!
//! Rules, applied left to right in one pass:
//! - `\uXXXX` becomes the code point (surrogate pairs are joined)
//! - `\/` becomes `/`, `\"` becomes `"`
//! - any other backslash is dropped

/// Decode a raw matched URL.
pub fn decode_escapes(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('u') => match hex4(&chars, i + 2) {
                Some(unit) => {
                    i += 6;
                    if (0xD800..0xDC00).contains(&unit) {
                        // high surrogate: join with a following `\uDC00..\uDFFF`
                        let low = match (chars.get(i), chars.get(i + 1)) {
                            (Some('\\'), Some('u')) => hex4(&chars, i + 2).filter(|l| (0xDC00..0xE000).contains(l)),
                            _ => None,
                        };
                        if let Some(low) = low {
                            let cp = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                            out.extend(char::from_u32(cp));
                            i += 6;
                        }
                    } else {
                        out.extend(char::from_u32(unit));
                    }
                }
                // `\u` without four hex digits: drop the backslash, keep the rest
                None => i += 1,
            },
            Some('/') => {
                out.push('/');
                i += 2;
            }
            Some('"') => {
                out.push('"');
                i += 2;
            }
            _ => i += 1,
        }
    }

    out
}

fn hex4(chars: &[char], start: usize) -> Option<u32> {
    let digits = chars.get(start..start + 4)?;
    digits.iter().try_fold(0u32, |acc, c| c.to_digit(16).map(|d| acc * 16 + d))
}
