use std::borrow::Cow;

#[inline(always)]
fn char_to_digit(c: u8) -> Option<u32> {
    char::from(c).to_digit(16)
}

/// Decodes one key or value of a query string:
/// - Replaces `+` with a space
/// - Decodes percent-encoded bytes
///
/// A `%` that is not followed by two hex digits is kept as-is.
/// The result is raw bytes, UTF-8 validation is up to the caller.
pub fn decode(input: &[u8]) -> Cow<'_, [u8]> {
    if !input.iter().any(|&b| b == b'+' || b == b'%') {
        return Cow::Borrowed(input);
    }

    let mut decoded = Vec::with_capacity(input.len());
    let mut idx = 0;

    while idx < input.len() {
        match input[idx] {
            b'+' => {
                decoded.push(b' ');
                idx += 1;
            }
            b'%' => {
                let hex = input
                    .get(idx + 1)
                    .and_then(|h| char_to_digit(*h))
                    .zip(input.get(idx + 2).and_then(|l| char_to_digit(*l)));
                match hex {
                    Some((h, l)) => {
                        decoded.push(h as u8 * 0x10 + l as u8);
                        idx += 3;
                    }
                    None => {
                        decoded.push(b'%');
                        idx += 1;
                    }
                }
            }
            b => {
                decoded.push(b);
                idx += 1;
            }
        }
    }

    Cow::Owned(decoded)
}
