use std::borrow::Cow;

use percent_encoding::AsciiSet;

/// As defined in https://url.spec.whatwg.org/#query-percent-encode-set
///
/// The set of characters that need to be encoded in a _query_ string
/// are:
/// - CONTROL characters
/// - SPACE (but we'll separately encode it as `+`)
/// - U+0022 ("), U+0023 (#), U+003C (<), and U+003E (>).
///
/// On top of the minimal set, the pair delimiters must be escaped
/// since keys and values are written out verbatim otherwise.
const QUERY_SET: &AsciiSet = &percent_encoding::CONTROLS
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    // a literal `+` would read back as a space
    .add(b'+')
    // key, value separator
    .add(b'=')
    // pair separator
    .add(b'&')
    // a literal `%` would read back as an escape
    .add(b'%');

/// As defined in https://url.spec.whatwg.org/#application-x-www-form-urlencoded-percent-encode-set
///
/// Everything except ASCII alphanumerics and `*-._` is escaped. Space is
/// left out of the set so it can be written as `+` like the query set.
const FORM_URLENCODED_SET: &AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Encodes bytes for use in a query string key or value.
///
/// Spaces come out as `+` in both modes. The function returns an iterator
/// of chunks so that the common case of nothing to escape borrows the input.
pub fn encode(b: &[u8], use_form_encoding: bool) -> impl Iterator<Item = Cow<'_, [u8]>> + '_ {
    let set = if use_form_encoding {
        FORM_URLENCODED_SET
    } else {
        QUERY_SET
    };
    percent_encoding::percent_encode(b, set).map(|s| {
        if s.as_bytes().contains(&b' ') {
            Cow::Owned(
                s.as_bytes()
                    .iter()
                    .map(|b| if *b == b' ' { b'+' } else { *b })
                    .collect(),
            )
        } else {
            Cow::Borrowed(s.as_bytes())
        }
    })
}
