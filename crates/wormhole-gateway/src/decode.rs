//! Percent-decoding for the URL segment of `/makeshort/<url>`.

use percent_encoding::percent_decode_str;

/// Decodes `%XY` escapes and `+` in `input`.
///
/// Every `%` followed by two hex digits becomes the byte `0xXY`, and `+`
/// becomes a space. A `%` that is not followed by two hex digits is kept
/// literally together with whatever follows it. Decoded bytes that do not
/// form valid UTF-8 are replaced with U+FFFD.
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(&input.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
