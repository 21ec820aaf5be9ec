//! Repairs stray double quotes in a published CSV export.
//!
//! Free-text cells in the roster sometimes contain a lone `"` (for example an
//! inch mark or an unbalanced quotation), which makes a strict CSV reader
//! reject the whole feed. A quote is kept only where it can open a field (at
//! the start of input or right after a delimiter or line break) or close one
//! (right before a delimiter, a line break, or the end of input). Every other
//! quote is dropped.

pub fn sanitize_quotes(input: &[u8]) -> Vec<u8> {
    let is_break = |b: u8| b == b',' || b == b'\n' || b == b'\r';
    let mut out = Vec::with_capacity(input.len());
    let mut in_quotes = false;

    for (i, &b) in input.iter().enumerate() {
        if b == b'"' {
            let at_field_start = i == 0 || is_break(input[i - 1]);
            let at_field_end = i + 1 == input.len() || is_break(input[i + 1]);
            if !in_quotes && at_field_start {
                in_quotes = true;
            } else if in_quotes && at_field_end {
                in_quotes = false;
            } else {
                continue;
            }
        }
        out.push(b);
    }
    out
}
