//! Query text normalisation

/// Normalise a query before validation and execution.
///
/// Removes null bytes, strips `#` comments and collapses every whitespace run
/// to a single space. A `#` opens a comment only at the start of a line or
/// right after whitespace, so fragment separators inside IRIs are kept. Inline
/// comments inside a query body are always removed along with the rest of
/// their line.
///
/// The function is idempotent: `sanitize(sanitize(q)) == sanitize(q)`.
pub fn sanitize(query: &str) -> String {
    let without_nul = query.replace('\0', "");
    without_nul
        .lines()
        .map(strip_comment)
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_comment(line: &str) -> &str {
    let mut after_whitespace = true;
    for (i, c) in line.char_indices() {
        if c == '#' && after_whitespace {
            return &line[..i];
        }
        after_whitespace = c.is_whitespace();
    }
    line
}
