//! Balanced-bracket scanning shared by rule compilation, rewriting, and the turtle.
//!
//! All positions are byte offsets into the scanned text. Only `(` and `)` count
//! as brackets; the turtle's `[`/`]` branch symbols are ordinary characters here.

use crate::error::CompileError;
use std::ops::Range;

/// Returns the index of the `)` that brings the bracket depth of `text` back to zero.
///
/// Scanning starts at depth 0, so `text` normally begins with the `(` being matched.
pub fn find_matching_close(text: &str) -> Result<usize, CompileError> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(CompileError::UnbalancedClose { position: i });
                }
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(CompileError::UnbalancedOpen)
}

/// Splits the contents of one argument list into its top-level arguments.
///
/// `text` is what sits *between* the enclosing brackets, so `"a,b(c,d),e"` yields
/// the ranges of `a`, `b(c,d)` and `e`. An empty list yields no arguments.
pub fn split_top_level_args(text: &str) -> Result<Vec<Range<usize>>, CompileError> {
    let mut ranges = Vec::new();
    if text.is_empty() {
        return Ok(ranges);
    }

    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Err(CompileError::UnbalancedClose { position: i });
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                ranges.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(CompileError::UnbalancedOpen);
    }
    ranges.push(start..text.len());
    Ok(ranges)
}

/// Collects every argument slot of every top-level bracket group in `body`,
/// left to right across the whole string.
///
/// For `A(x,y)[B(z)]` this is the ranges of `x`, `y` and `z`. The ordering is what
/// lets compiled slot expressions be spliced back into the same body later.
pub fn slot_ranges(body: &str) -> Result<Vec<Range<usize>>, CompileError> {
    let mut slots = Vec::new();
    let mut i = 0;
    while i < body.len() {
        match body.as_bytes()[i] {
            b'(' => {
                let close = i + find_matching_close(&body[i..]).map_err(|e| offset(e, i))?;
                let inner = i + 1;
                let args =
                    split_top_level_args(&body[inner..close]).map_err(|e| offset(e, inner))?;
                slots.extend(args.into_iter().map(|r| r.start + inner..r.end + inner));
                i = close + 1;
            }
            b')' => return Err(CompileError::UnbalancedClose { position: i }),
            _ => i += 1,
        }
    }
    Ok(slots)
}

fn offset(err: CompileError, by: usize) -> CompileError {
    match err {
        CompileError::UnbalancedClose { position } => CompileError::UnbalancedClose {
            position: position + by,
        },
        other => other,
    }
}
