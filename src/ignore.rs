//! Precomputed spans of text that heuristic pre-scans must not look inside:
//! comment bodies and the payload of `<script>`/`<style>` elements.
//!
//! The index only guards pre-scans that locate candidate tags by raw byte
//! inspection. The tag scanner itself handles comments and rawtext elements
//! on its own and does not consult this.
//!
//! Construction walks the markers in one pass: `<!--` and `<script …>` /
//! `<style …>` open a span, `-->` / `--!>` (the `--!>` parse-error form is
//! tolerated) and `</script …>` / `</style …>` close one. The gap before a
//! closing marker is ignored even without a preceding opener (a leftover
//! comment tail), and a trailing unterminated opener ignores through the end
//! of input. Marker text itself is never inside a span.

use std::ops::Range;

use memchr::memchr2;

#[derive(Clone, Debug, Default)]
pub struct IgnoreRanges {
    ranges: Vec<Range<usize>>,
}

impl IgnoreRanges {
    pub fn new(html: &str) -> Self {
        let bytes = html.as_bytes();
        let mut ranges: Vec<Range<usize>> = Vec::new();
        let mut prev_end = 0usize;
        let mut open_tail = false;
        let mut i = 0;

        while i < bytes.len() {
            // Every marker starts with '<' (comments, script/style tags)
            // or '-' (comment terminators).
            let Some(rel) = memchr2(b'<', b'-', &bytes[i..]) else {
                break;
            };
            let pos = i + rel;
            let Some((end, closes)) = marker_at(bytes, pos) else {
                i = pos + 1;
                continue;
            };
            if closes && prev_end < pos {
                ranges.push(prev_end..pos);
            }
            prev_end = end;
            open_tail = !closes;
            i = end;
        }

        if open_tail && prev_end < bytes.len() {
            ranges.push(prev_end..bytes.len());
        }

        Self { ranges }
    }

    /// Whether `offset` lies inside a comment or script/style payload.
    pub fn contains(&self, offset: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= offset);
        self.ranges.get(idx).is_some_and(|r| r.start <= offset)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }
}

/// Parse the marker starting at `pos`, returning the offset just past it and
/// whether it closes an ignored span.
fn marker_at(bytes: &[u8], pos: usize) -> Option<(usize, bool)> {
    match bytes[pos] {
        b'-' => {
            if bytes[pos..].starts_with(b"--!>") {
                Some((pos + 4, true))
            } else if bytes[pos..].starts_with(b"-->") {
                Some((pos + 3, true))
            } else {
                None
            }
        }
        b'<' => {
            if bytes[pos..].starts_with(b"<!--") {
                return Some((pos + 4, false));
            }
            let mut j = pos + 1;
            let closes = bytes.get(j) == Some(&b'/');
            if closes {
                j += 1;
            }
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let name_len = if starts_with_ignore_ascii_case(bytes, j, b"script") {
                6
            } else if starts_with_ignore_ascii_case(bytes, j, b"style") {
                5
            } else {
                return None;
            };
            j += name_len;
            // word boundary after the name, so <scripty> never matches
            if bytes
                .get(j)
                .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_')
            {
                return None;
            }
            while j < bytes.len() && bytes[j] != b'>' {
                j += 1;
            }
            if j >= bytes.len() {
                return None;
            }
            Some((j + 1, closes))
        }
        _ => None,
    }
}

fn starts_with_ignore_ascii_case(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}
