//! Single-pass tag scanner for malformed real-world HTML.
//!
//! One forward pass over an in-memory string yields [`Tag`] records carrying
//! byte offsets into the source; no DOM is built and no text is copied. The
//! scanner keeps a stack of open tags to reconcile closing tags against, and
//! records enough nesting structure to hand results back in source order, in
//! close order, or as a tree.
//!
//! Malformed input is the normal case, not the exception. In
//! [`ParseMode::Relaxed`] (the default) stray, malnested and malformed
//! closing tags are tolerated with deterministic recovery; in
//! [`ParseMode::Strict`] each of those defects aborts the pass with a
//! descriptive [`HtmlParseError`].

use std::error::Error;
use std::fmt;

use memchr::memchr;

use crate::attrs::{AttrMap, parse_start_tag};

/// Elements that never have children or a closing tag.
fn is_void_tag(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// How the scanner reacts to structurally invalid HTML.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Reject invalid structure with an [`HtmlParseError`].
    Strict,
    /// Recover silently; third-party HTML is routinely invalid.
    #[default]
    Relaxed,
}

/// Order in which a scan returns its accepted tags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TagOrder {
    /// Source order: each tag before its children (document order).
    #[default]
    Opened,
    /// Close order: each tag after its children, siblings in source order.
    Closed,
}

/// Callback verdict when an accepted tag closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnClose {
    /// Keep the tag in the scan result.
    Accept,
    /// Drop the tag from the result; its children are kept.
    Reject,
    /// End the pass immediately.
    Stop,
}

/// Structural parse error, raised only in [`ParseMode::Strict`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtmlParseError {
    /// `</x>` with no open `x` on the stack.
    StrayClosingTag { name: String },
    /// End of input with tags still open, innermost first, deduplicated.
    UnclosedTags { names: Vec<String> },
    /// Closing tag found below the stack top; `expected_after` renders the
    /// intervening open tags as closing tags, innermost first.
    MalnestedClosingTag { name: String, expected_after: String },
    /// Closing-tag text itself is ill-formed (a stray `<` inside the name).
    MalformedClosingTag { name: String },
}

impl fmt::Display for HtmlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlParseError::StrayClosingTag { name } => {
                write!(f, "stray closing tag '{name}'")
            }
            HtmlParseError::UnclosedTags { names } => {
                write!(f, "unclosed tag ")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{name}'")?;
                }
                Ok(())
            }
            HtmlParseError::MalnestedClosingTag {
                name,
                expected_after,
            } => {
                write!(
                    f,
                    "malnested closing tag '{name}', expected after '{expected_after}'"
                )
            }
            HtmlParseError::MalformedClosingTag { name } => {
                write!(f, "malformed closing tag '{name}'")
            }
        }
    }
}

impl Error for HtmlParseError {}

/// One accepted element, addressed by byte offsets into the scanned source.
///
/// `text()` and `html()` are zero-copy slices of the source. Equality (and
/// comparison against `&str`) is by tag name only, so result lists can be
/// asserted against bare name strings.
#[derive(Clone)]
pub struct Tag<'a> {
    name: String,
    source: &'a str,
    start: usize,
    open_end: usize,
    close: Option<(usize, usize)>,
    attrs: AttrMap,
}

impl<'a> Tag<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.attrs
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_some()
    }

    /// The literal opening-tag text, `<` through `>`.
    pub fn opening_tag(&self) -> &'a str {
        &self.source[self.start..self.open_end]
    }

    /// Outer HTML: opening tag through matching close. An element that never
    /// closed yields just its opening-tag literal.
    pub fn html(&self) -> &'a str {
        match self.close {
            Some((_, stop)) => &self.source[self.start..stop],
            None => self.opening_tag(),
        }
    }

    /// Inner text: everything between the opening and closing tag, with
    /// children's own markup left in place. Empty when the element never
    /// closed.
    pub fn text(&self) -> &'a str {
        match self.close {
            Some((close_start, _)) => &self.source[self.open_end..close_start],
            None => "",
        }
    }

    pub fn text_and_html(&self) -> (&'a str, &'a str) {
        (self.text(), self.html())
    }
}

impl PartialEq for Tag<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl PartialEq<str> for Tag<'_> {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for Tag<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl fmt::Display for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Tag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.name)
    }
}

/// Node of the nested result tree; siblings keep source order.
#[derive(Debug)]
pub struct TagNode<'a> {
    pub tag: Tag<'a>,
    pub children: Vec<TagNode<'a>>,
}

/// The scanner itself: a parse mode plus per-call scratch state.
///
/// Every scan call starts from a clean slate, so one instance can be reused
/// for any number of sequential scans; results only depend on the input.
#[derive(Clone, Copy, Debug, Default)]
pub struct TagScanner {
    mode: ParseMode,
}

impl TagScanner {
    pub fn new(mode: ParseMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Scan `html` and return every tag, in the requested order.
    pub fn taglist<'a>(
        &self,
        html: &'a str,
        order: TagOrder,
    ) -> Result<Vec<Tag<'a>>, HtmlParseError> {
        self.scan_with(html, order, |_, _| true, |_| OnClose::Accept)
    }

    /// Scan `html` and return the accepted tags as a nested tree.
    pub fn tag_tree<'a>(&self, html: &'a str) -> Result<Vec<TagNode<'a>>, HtmlParseError> {
        let mut pass = Pass::new(html, self.mode);
        pass.run(&mut |_, _| true, &mut |_| OnClose::Accept)?;
        pass.check_unclosed()?;
        Ok(pass.into_tree())
    }

    /// Scan `html` with custom materialization and close handling.
    ///
    /// `predicate(name, attrs)` decides whether an opening tag is
    /// materialized at all; rejected tags still count for nesting depth.
    /// `on_close(tag)` runs when a materialized tag closes (immediately for
    /// void/self-closing tags) and can keep it, drop it, or stop the pass.
    pub fn scan_with<'a, P, C>(
        &self,
        html: &'a str,
        order: TagOrder,
        mut predicate: P,
        mut on_close: C,
    ) -> Result<Vec<Tag<'a>>, HtmlParseError>
    where
        P: FnMut(&str, &AttrMap) -> bool,
        C: FnMut(&Tag<'a>) -> OnClose,
    {
        let mut pass = Pass::new(html, self.mode);
        pass.run(&mut predicate, &mut on_close)?;
        // The unclosed check runs even after an early stop.
        pass.check_unclosed()?;
        Ok(pass.into_taglist(order))
    }
}

/// Stack entry: rejected tags keep only their name, so they still take part
/// in close-tag reconciliation without being materialized.
struct StackEntry {
    name: String,
    tag: Option<usize>,
}

struct NestNode {
    tag: usize,
    kept: bool,
    children: Vec<usize>,
}

/// End-tag constructs as the byte scan classifies them.
enum CloseTag {
    /// A closing tag to reconcile; the raw name may contain `<`.
    Tag {
        raw_name: String,
        span: (usize, usize),
        resume: usize,
    },
    /// `</` followed by a non-letter; skipped without an event.
    Bogus { resume: usize },
    /// No `>` before end of input; nothing more can be parsed.
    Incomplete,
}

/// Scratch state of one scan pass.
struct Pass<'a> {
    html: &'a str,
    mode: ParseMode,
    tags: Vec<Option<Tag<'a>>>,
    nodes: Vec<NestNode>,
    roots: Vec<usize>,
    open_nodes: Vec<usize>,
    stack: Vec<StackEntry>,
}

impl<'a> Pass<'a> {
    fn new(html: &'a str, mode: ParseMode) -> Self {
        Self {
            html,
            mode,
            tags: Vec::new(),
            nodes: Vec::new(),
            roots: Vec::new(),
            open_nodes: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn run(
        &mut self,
        predicate: &mut dyn FnMut(&str, &AttrMap) -> bool,
        on_close: &mut dyn FnMut(&Tag<'a>) -> OnClose,
    ) -> Result<(), HtmlParseError> {
        let html = self.html;
        let bytes = html.as_bytes();
        let len = bytes.len();
        let mut i = 0;

        while i < len {
            if bytes[i] != b'<' {
                match memchr(b'<', &bytes[i..]) {
                    Some(rel) => i += rel,
                    None => break,
                }
                continue;
            }

            if html[i..].starts_with("<!--") {
                match html[i + 4..].find("-->") {
                    Some(rel) => i += 4 + rel + 3,
                    None => break, // unterminated comment runs to end of input
                }
                continue;
            }

            if bytes.get(i + 1) == Some(&b'/') {
                match parse_close_tag(html, i) {
                    CloseTag::Tag {
                        raw_name,
                        span,
                        resume,
                    } => {
                        if self.handle_close(raw_name, span, on_close)? {
                            break;
                        }
                        i = resume;
                    }
                    CloseTag::Bogus { resume } => i = resume,
                    CloseTag::Incomplete => break,
                }
                continue;
            }

            if bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
                let Some(tag) = parse_start_tag(html, i) else {
                    break; // opening tag with no '>' before end of input
                };
                let rawtext: Option<&[u8]> = if tag.self_closing {
                    None
                } else {
                    match tag.name.as_str() {
                        "script" => Some(b"</script"),
                        "style" => Some(b"</style"),
                        _ => None,
                    }
                };
                let end = tag.end;
                if self.handle_open(i, tag, predicate, on_close) {
                    break;
                }
                if let Some(close_pat) = rawtext {
                    // The payload is literal text up to the matching close
                    // tag; markup inside it is never tokenized.
                    match find_rawtext_close_tag(&html[end..], close_pat) {
                        Some(rel_start) => i = end + rel_start,
                        None => break, // stays open to end of input
                    }
                    continue;
                }
                i = end;
                continue;
            }

            if matches!(bytes.get(i + 1), Some(&b'!') | Some(&b'?')) {
                // declarations and processing instructions carry no tags
                match memchr(b'>', &bytes[i + 1..]) {
                    Some(rel) => i += 1 + rel + 1,
                    None => break,
                }
                continue;
            }

            i += 1;
        }

        Ok(())
    }

    /// Returns true when the callback asked to stop.
    fn handle_open(
        &mut self,
        start: usize,
        tag: crate::attrs::StartTag,
        predicate: &mut dyn FnMut(&str, &AttrMap) -> bool,
        on_close: &mut dyn FnMut(&Tag<'a>) -> OnClose,
    ) -> bool {
        let is_open = !tag.self_closing && !is_void_tag(&tag.name);

        if predicate(&tag.name, &tag.attrs) {
            let tag_idx = self.tags.len();
            let node_idx = self.nodes.len();
            self.nodes.push(NestNode {
                tag: tag_idx,
                kept: true,
                children: Vec::new(),
            });
            match self.open_nodes.last() {
                Some(&parent) => self.nodes[parent].children.push(node_idx),
                None => self.roots.push(node_idx),
            }

            let mut materialized = Tag {
                name: tag.name.clone(),
                source: self.html,
                start,
                open_end: tag.end,
                close: None,
                attrs: tag.attrs,
            };

            if is_open {
                self.tags.push(Some(materialized));
                self.open_nodes.push(node_idx);
                self.stack.push(StackEntry {
                    name: tag.name,
                    tag: Some(tag_idx),
                });
            } else {
                materialized.close = Some((tag.end, tag.end));
                self.tags.push(Some(materialized));
                return self.dispatch_close(tag_idx, node_idx, on_close);
            }
        } else if is_open {
            self.stack.push(StackEntry {
                name: tag.name,
                tag: None,
            });
        }

        false
    }

    /// Reconcile one closing tag. Returns true when the callback asked to
    /// stop; strict mode turns each defect into an error instead.
    fn handle_close(
        &mut self,
        raw_name: String,
        span: (usize, usize),
        on_close: &mut dyn FnMut(&Tag<'a>) -> OnClose,
    ) -> Result<bool, HtmlParseError> {
        let mut name = raw_name.to_ascii_lowercase();
        if let Some(lt) = name.find('<') {
            if self.mode == ParseMode::Strict {
                return Err(HtmlParseError::MalformedClosingTag { name });
            }
            log::trace!(
                target: "htmlscan.scanner",
                "truncating malformed closing tag '{name}' at offset {}",
                span.0
            );
            name.truncate(lt);
        }

        let Some(pos) = self.stack.iter().rposition(|entry| entry.name == name) else {
            if self.mode == ParseMode::Strict {
                return Err(HtmlParseError::StrayClosingTag { name });
            }
            log::trace!(
                target: "htmlscan.scanner",
                "ignoring stray closing tag '{name}' at offset {}",
                span.0
            );
            return Ok(false);
        };

        if pos != self.stack.len() - 1 {
            if self.mode == ParseMode::Strict {
                let expected_after: String = self.stack[pos + 1..]
                    .iter()
                    .rev()
                    .map(|entry| format!("</{}>", entry.name))
                    .collect();
                return Err(HtmlParseError::MalnestedClosingTag {
                    name,
                    expected_after,
                });
            }
            log::trace!(
                target: "htmlscan.scanner",
                "closing malnested tag '{name}' below {} open tag(s)",
                self.stack.len() - 1 - pos
            );
        }

        // Only the matched entry leaves the stack; anything opened above it
        // stays and may still be closed later.
        let entry = self.stack.remove(pos);
        if let Some(tag_idx) = entry.tag {
            if let Some(tag) = self.tags[tag_idx].as_mut() {
                tag.close = Some(span);
            }
            // One nesting level per accepted close, whichever entry matched.
            let node_idx = self.open_nodes.pop().unwrap_or(self.nodes.len());
            return Ok(self.dispatch_close(tag_idx, node_idx, on_close));
        }
        Ok(false)
    }

    fn dispatch_close(
        &mut self,
        tag_idx: usize,
        node_idx: usize,
        on_close: &mut dyn FnMut(&Tag<'a>) -> OnClose,
    ) -> bool {
        let verdict = match self.tags[tag_idx].as_ref() {
            Some(tag) => on_close(tag),
            None => OnClose::Accept,
        };
        match verdict {
            OnClose::Accept => false,
            OnClose::Reject => {
                if let Some(node) = self.nodes.get_mut(node_idx) {
                    node.kept = false;
                }
                false
            }
            OnClose::Stop => true,
        }
    }

    fn check_unclosed(&self) -> Result<(), HtmlParseError> {
        if self.mode == ParseMode::Strict && !self.stack.is_empty() {
            let mut names: Vec<String> = Vec::new();
            for entry in self.stack.iter().rev() {
                if !names.iter().any(|name| name == &entry.name) {
                    names.push(entry.name.clone());
                }
            }
            return Err(HtmlParseError::UnclosedTags { names });
        }
        Ok(())
    }

    fn into_taglist(mut self, order: TagOrder) -> Vec<Tag<'a>> {
        let mut out = Vec::new();
        let roots = std::mem::take(&mut self.roots);
        for node in roots {
            self.flatten_node(node, order, &mut out);
        }
        out
    }

    fn flatten_node(&mut self, node_idx: usize, order: TagOrder, out: &mut Vec<Tag<'a>>) {
        let children = std::mem::take(&mut self.nodes[node_idx].children);
        if order == TagOrder::Opened {
            self.emit(node_idx, out);
        }
        for child in children {
            self.flatten_node(child, order, out);
        }
        if order == TagOrder::Closed {
            self.emit(node_idx, out);
        }
    }

    fn emit(&mut self, node_idx: usize, out: &mut Vec<Tag<'a>>) {
        if self.nodes[node_idx].kept
            && let Some(tag) = self.tags[self.nodes[node_idx].tag].take()
        {
            out.push(tag);
        }
    }

    fn into_tree(mut self) -> Vec<TagNode<'a>> {
        let roots = std::mem::take(&mut self.roots);
        roots
            .into_iter()
            .filter_map(|node| self.build_node(node))
            .collect()
    }

    fn build_node(&mut self, node_idx: usize) -> Option<TagNode<'a>> {
        let children_idx = std::mem::take(&mut self.nodes[node_idx].children);
        let children = children_idx
            .into_iter()
            .filter_map(|child| self.build_node(child))
            .collect();
        let tag = self.tags[self.nodes[node_idx].tag].take()?;
        Some(TagNode { tag, children })
    }
}

/// Classify the end-tag construct starting at `at` (`bytes[at..at+2]` is
/// known to be `</`). The name run tolerates any byte but whitespace, `/`
/// and `>` — a raw `<` inside it marks the malformed-closing-tag defect —
/// and the construct consumes through the first `>` after the name.
fn parse_close_tag(html: &str, at: usize) -> CloseTag {
    let bytes = html.as_bytes();
    let len = bytes.len();
    let mut j = at + 2;
    while j < len && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    if j >= len {
        return CloseTag::Incomplete;
    }
    if !bytes[j].is_ascii_alphabetic() {
        return match memchr(b'>', &bytes[j..]) {
            Some(rel) => CloseTag::Bogus {
                resume: j + rel + 1,
            },
            None => CloseTag::Incomplete,
        };
    }

    let name_start = j;
    while j < len && !bytes[j].is_ascii_whitespace() && bytes[j] != b'/' && bytes[j] != b'>' {
        j += 1;
    }
    debug_assert!(html.is_char_boundary(j));
    let raw_name = html[name_start..j].to_string();

    match memchr(b'>', &bytes[j..]) {
        Some(rel) => {
            let gt_end = j + rel + 1;
            CloseTag::Tag {
                raw_name,
                span: (at, gt_end),
                resume: gt_end,
            }
        }
        None => CloseTag::Incomplete,
    }
}

/// Find the case-insensitive `</script`/`</style` close (optional whitespace
/// before `>`) in a rawtext payload. Returns the offset of its `<` relative
/// to `haystack`; the main loop re-reads the close tag from there.
fn find_rawtext_close_tag(haystack: &str, close_tag: &[u8]) -> Option<usize> {
    let hay_bytes = haystack.as_bytes();
    let len = hay_bytes.len();
    let n = close_tag.len();
    debug_assert!(close_tag.starts_with(b"</"));
    if len < n {
        return None;
    }
    let mut i = 0;
    while i + n <= len {
        let rel = memchr(b'<', &hay_bytes[i..])?;
        i += rel;
        if i + n > len {
            return None;
        }
        if hay_bytes[i + 1] == b'/' && hay_bytes[i..i + n].eq_ignore_ascii_case(close_tag) {
            let mut k = i + n;
            while k < len && hay_bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && hay_bytes[k] == b'>' {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}
