//! Opening-tag parsing: tag name, attribute list, self-closing flag.
//!
//! The grammar is deliberately forgiving, matching what scrapers meet in the
//! wild: names are any run of bytes that is not ASCII whitespace, `/` or `>`
//! (so `_:funny-name1` and custom elements work); values are double-quoted,
//! single-quoted (the other quote char may appear raw inside), or bare;
//! whitespace including newlines is allowed around `=`; a bare name with no
//! `=` has no value. Attribute names are ASCII-lowercased and duplicates are
//! resolved last-wins. Values are entity-decoded.

use crate::entities::decode_entities;

/// Ordered attribute map with case-insensitive keys.
///
/// Keys are stored lowercased. Re-inserting an existing key overwrites its
/// value in place, so iteration order is first-insertion order while the
/// last duplicate wins. A `None` value is a valueless attribute (`<e async>`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrMap {
    entries: Vec<(String, Option<String>)>,
}

impl AttrMap {
    pub(crate) fn insert(&mut self, name: String, value: Option<String>) {
        debug_assert!(!name.chars().any(|c| c.is_ascii_uppercase()));
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// `None` if the attribute is absent, `Some(None)` if it is valueless.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_deref())
    }

    /// The attribute's value, flattening absent and valueless to `None`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }
}

impl<'a> FromIterator<(&'a str, Option<&'a str>)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, Option<&'a str>)>>(iter: I) -> Self {
        let mut map = AttrMap::default();
        for (name, value) in iter {
            map.insert(name.to_ascii_lowercase(), value.map(str::to_owned));
        }
        map
    }
}

/// One parsed opening tag.
#[derive(Clone, Debug)]
pub(crate) struct StartTag {
    /// Tag name, ASCII-lowercased.
    pub(crate) name: String,
    pub(crate) attrs: AttrMap,
    pub(crate) self_closing: bool,
    /// Offset just past the closing `>`.
    pub(crate) end: usize,
}

/// Parse exactly one opening tag at byte offset `at`.
///
/// Returns `None` when no complete tag starts there: not a `<`, no ASCII
/// letter after it, or no closing `>` before end of input (quoted attribute
/// values hide any `>` inside them, and an unterminated quote swallows the
/// rest of the input).
pub(crate) fn parse_start_tag(html: &str, at: usize) -> Option<StartTag> {
    let bytes = html.as_bytes();
    let len = bytes.len();
    if bytes.get(at) != Some(&b'<') {
        return None;
    }
    let name_start = at + 1;
    if !bytes.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }

    let is_name_byte = |b: u8| !b.is_ascii_whitespace() && b != b'/' && b != b'>';
    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    let mut i = name_start;
    while i < len && is_name_byte(bytes[i]) {
        i += 1;
    }
    // Name runs end at an ASCII structural byte, so slice ends stay on
    // UTF-8 boundaries even when the run itself holds multi-byte chars.
    debug_assert!(html.is_char_boundary(i));
    let name = html[name_start..i].to_ascii_lowercase();

    let mut attrs = AttrMap::default();
    let mut self_closing = false;

    loop {
        skip_whitespace(&mut i);
        if i >= len {
            return None; // never saw the closing '>'
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            if bytes.get(i + 1) == Some(&b'>') {
                self_closing = true;
                i += 2;
                break;
            }
            i += 1;
            continue;
        }

        let attr_start = i;
        while i < len && is_name_byte(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        if i == attr_start {
            // stray byte that can start neither a name nor the tag end
            i += 1;
            continue;
        }
        debug_assert!(html.is_char_boundary(i));
        let attr_name = html[attr_start..i].to_ascii_lowercase();

        skip_whitespace(&mut i);
        let value = if i < len && bytes[i] == b'=' {
            while i < len && bytes[i] == b'=' {
                i += 1;
            }
            skip_whitespace(&mut i);
            if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < len && bytes[i] != quote {
                    i += 1;
                }
                if i >= len {
                    return None; // unterminated quote swallows the tag end
                }
                debug_assert!(html.is_char_boundary(i));
                let raw = &html[value_start..i];
                i += 1;
                Some(decode_entities(raw))
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>') {
                        break;
                    }
                    i += 1;
                }
                debug_assert!(html.is_char_boundary(i));
                Some(decode_entities(&html[value_start..i]))
            }
        } else {
            None
        };
        attrs.insert(attr_name, value);
    }

    Some(StartTag {
        name,
        attrs,
        self_closing,
        end: i,
    })
}

/// Parse the attribute list of one opening tag.
///
/// `tag_text` is expected to start with the tag; anything that does not parse
/// as one complete tag yields an empty map, never an error.
pub fn extract_attributes(tag_text: &str) -> AttrMap {
    parse_start_tag(tag_text, 0)
        .map(|tag| tag.attrs)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, Option<&str>)]) -> AttrMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn extract_attributes_quoting_styles() {
        assert_eq!(extract_attributes(r#"<e x="y">"#), attrs(&[("x", Some("y"))]));
        assert_eq!(extract_attributes("<e x='y'>"), attrs(&[("x", Some("y"))]));
        assert_eq!(extract_attributes("<e x=y>"), attrs(&[("x", Some("y"))]));
        assert_eq!(
            extract_attributes(r#"<e x="a 'b' c">"#),
            attrs(&[("x", Some("a 'b' c"))])
        );
        assert_eq!(
            extract_attributes(r#"<e x='a "b" c'>"#),
            attrs(&[("x", Some("a \"b\" c"))])
        );
        assert_eq!(extract_attributes(r#"<e x="'">"#), attrs(&[("x", Some("'"))]));
        assert_eq!(extract_attributes(r#"<e x='"'>"#), attrs(&[("x", Some("\""))]));
    }

    #[test]
    fn extract_attributes_entities() {
        assert_eq!(extract_attributes(r#"<e x="&#121;">"#), attrs(&[("x", Some("y"))]));
        assert_eq!(extract_attributes(r#"<e x="&#x79;">"#), attrs(&[("x", Some("y"))]));
        assert_eq!(extract_attributes(r#"<e x="&amp;">"#), attrs(&[("x", Some("&"))]));
        assert_eq!(extract_attributes(r#"<e x="&quot;">"#), attrs(&[("x", Some("\""))]));
        assert_eq!(extract_attributes(r#"<e x="&pound;">"#), attrs(&[("x", Some("£"))]));
        assert_eq!(extract_attributes(r#"<e x="&lambda;">"#), attrs(&[("x", Some("λ"))]));
        assert_eq!(extract_attributes(r#"<e x="&foo">"#), attrs(&[("x", Some("&foo"))]));
    }

    #[test]
    fn extract_attributes_unicode_values() {
        assert_eq!(
            extract_attributes("<e x=\"Fáilte 世界 \u{1F600}\">"),
            attrs(&[("x", Some("Fáilte 世界 \u{1F600}"))])
        );
        assert_eq!(
            extract_attributes(r#"<e x="Smile &#128512;!">"#),
            attrs(&[("x", Some("Smile \u{1F600}!"))])
        );
        assert_eq!(
            extract_attributes(r#"<e x="décompose&#769;">"#),
            attrs(&[("x", Some("décompose\u{301}"))])
        );
    }

    #[test]
    fn extract_attributes_valueless_and_bare() {
        assert_eq!(extract_attributes("<e x >"), attrs(&[("x", None)]));
        assert_eq!(
            extract_attributes("<e x=y a>"),
            attrs(&[("x", Some("y")), ("a", None)])
        );
        assert_eq!(extract_attributes("<e x= y>"), attrs(&[("x", Some("y"))]));
    }

    #[test]
    fn extract_attributes_whitespace_around_equals() {
        assert_eq!(extract_attributes("<e \nx=\ny\n>"), attrs(&[("x", Some("y"))]));
        assert_eq!(extract_attributes("<e \nx=\n\"y\"\n>"), attrs(&[("x", Some("y"))]));
        assert_eq!(extract_attributes("<e \nx=\n'y'\n>"), attrs(&[("x", Some("y"))]));
        assert_eq!(
            extract_attributes("<e \nx=\"\ny\n\">"),
            attrs(&[("x", Some("\ny\n"))])
        );
    }

    #[test]
    fn extract_attributes_case_and_duplicates() {
        assert_eq!(extract_attributes("<e CAPS=x>"), attrs(&[("caps", Some("x"))]));
        assert_eq!(extract_attributes("<e x=1 X=2>"), attrs(&[("x", Some("2"))]));
        assert_eq!(extract_attributes("<e X=1 x=2>"), attrs(&[("x", Some("2"))]));
        assert_eq!(
            extract_attributes("<e x=1 y=2 x=3>"),
            attrs(&[("x", Some("3")), ("y", Some("2"))])
        );
    }

    #[test]
    fn extract_attributes_funny_names() {
        assert_eq!(
            extract_attributes("<e _:funny-name1=1>"),
            attrs(&[("_:funny-name1", Some("1"))])
        );
    }

    #[test]
    fn extract_attributes_malformed_tag_yields_empty_map() {
        assert_eq!(extract_attributes(r#"<mal"formed/>"#), AttrMap::default());
        assert_eq!(extract_attributes("no tag at all"), AttrMap::default());
        assert_eq!(extract_attributes("<e x=\"unterminated"), AttrMap::default());
        assert_eq!(extract_attributes("<e never closed"), AttrMap::default());
        assert_eq!(extract_attributes("</e>"), AttrMap::default());
    }

    #[test]
    fn attr_map_lookup_rules() {
        let map = extract_attributes("<e Class=\"foo bar\" async x=1>");
        assert_eq!(map.get("class"), Some(Some("foo bar")));
        assert_eq!(map.get("CLASS"), Some(Some("foo bar")));
        assert_eq!(map.get("async"), Some(None));
        assert_eq!(map.value("async"), None);
        assert_eq!(map.get("missing"), None);
        assert!(map.contains("x"));
        assert_eq!(map.len(), 3);
        let order: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["class", "async", "x"]);
    }

    #[test]
    fn parse_start_tag_reports_end_and_self_closing() {
        let html = r#"pad <img src="a.png" /> rest"#;
        let at = html.find('<').unwrap();
        let tag = parse_start_tag(html, at).expect("complete tag");
        assert_eq!(tag.name, "img");
        assert!(tag.self_closing);
        assert_eq!(&html[at..tag.end], r#"<img src="a.png" />"#);
    }

    #[test]
    fn parse_start_tag_gt_inside_quotes_does_not_end_tag() {
        let html = r#"<img greater_a='1>0' greater_b="1>0">"#;
        let tag = parse_start_tag(html, 0).expect("complete tag");
        assert_eq!(tag.end, html.len());
        assert_eq!(tag.attrs.value("greater_a"), Some("1>0"));
        assert_eq!(tag.attrs.value("greater_b"), Some("1>0"));
    }

    #[test]
    fn parse_start_tag_rejects_non_tags() {
        assert!(parse_start_tag("< div>", 0).is_none());
        assert!(parse_start_tag("<1tag>", 0).is_none());
        assert!(parse_start_tag("text", 0).is_none());
        assert!(parse_start_tag("", 0).is_none());
    }

    #[test]
    fn extract_attributes_empty_bare_value() {
        assert_eq!(extract_attributes("<e x=>"), attrs(&[("x", Some(""))]));
    }
}
