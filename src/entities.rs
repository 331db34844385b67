//! Decode the HTML entities that show up in attribute values.
//!
//! Contract:
//! - Named entities decoded from a fixed table: the XML predefined names,
//!   the Latin-1/HTML 3.2 set (`&nbsp;` … `&yuml;`), the HTML 4.0 Greek
//!   letters and the common symbol/punctuation names.
//! - Numeric entities decoded only when well-formed and semicolon-terminated:
//!   `&#121;` (decimal) and `&#x1F600;` (hex).
//! - Only valid Unicode scalar values decode; invalid scalars pass through
//!   unchanged. Codepoints outside the BMP decode like any other `char`.
//! - Missing semicolons, unknown names, malformed numerics, or overlong digit
//!   runs are left unchanged.
//!
//! Combining sequences (`décompose&#769;`) decode by plain concatenation;
//! there is no normalization pass.

pub(crate) fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut copy_start = 0;

    const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
    const MAX_DEC_DIGITS: usize = 7; // 1114111
    const MAX_NAME_LEN: usize = 8; // longest table entry: "thetasym"

    // Bounded scan to avoid quadratic behavior on adversarial input.
    fn scan_numeric_entity(
        bytes: &[u8],
        start: usize,
        max_digits: usize,
        is_hex: bool,
    ) -> Option<usize> {
        let mut j = start;
        let mut digits = 0usize;

        while j < bytes.len() {
            let b = bytes[j];
            if b == b';' {
                return (digits > 0).then_some(j);
            }
            if digits == max_digits {
                return None;
            }
            let ok = if is_hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            };
            if !ok {
                return None;
            }
            digits += 1;
            j += 1;
        }

        None
    }

    fn emit_malformed_entity(out: &mut String, s: &str, bytes: &[u8], start: usize) -> usize {
        let mut j = start + 1;
        while j < bytes.len() {
            let b = bytes[j];
            // Stop at `;`, whitespace, or `&` to avoid spanning into adjacent tokens.
            if b == b';' {
                out.push_str(&s[start..=j]);
                return j + 1;
            }
            if b == b'&' {
                out.push_str(&s[start..j]);
                return j;
            }
            if b.is_ascii_whitespace() {
                out.push_str(&s[start..j]);
                return j;
            }
            j += 1;
        }
        out.push_str(&s[start..]);
        bytes.len()
    }

    fn starts_with_bytes(bytes: &[u8], i: usize, pat: &[u8]) -> bool {
        bytes.get(i..i + pat.len()).is_some_and(|s| s == pat)
    }

    while i < bytes.len() {
        if bytes[i] != b'&' {
            i += 1;
            continue;
        }

        // Flush bytes up to '&' unchanged (preserves UTF-8).
        if copy_start < i {
            out.push_str(&s[copy_start..i]);
        }

        // numeric entities: &#121; or &#x1F600;
        if starts_with_bytes(bytes, i, b"&#x") || starts_with_bytes(bytes, i, b"&#X") {
            let digits_start = i + 3;
            let Some(end) = scan_numeric_entity(bytes, digits_start, MAX_HEX_DIGITS, true) else {
                i = emit_malformed_entity(&mut out, s, bytes, i);
                copy_start = i;
                continue;
            };

            let hex = &s[digits_start..end];
            if let Some(ch) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                out.push(ch);
            } else {
                // Known end; preserve entire sequence unchanged.
                out.push_str(&s[i..=end]);
            }
            i = end + 1;
            copy_start = i;
            continue;
        } else if starts_with_bytes(bytes, i, b"&#") {
            let digits_start = i + 2;
            let Some(end) = scan_numeric_entity(bytes, digits_start, MAX_DEC_DIGITS, false) else {
                i = emit_malformed_entity(&mut out, s, bytes, i);
                copy_start = i;
                continue;
            };

            let dec = &s[digits_start..end];
            if let Some(ch) = dec.parse::<u32>().ok().and_then(char::from_u32) {
                out.push(ch);
            } else {
                out.push_str(&s[i..=end]);
            }
            i = end + 1;
            copy_start = i;
            continue;
        }

        // named entity: &name;
        let name_start = i + 1;
        let mut j = name_start;
        while j < bytes.len() && j - name_start < MAX_NAME_LEN && bytes[j].is_ascii_alphanumeric()
        {
            j += 1;
        }
        if j > name_start
            && bytes.get(j) == Some(&b';')
            && let Some(decoded) = lookup_named_entity(&s[name_start..j])
        {
            out.push_str(decoded);
            i = j + 1;
            copy_start = i;
            continue;
        }

        // unknown or unterminated reference: keep '&' as-is
        out.push('&');
        i += 1;
        copy_start = i;
    }

    if copy_start < bytes.len() {
        out.push_str(&s[copy_start..]);
    }

    out
}

fn lookup_named_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .binary_search_by_key(&name, |&(n, _)| n)
        .ok()
        .map(|idx| NAMED_ENTITIES[idx].1)
}

/// Entity names are case-sensitive; the table is sorted by name for binary
/// search (ASCII order, so uppercase names sort first).
static NAMED_ENTITIES: &[(&str, &str)] = &[
    ("AElig", "\u{C6}"), ("Aacute", "\u{C1}"), ("Acirc", "\u{C2}"), ("Agrave", "\u{C0}"),
    ("Alpha", "\u{391}"), ("Aring", "\u{C5}"), ("Atilde", "\u{C3}"), ("Auml", "\u{C4}"),
    ("Beta", "\u{392}"), ("Ccedil", "\u{C7}"), ("Chi", "\u{3A7}"), ("Dagger", "\u{2021}"),
    ("Delta", "\u{394}"), ("ETH", "\u{D0}"), ("Eacute", "\u{C9}"), ("Ecirc", "\u{CA}"),
    ("Egrave", "\u{C8}"), ("Epsilon", "\u{395}"), ("Eta", "\u{397}"), ("Euml", "\u{CB}"),
    ("Gamma", "\u{393}"), ("Iacute", "\u{CD}"), ("Icirc", "\u{CE}"), ("Igrave", "\u{CC}"),
    ("Iota", "\u{399}"), ("Iuml", "\u{CF}"), ("Kappa", "\u{39A}"), ("Lambda", "\u{39B}"),
    ("Mu", "\u{39C}"), ("Ntilde", "\u{D1}"), ("Nu", "\u{39D}"), ("OElig", "\u{152}"),
    ("Oacute", "\u{D3}"), ("Ocirc", "\u{D4}"), ("Ograve", "\u{D2}"), ("Omega", "\u{3A9}"),
    ("Omicron", "\u{39F}"), ("Oslash", "\u{D8}"), ("Otilde", "\u{D5}"), ("Ouml", "\u{D6}"),
    ("Phi", "\u{3A6}"), ("Pi", "\u{3A0}"), ("Prime", "\u{2033}"), ("Psi", "\u{3A8}"),
    ("Rho", "\u{3A1}"), ("Scaron", "\u{160}"), ("Sigma", "\u{3A3}"), ("THORN", "\u{DE}"),
    ("Tau", "\u{3A4}"), ("Theta", "\u{398}"), ("Uacute", "\u{DA}"), ("Ucirc", "\u{DB}"),
    ("Ugrave", "\u{D9}"), ("Upsilon", "\u{3A5}"), ("Uuml", "\u{DC}"), ("Xi", "\u{39E}"),
    ("Yacute", "\u{DD}"), ("Yuml", "\u{178}"), ("Zeta", "\u{396}"), ("aacute", "\u{E1}"),
    ("acirc", "\u{E2}"), ("acute", "\u{B4}"), ("aelig", "\u{E6}"), ("agrave", "\u{E0}"),
    ("alefsym", "\u{2135}"), ("alpha", "\u{3B1}"), ("amp", "&"), ("and", "\u{2227}"),
    ("ang", "\u{2220}"), ("apos", "'"), ("aring", "\u{E5}"), ("asymp", "\u{2248}"),
    ("atilde", "\u{E3}"), ("auml", "\u{E4}"), ("bdquo", "\u{201E}"), ("beta", "\u{3B2}"),
    ("brvbar", "\u{A6}"), ("bull", "\u{2022}"), ("cap", "\u{2229}"), ("ccedil", "\u{E7}"),
    ("cedil", "\u{B8}"), ("cent", "\u{A2}"), ("chi", "\u{3C7}"), ("circ", "\u{2C6}"),
    ("clubs", "\u{2663}"), ("cong", "\u{2245}"), ("copy", "\u{A9}"), ("crarr", "\u{21B5}"),
    ("cup", "\u{222A}"), ("curren", "\u{A4}"), ("dArr", "\u{21D3}"), ("dagger", "\u{2020}"),
    ("darr", "\u{2193}"), ("deg", "\u{B0}"), ("delta", "\u{3B4}"), ("diams", "\u{2666}"),
    ("divide", "\u{F7}"), ("eacute", "\u{E9}"), ("ecirc", "\u{EA}"), ("egrave", "\u{E8}"),
    ("empty", "\u{2205}"), ("emsp", "\u{2003}"), ("ensp", "\u{2002}"), ("epsilon", "\u{3B5}"),
    ("equiv", "\u{2261}"), ("eta", "\u{3B7}"), ("eth", "\u{F0}"), ("euml", "\u{EB}"),
    ("euro", "\u{20AC}"), ("exist", "\u{2203}"), ("fnof", "\u{192}"), ("forall", "\u{2200}"),
    ("frac12", "\u{BD}"), ("frac14", "\u{BC}"), ("frac34", "\u{BE}"), ("frasl", "\u{2044}"),
    ("gamma", "\u{3B3}"), ("ge", "\u{2265}"), ("gt", ">"), ("hArr", "\u{21D4}"),
    ("harr", "\u{2194}"), ("hearts", "\u{2665}"), ("hellip", "\u{2026}"), ("iacute", "\u{ED}"),
    ("icirc", "\u{EE}"), ("iexcl", "\u{A1}"), ("igrave", "\u{EC}"), ("image", "\u{2111}"),
    ("infin", "\u{221E}"), ("int", "\u{222B}"), ("iota", "\u{3B9}"), ("iquest", "\u{BF}"),
    ("isin", "\u{2208}"), ("iuml", "\u{EF}"), ("kappa", "\u{3BA}"), ("lArr", "\u{21D0}"),
    ("lambda", "\u{3BB}"), ("lang", "\u{2329}"), ("laquo", "\u{AB}"), ("larr", "\u{2190}"),
    ("lceil", "\u{2308}"), ("ldquo", "\u{201C}"), ("le", "\u{2264}"), ("lfloor", "\u{230A}"),
    ("lowast", "\u{2217}"), ("loz", "\u{25CA}"), ("lrm", "\u{200E}"), ("lsaquo", "\u{2039}"),
    ("lsquo", "\u{2018}"), ("lt", "<"), ("macr", "\u{AF}"), ("mdash", "\u{2014}"),
    ("micro", "\u{B5}"), ("middot", "\u{B7}"), ("minus", "\u{2212}"), ("mu", "\u{3BC}"),
    ("nabla", "\u{2207}"), ("nbsp", "\u{A0}"), ("ndash", "\u{2013}"), ("ne", "\u{2260}"),
    ("ni", "\u{220B}"), ("not", "\u{AC}"), ("notin", "\u{2209}"), ("nsub", "\u{2284}"),
    ("ntilde", "\u{F1}"), ("nu", "\u{3BD}"), ("oacute", "\u{F3}"), ("ocirc", "\u{F4}"),
    ("oelig", "\u{153}"), ("ograve", "\u{F2}"), ("oline", "\u{203E}"), ("omega", "\u{3C9}"),
    ("omicron", "\u{3BF}"), ("oplus", "\u{2295}"), ("or", "\u{2228}"), ("ordf", "\u{AA}"),
    ("ordm", "\u{BA}"), ("oslash", "\u{F8}"), ("otilde", "\u{F5}"), ("otimes", "\u{2297}"),
    ("ouml", "\u{F6}"), ("para", "\u{B6}"), ("part", "\u{2202}"), ("permil", "\u{2030}"),
    ("perp", "\u{22A5}"), ("phi", "\u{3C6}"), ("pi", "\u{3C0}"), ("piv", "\u{3D6}"),
    ("plusmn", "\u{B1}"), ("pound", "\u{A3}"), ("prime", "\u{2032}"), ("prod", "\u{220F}"),
    ("prop", "\u{221D}"), ("psi", "\u{3C8}"), ("quot", "\""), ("rArr", "\u{21D2}"),
    ("radic", "\u{221A}"), ("rang", "\u{232A}"), ("raquo", "\u{BB}"), ("rarr", "\u{2192}"),
    ("rceil", "\u{2309}"), ("rdquo", "\u{201D}"), ("real", "\u{211C}"), ("reg", "\u{AE}"),
    ("rfloor", "\u{230B}"), ("rho", "\u{3C1}"), ("rlm", "\u{200F}"), ("rsaquo", "\u{203A}"),
    ("rsquo", "\u{2019}"), ("sbquo", "\u{201A}"), ("scaron", "\u{161}"), ("sdot", "\u{22C5}"),
    ("sect", "\u{A7}"), ("shy", "\u{AD}"), ("sigma", "\u{3C3}"), ("sigmaf", "\u{3C2}"),
    ("sim", "\u{223C}"), ("spades", "\u{2660}"), ("sub", "\u{2282}"), ("sube", "\u{2286}"),
    ("sum", "\u{2211}"), ("sup", "\u{2283}"), ("sup1", "\u{B9}"), ("sup2", "\u{B2}"),
    ("sup3", "\u{B3}"), ("supe", "\u{2287}"), ("szlig", "\u{DF}"), ("tau", "\u{3C4}"),
    ("there4", "\u{2234}"), ("theta", "\u{3B8}"), ("thetasym", "\u{3D1}"), ("thinsp", "\u{2009}"),
    ("thorn", "\u{FE}"), ("tilde", "\u{2DC}"), ("times", "\u{D7}"), ("trade", "\u{2122}"),
    ("uArr", "\u{21D1}"), ("uacute", "\u{FA}"), ("uarr", "\u{2191}"), ("ucirc", "\u{FB}"),
    ("ugrave", "\u{F9}"), ("uml", "\u{A8}"), ("upsih", "\u{3D2}"), ("upsilon", "\u{3C5}"),
    ("uuml", "\u{FC}"), ("weierp", "\u{2118}"), ("xi", "\u{3BE}"), ("yacute", "\u{FD}"),
    ("yen", "\u{A5}"), ("yuml", "\u{FF}"), ("zeta", "\u{3B6}"), ("zwj", "\u{200D}"),
    ("zwnj", "\u{200C}"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_entity_table_is_sorted() {
        assert!(
            NAMED_ENTITIES.windows(2).all(|w| w[0].0 < w[1].0),
            "binary search requires a strictly sorted table"
        );
    }

    #[test]
    fn decode_entities_preserves_utf8() {
        assert_eq!(decode_entities("120×32"), "120×32");
    }

    #[test]
    fn decode_entities_decodes_xml_names() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(decode_entities("&apos;x&apos;"), "'x'");
    }

    #[test]
    fn decode_entities_decodes_html_names() {
        assert_eq!(decode_entities("a&nbsp;b"), "a\u{A0}b");
        assert_eq!(decode_entities("&pound;10"), "£10");
        assert_eq!(decode_entities("&lambda;x"), "λx");
        assert_eq!(decode_entities("&Lambda; != &lambda;"), "Λ != λ");
        assert_eq!(decode_entities("&copy;&trade;"), "©™");
    }

    #[test]
    fn decode_entities_decodes_numeric_entities() {
        assert_eq!(decode_entities("&#121;"), "y");
        assert_eq!(decode_entities("&#x79;"), "y");
        assert_eq!(decode_entities("&#215;"), "×");
        assert_eq!(decode_entities("&#xD7;"), "×");
    }

    #[test]
    fn decode_entities_decodes_outside_bmp() {
        assert_eq!(decode_entities("Smile &#128512;!"), "Smile \u{1F600}!");
        assert_eq!(decode_entities("&#x1F600;"), "\u{1F600}");
    }

    #[test]
    fn decode_entities_concatenates_combining_sequences() {
        assert_eq!(decode_entities("décompose&#769;"), "décompose\u{301}");
    }

    #[test]
    fn decode_entities_passes_through_unknown_and_missing_semicolon() {
        assert_eq!(decode_entities("&foo"), "&foo");
        assert_eq!(decode_entities("before &notanentity; after"), "before &notanentity; after");
        assert_eq!(decode_entities("&amp"), "&amp");
        assert_eq!(decode_entities("loose &amp space"), "loose &amp space");
        assert_eq!(decode_entities("&#xD7 "), "&#xD7 ");
        assert_eq!(decode_entities("&#215 "), "&#215 ");
    }

    #[test]
    fn decode_entities_passes_through_malformed_numeric() {
        assert_eq!(decode_entities("&#xZZ;"), "&#xZZ;");
        assert_eq!(decode_entities("&#99999999;"), "&#99999999;");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("&#x110000;"), "&#x110000;");
        assert_eq!(decode_entities("&#-1;"), "&#-1;");
        assert_eq!(decode_entities("&#123"), "&#123");
        assert_eq!(decode_entities("&#;"), "&#;");
        assert_eq!(decode_entities("&#x;"), "&#x;");
    }

    #[test]
    fn decode_entities_respects_numeric_digit_limits() {
        assert_eq!(decode_entities("&#1114111;"), "\u{10FFFF}");
        assert_eq!(decode_entities("&#11141111;"), "&#11141111;");
        assert_eq!(decode_entities("&#x10FFFF;"), "\u{10FFFF}");
    }

    #[test]
    fn decode_entities_rejects_invalid_scalars() {
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("&#xDFFF;"), "&#xDFFF;");
        assert_eq!(decode_entities("&#55296;"), "&#55296;");
    }

    #[test]
    fn decode_entities_adversarial_inputs_are_stable() {
        let samples = [
            "&", "&&", "&;", "&#;", "&#x;", "&#xFFFFFFFF;", "&unknown;", "&#9999999;",
            "&amp;&lt;&gt;&quot;&apos;&nbsp;",
        ];

        for s in samples {
            let out = decode_entities(s);
            assert!(out.len() <= s.len());
            assert_eq!(decode_entities(&out), out);
        }
    }

    #[test]
    fn malformed_entity_allows_following_entity() {
        assert_eq!(decode_entities("&#xZZ;&amp;"), "&#xZZ;&");
        assert_eq!(decode_entities("&foo&amp;"), "&foo&");
    }
}
