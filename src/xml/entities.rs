//! HTML character reference decoding for extracted snippets, following the
//! HTML5 tokenizer's rules for references outside attributes.

use std::borrow::Cow;

use quick_xml::escape::resolve_html5_entity;

/// Regex-style upper bound on a reference name, in characters.
const MAX_ENTITY_NAME: usize = 32;

/// Named references that are also recognized without a trailing `;`.
const LEGACY_NAMES: &[&str] = &[
    "AElig", "AMP", "Aacute", "Acirc", "Agrave", "Aring", "Atilde", "Auml", "COPY", "Ccedil",
    "ETH", "Eacute", "Ecirc", "Egrave", "Euml", "GT", "Iacute", "Icirc", "Igrave", "Iuml", "LT",
    "Ntilde", "Oacute", "Ocirc", "Ograve", "Oslash", "Otilde", "Ouml", "QUOT", "REG", "THORN",
    "Uacute", "Ucirc", "Ugrave", "Uuml", "Yacute", "aacute", "acirc", "acute", "aelig", "agrave",
    "amp", "aring", "atilde", "auml", "brvbar", "ccedil", "cedil", "cent", "copy", "curren",
    "deg", "divide", "eacute", "ecirc", "egrave", "eth", "euml", "frac12", "frac14", "frac34",
    "gt", "iacute", "icirc", "iexcl", "igrave", "iquest", "iuml", "laquo", "lt", "macr", "micro",
    "middot", "nbsp", "not", "ntilde", "oacute", "ocirc", "ograve", "ordf", "ordm", "oslash",
    "otilde", "ouml", "para", "plusmn", "pound", "quot", "raquo", "reg", "sect", "shy", "sup1",
    "sup2", "sup3", "szlig", "thorn", "times", "uacute", "ucirc", "ugrave", "uml", "uuml",
    "yacute", "yen", "yuml",
];

/// Resolves named (`&amp;`, legacy `&amp`), decimal (`&#38;`, `&#38`) and
/// hexadecimal (`&#x26;`) references. Text that is not a reference stays verbatim.
pub fn unescape_html(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp + 1..];

        match decode_reference(candidate) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decodes the reference at the start of `s` (just past the `&`), returning
/// the replacement and the number of bytes consumed.
fn decode_reference(s: &str) -> Option<(Cow<'static, str>, usize)> {
    match s.strip_prefix('#') {
        Some(number) => decode_numeric(number).map(|(decoded, consumed)| (decoded, consumed + 1)),
        None => decode_named(s),
    }
}

fn decode_numeric(s: &str) -> Option<(Cow<'static, str>, usize)> {
    let (digits_start, radix) = match s.as_bytes() {
        [b'0'..=b'9', ..] => (0, 10),
        [b'x' | b'X', next, ..] if next.is_ascii_hexdigit() => (1, 16),
        _ => return None,
    };
    let digits_len = s[digits_start..]
        .bytes()
        .take_while(|b| char::from(*b).is_digit(radix))
        .count();
    let digits_end = digits_start + digits_len;
    let consumed = digits_end + usize::from(s[digits_end..].starts_with(';'));

    Some((code_point(&s[digits_start..digits_end], radix), consumed))
}

fn code_point(digits: &str, radix: u32) -> Cow<'static, str> {
    // Overflow means the value is far beyond U+10FFFF.
    let Ok(code) = u32::from_str_radix(digits, radix) else {
        return Cow::Borrowed("\u{fffd}");
    };
    if let Some(replacement) = remapped_code_point(code) {
        return Cow::Borrowed(replacement);
    }
    if (0xD800..=0xDFFF).contains(&code) || code > 0x10FFFF {
        return Cow::Borrowed("\u{fffd}");
    }
    if is_disallowed_code_point(code) {
        return Cow::Borrowed("");
    }
    char::from_u32(code).map_or(Cow::Borrowed("\u{fffd}"), |c| Cow::Owned(c.to_string()))
}

/// NUL, CR, and the C1 range read as windows-1252.
fn remapped_code_point(code: u32) -> Option<&'static str> {
    let replacement = match code {
        0x00 => "\u{fffd}",
        0x0d => "\r",
        0x80 => "\u{20ac}",
        0x81 => "\u{81}",
        0x82 => "\u{201a}",
        0x83 => "\u{0192}",
        0x84 => "\u{201e}",
        0x85 => "\u{2026}",
        0x86 => "\u{2020}",
        0x87 => "\u{2021}",
        0x88 => "\u{02c6}",
        0x89 => "\u{2030}",
        0x8a => "\u{0160}",
        0x8b => "\u{2039}",
        0x8c => "\u{0152}",
        0x8d => "\u{8d}",
        0x8e => "\u{017d}",
        0x8f => "\u{8f}",
        0x90 => "\u{90}",
        0x91 => "\u{2018}",
        0x92 => "\u{2019}",
        0x93 => "\u{201c}",
        0x94 => "\u{201d}",
        0x95 => "\u{2022}",
        0x96 => "\u{2013}",
        0x97 => "\u{2014}",
        0x98 => "\u{02dc}",
        0x99 => "\u{2122}",
        0x9a => "\u{0161}",
        0x9b => "\u{203a}",
        0x9c => "\u{0153}",
        0x9d => "\u{9d}",
        0x9e => "\u{017e}",
        0x9f => "\u{0178}",
        _ => return None,
    };
    Some(replacement)
}

/// Control characters and noncharacters, which decode to nothing.
fn is_disallowed_code_point(code: u32) -> bool {
    matches!(code, 0x01..=0x08 | 0x0b | 0x0e..=0x1f | 0x7f..=0x9f | 0xfdd0..=0xfdef)
        || code & 0xfffe == 0xfffe
}

fn decode_named(s: &str) -> Option<(Cow<'static, str>, usize)> {
    let name_len: usize = s
        .chars()
        .take_while(|c| !matches!(c, '\t' | '\n' | '\x0c' | ' ' | '<' | '&' | '#' | ';'))
        .take(MAX_ENTITY_NAME)
        .map(char::len_utf8)
        .sum();
    if name_len == 0 {
        return None;
    }
    let name = &s[..name_len];
    let terminated = s[name_len..].starts_with(';');

    if terminated {
        if let Some(resolved) = resolve_html5_entity(name) {
            return Some((Cow::Borrowed(resolved), name_len + 1));
        }
    } else if let Some(resolved) = resolve_legacy(name) {
        return Some((resolved, name_len));
    }

    // Longest legacy prefix wins; the rest of the name is ordinary text.
    let bounds: Vec<usize> = name
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(name.len()))
        .collect();
    let chars = bounds.len() - 1;
    let longest = if terminated { chars } else { chars - 1 };
    (2..=longest).rev().find_map(|k| {
        let prefix = &name[..bounds[k]];
        resolve_legacy(prefix).map(|resolved| (resolved, prefix.len()))
    })
}

fn resolve_legacy(name: &str) -> Option<Cow<'static, str>> {
    if LEGACY_NAMES.contains(&name) {
        resolve_html5_entity(name).map(Cow::Borrowed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(unescape_html("no references"), Cow::Borrowed(_)));
    }

    #[test]
    fn decodes_amp() {
        assert_eq!(unescape_html("Tom &amp; Jerry"), "Tom & Jerry");
    }

    #[test]
    fn decodes_html5_named_references() {
        assert_eq!(unescape_html("caf&eacute;&nbsp;&mdash;"), "café\u{a0}—");
    }

    #[test]
    fn decodes_numeric_references() {
        assert_eq!(unescape_html("&#233;&#xE9;&#X41;"), "ééA");
    }

    #[test]
    fn decodes_only_one_level() {
        assert_eq!(unescape_html("&amp;amp;"), "&amp;");
    }

    #[test]
    fn legacy_names_need_no_semicolon() {
        assert_eq!(unescape_html("fish &amp chips"), "fish & chips");
        assert_eq!(unescape_html("&copy 2020"), "© 2020");
        assert_eq!(unescape_html("caf&eacute"), "café");
        assert_eq!(unescape_html("&AMP"), "&");
    }

    #[test]
    fn longest_legacy_prefix_is_used() {
        assert_eq!(unescape_html("&notit;"), "¬it;");
        assert_eq!(unescape_html("&ampx"), "&x");
        assert_eq!(unescape_html("&copyright"), "©right");
    }

    #[test]
    fn modern_names_need_semicolon() {
        assert_eq!(unescape_html("&hellip"), "&hellip");
        assert_eq!(unescape_html("&hellip;"), "…");
    }

    #[test]
    fn numeric_references_need_no_semicolon() {
        assert_eq!(unescape_html("&#233 x"), "é x");
        assert_eq!(unescape_html("&#x41B"), "\u{41b}");
        assert_eq!(unescape_html("&#65;&#66"), "AB");
    }

    #[test]
    fn c1_range_reads_as_windows_1252() {
        assert_eq!(unescape_html("&#150;"), "–");
        assert_eq!(unescape_html("&#x80;"), "€");
        assert_eq!(unescape_html("&#x9F;"), "Ÿ");
        assert_eq!(unescape_html("&#x81;"), "\u{81}");
        assert_eq!(unescape_html("&#13;"), "\r");
    }

    #[test]
    fn leaves_unknown_references_verbatim() {
        assert_eq!(unescape_html("&bogus; & &; &#; &#xZZ;"), "&bogus; & &; &#; &#xZZ;");
        assert_eq!(unescape_html("trailing &"), "trailing &");
        assert_eq!(unescape_html("AT&T"), "AT&T");
    }

    #[test]
    fn invalid_code_points_become_replacement_char() {
        assert_eq!(unescape_html("&#0;"), "\u{fffd}");
        assert_eq!(unescape_html("&#xD800;"), "\u{fffd}");
        assert_eq!(unescape_html("&#x110000;"), "\u{fffd}");
        assert_eq!(unescape_html("&#99999999999;"), "\u{fffd}");
    }

    #[test]
    fn control_and_noncharacter_references_are_dropped() {
        assert_eq!(unescape_html("a&#1;b"), "ab");
        assert_eq!(unescape_html("a&#x7F;b"), "ab");
        assert_eq!(unescape_html("a&#xFFFE;b&#x1FFFF;c"), "abc");
        assert_eq!(unescape_html("a&#xFDD0;b"), "ab");
    }

    #[test]
    fn handles_adjacent_ampersands() {
        assert_eq!(unescape_html("&&amp;"), "&&");
    }
}
