//! Snippet extraction from a parsed Yandex XML response.

use crate::xml::Element;
use crate::xml::entities::unescape_html;

const DOC_TAG: &str = "doc";
const LANG_TAG: &str = "lang";
const ERROR_TAG: &str = "error";
const SNIPPET_TAGS: [&str; 3] = ["title", "headline", "passage"];
const ACCEPTED_LANG: &str = "en";

/// Full text content of an element: its own text, then each child's
/// flattened text followed by that child's tail.
pub fn flatten_text(element: &Element) -> String {
    let mut text = element.text.clone();
    for child in &element.children {
        text.push_str(&flatten_text(child));
        text.push_str(&child.tail);
    }
    text
}

/// Titles, headlines and passages of every English document, in document order.
///
/// A document counts as English only if its first `lang` element reads exactly `en`;
/// documents without a `lang` element are skipped.
pub fn extract_passages(root: &Element) -> Vec<String> {
    root.iter_tag(DOC_TAG)
        .filter(|doc| is_english(doc))
        .flat_map(|doc| {
            doc.iter()
                .filter(|e| SNIPPET_TAGS.contains(&e.tag.as_str()))
                .map(|e| unescape_html(&flatten_text(e)).into_owned())
        })
        .collect()
}

fn is_english(doc: &Element) -> bool {
    doc.iter_tag(LANG_TAG)
        .next()
        .is_some_and(|lang| lang.text == ACCEPTED_LANG)
}

/// Message of the first `error` element anywhere in the response, if any.
pub fn find_provider_error(root: &Element) -> Option<&str> {
    root.iter_tag(ERROR_TAG).next().map(|e| e.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    fn parse(xml: &str) -> Element {
        parse_document(xml.as_bytes()).unwrap()
    }

    fn response(docs: &str) -> Element {
        parse(&format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<yandexsearch version="1.0">
  <request><query>+cat +dog</query></request>
  <response date="20260101T000000">
    <results><grouping><group>{docs}</group></grouping></results>
  </response>
</yandexsearch>"#
        ))
    }

    #[test]
    fn flattens_nested_markup() {
        let passage = parse("<passage>A <b>B</b> C</passage>");
        assert_eq!(flatten_text(&passage), "A B C");
    }

    #[test]
    fn flattens_deeply_nested_markup() {
        let passage = parse("<passage>1<x>2<y>3</y>4</x>5<z/>6</passage>");
        assert_eq!(flatten_text(&passage), "123456");
    }

    #[test]
    fn flatten_ignores_own_tail() {
        let root = parse("<r><title>T</title> after</r>");
        assert_eq!(flatten_text(&root.children[0]), "T");
    }

    #[test]
    fn extracts_english_snippets_in_order() {
        let root = response(
            r#"<doc>
                 <title>Cats and <hlword>dogs</hlword></title>
                 <headline>A headline</headline>
                 <passages><passage>First <hlword>cat</hlword> passage</passage></passages>
                 <properties><lang>en</lang></properties>
               </doc>"#,
        );
        assert_eq!(
            extract_passages(&root),
            ["Cats and dogs", "A headline", "First cat passage"]
        );
    }

    #[test]
    fn skips_non_english_documents() {
        let root = response(
            r#"<doc><title>Кошки</title><properties><lang>ru</lang></properties></doc>
               <doc><title>Cats</title><properties><lang>en</lang></properties></doc>"#,
        );
        assert_eq!(extract_passages(&root), ["Cats"]);
    }

    #[test]
    fn skips_documents_without_lang() {
        let root = response("<doc><title>No language</title><headline>h</headline></doc>");
        assert!(extract_passages(&root).is_empty());
    }

    #[test]
    fn only_first_lang_counts() {
        let root = response(
            "<doc><lang>ru</lang><lang>en</lang><title>x</title></doc>
             <doc><lang>en</lang><lang>ru</lang><title>y</title></doc>",
        );
        assert_eq!(extract_passages(&root), ["y"]);
    }

    #[test]
    fn lang_must_match_exactly() {
        let root = response("<doc><lang> en</lang><title>x</title></doc><doc><lang>EN</lang><title>y</title></doc>");
        assert!(extract_passages(&root).is_empty());
    }

    #[test]
    fn lang_after_snippets_still_applies() {
        let root = response("<doc><title>early</title><lang>en</lang></doc>");
        assert_eq!(extract_passages(&root), ["early"]);
    }

    #[test]
    fn unescapes_html_entities_after_flattening() {
        let root = response("<doc><lang>en</lang><title>Tom &amp;amp; <b>Jerry</b> &amp;eacute;</title></doc>");
        assert_eq!(extract_passages(&root), ["Tom & Jerry é"]);
    }

    #[test]
    fn unescapes_unterminated_and_c1_references() {
        let root = response("<doc><lang>en</lang><headline>fish &amp;amp chips &amp;#150; &amp;copy 2020</headline></doc>");
        assert_eq!(extract_passages(&root), ["fish & chips – © 2020"]);
    }

    #[test]
    fn keeps_duplicate_snippets() {
        let root = response("<doc><lang>en</lang><title>same</title><headline>same</headline></doc>");
        assert_eq!(extract_passages(&root), ["same", "same"]);
    }

    #[test]
    fn empty_snippet_elements_yield_empty_strings() {
        let root = response("<doc><lang>en</lang><title/></doc>");
        assert_eq!(extract_passages(&root), [""]);
    }

    #[test]
    fn response_without_docs_yields_nothing() {
        let root = response("");
        assert!(extract_passages(&root).is_empty());
    }

    #[test]
    fn finds_first_error_message() {
        let root = parse(
            r#"<yandexsearch><response><error code="32">quota exceeded</error><error>second</error></response></yandexsearch>"#,
        );
        assert_eq!(find_provider_error(&root), Some("quota exceeded"));
    }

    #[test]
    fn error_without_text_has_empty_message() {
        let root = parse("<yandexsearch><error code=\"15\"/></yandexsearch>");
        assert_eq!(find_provider_error(&root), Some(""));
    }

    #[test]
    fn no_error_element() {
        let root = response("<doc><lang>en</lang><title>ok</title></doc>");
        assert_eq!(find_provider_error(&root), None);
    }
}
