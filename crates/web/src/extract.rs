//! Readability-style main-content extraction.
//!
//! Prefers the semantic container (`article`, `main`, `[role=main]`) with
//! the most text, as long as it is long enough. Otherwise every paragraph
//! credits its length to its parent in full and to its grandparent at half
//! weight, and the best parent wins after a link-density penalty.

use scraper::{ElementRef, Html, Node, Selector};

/// Subtrees that never carry article text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript", "iframe", "svg",
    "button", "template",
];

/// Elements that break the text flow onto a new line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul",
    "ol", "br", "tr", "table", "blockquote", "pre", "figcaption", "dd", "dt", "hr",
];

/// Semantic containers, most specific first.
const PREFERRED: &[&str] = &["article", "main", r#"[role="main"]"#];

/// Extract the readable text of an HTML page.
///
/// Returns an empty string when no container yields at least `min_chars`
/// characters of text.
pub fn extract_article(html: &str, min_chars: usize) -> String {
    let document = Html::parse_document(html);

    if let Some(text) = preferred_text(&document, min_chars) {
        return text;
    }

    let Some(root) = best_scored(&document).or_else(|| body(&document)) else {
        return String::new();
    };

    let text = element_text(root);
    if text.chars().count() < min_chars {
        return String::new();
    }
    text
}

/// Text of the longest container of the most specific semantic kind that
/// has one reaching `min_chars`.
fn preferred_text(document: &Html, min_chars: usize) -> Option<String> {
    PREFERRED.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .map(element_text)
            .map(|text| (text.chars().count(), text))
            .filter(|(len, _)| *len >= min_chars)
            // First in document order among equals
            .reduce(|best, next| if next.0 > best.0 { next } else { best })
            .map(|(_, text)| text)
    })
}

/// The element whose paragraphs score highest.
fn best_scored(document: &Html) -> Option<ElementRef<'_>> {
    let paragraphs = Selector::parse("p").ok()?;

    let mut candidates = Vec::new();
    for paragraph in document.select(&paragraphs) {
        if inside_skipped(paragraph) {
            continue;
        }
        let length = text_len(paragraph);
        if length == 0 {
            continue;
        }

        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        credit(&mut candidates, parent, length as f64);
        if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
            credit(&mut candidates, grandparent, length as f64 / 2.0);
        }
    }

    candidates
        .into_iter()
        .map(|(element, points)| (element, points * (1.0 - link_density(element))))
        .filter(|(_, score)| *score > 0.0)
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
        .map(|(element, _)| element)
}

fn credit<'a>(
    candidates: &mut Vec<(ElementRef<'a>, f64)>,
    element: ElementRef<'a>,
    points: f64,
) {
    match candidates.iter_mut().find(|(e, _)| e.id() == element.id()) {
        Some((_, score)) => *score += points,
        None => candidates.push((element, points)),
    }
}

fn body(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("body").ok()?;
    document.select(&selector).next()
}

fn inside_skipped(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIP_TAGS.contains(&a.value().name()))
}

/// Share of an element's text that sits inside links.
fn link_density(element: ElementRef<'_>) -> f64 {
    let Ok(links) = Selector::parse("a") else {
        return 0.0;
    };
    let total = text_len(element).max(1) as f64;
    let linked: usize = element.select(&links).map(text_len).sum();
    (linked as f64 / total).min(1.0)
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    crate::normalize(&text)
}

fn text_len(element: ElementRef<'_>) -> usize {
    element.text().map(|t| t.trim().chars().count()).sum()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_inline(out, text),
            Node::Element(el) => {
                let name = el.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }

                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Append inline text with whitespace runs collapsed to one space.
fn push_inline(out: &mut String, text: &str) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        if !text.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        return;
    }

    if text.starts_with(char::is_whitespace) && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&words.join(" "));
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "Rust is a multi-paradigm systems programming language focused on safety, \
        especially safe concurrency, and on performance without a garbage collector.";

    #[test]
    fn test_prefers_article_and_skips_chrome() {
        let html = format!(
            r#"<html><head><style>p {{ color: red }}</style></head><body>
            <nav><a href="/">Home</a> <a href="/about">About</a></nav>
            <article>
              <h1>Rust</h1>
              <script>var tracking = 1;</script>
              <p>{}</p>
              <p>It has <b>ownership</b>   and borrowing.</p>
            </article>
            <footer>Copyright</footer>
            </body></html>"#,
            LONG
        );

        let text = extract_article(&html, 100);
        assert!(text.starts_with("Rust\n"));
        assert!(text.contains(LONG));
        assert!(text.contains("It has ownership and borrowing."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Home"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_scores_content_div_over_link_list() {
        let html = format!(
            r#"<html><body>
            <div id="links"><p><a href="/1">{long}</a></p></div>
            <div id="content"><p>{long}</p><p>Second paragraph here.</p></div>
            </body></html>"#,
            long = LONG
        );

        let text = extract_article(&html, 50);
        assert!(text.contains("Second paragraph here."));
    }

    #[test]
    fn test_short_teaser_article_is_passed_over() {
        let html = format!(
            r#"<html><body>
            <article><p>Subscribe today!</p></article>
            <article><p>{long}</p><p>It compiles to native code.</p></article>
            </body></html>"#,
            long = LONG
        );

        let text = extract_article(&html, 140);
        assert!(text.contains(LONG));
        assert!(!text.contains("Subscribe"));
    }

    #[test]
    fn test_article_wins_over_enclosing_main() {
        let html = format!(
            r#"<html><body><main>
            <article><p>{long}</p></article>
            <section><p>Related: ten more stories you might enjoy reading later on.</p></section>
            </main></body></html>"#,
            long = LONG
        );

        let text = extract_article(&html, 100);
        assert_eq!(text, LONG);
    }

    #[test]
    fn test_content_div_beats_wrapper_with_sidebar() {
        let html = format!(
            r#"<html><body><div id="wrap">
            <div class="sidebar">
              <p>Buy cheap flights to anywhere in the world today.</p>
              <p>Sign up for the newsletter and never miss a deal.</p>
            </div>
            <div id="content"><p>{long}</p><p>Its compiler enforces memory safety.</p></div>
            </div></body></html>"#,
            long = LONG
        );

        let text = extract_article(&html, 100);
        assert!(text.starts_with("Rust is a multi-paradigm"), "got: {text}");
        assert!(text.contains("Its compiler enforces memory safety."));
        assert!(!text.contains("cheap flights"));
        assert!(!text.contains("newsletter"));
    }

    #[test]
    fn test_short_page_is_empty() {
        let html = "<html><body><article><p>Too short.</p></article></body></html>";
        assert_eq!(extract_article(html, 140), "");
    }

    #[test]
    fn test_garbage_input_is_empty() {
        assert_eq!(extract_article("", 10), "");
    }
}
