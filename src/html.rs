//! HTML to plain-text normalization.
//!
//! Bank mails frequently ship an HTML-only body; the extraction grammars
//! work on a markdown-like rendering of it. Link targets and images are
//! suppressed in the output: they carry no extraction signal and inflate
//! the false-match surface of the field grammars.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

fn collapse_ws(s: &str) -> String {
    ws_re().replace_all(s.trim(), " ").to_string()
}

/// Renders HTML markup to a readable markdown-like text: bold becomes
/// `**…**`, table cells are joined with `|`, block elements break lines,
/// anchors keep only their text and images vanish entirely.
///
/// Returns `None` when the conversion yields no text at all, which callers
/// treat as an unresolved body.
pub fn to_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    render_children(doc.root_element(), &mut out);
    let text = tidy(&out);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn render_children(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            push_inline(out, text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            render_element(child_el, out);
        }
    }
}

fn render_element(el: ElementRef<'_>, out: &mut String) {
    match el.value().name() {
        // No extraction signal in any of these.
        "script" | "style" | "head" | "title" | "img" => {}
        "br" => out.push('\n'),
        "b" | "strong" => {
            let mut inner = String::new();
            render_children(el, &mut inner);
            let inner = collapse_ws(&inner);
            if !inner.is_empty() {
                push_word_sep(out);
                out.push_str("**");
                out.push_str(&inner);
                out.push_str("**");
            }
        }
        "tr" => {
            let cells = el
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| {
                    let name = cell.value().name();
                    name.eq_ignore_ascii_case("td") || name.eq_ignore_ascii_case("th")
                })
                .map(|cell| {
                    let mut text = String::new();
                    render_children(cell, &mut text);
                    collapse_ws(&text)
                })
                .collect::<Vec<_>>();
            if cells.iter().any(|c| !c.is_empty()) {
                ensure_newline(out);
                out.push_str(cells.join(" | ").trim());
                out.push('\n');
            }
        }
        // Keep the anchor text, drop the target.
        "a" => render_children(el, out),
        "p" | "div" | "table" | "thead" | "tbody" | "tfoot" | "ul" | "ol" | "li" | "h1"
        | "h2" | "h3" | "h4" | "h5" | "h6" | "header" | "footer" | "section" | "article" => {
            ensure_newline(out);
            render_children(el, out);
            ensure_newline(out);
        }
        _ => render_children(el, out),
    }
}

fn push_inline(out: &mut String, text: &str) {
    let collapsed = collapse_ws(text);
    if collapsed.is_empty() {
        return;
    }
    push_word_sep(out);
    out.push_str(&collapsed);
}

fn push_word_sep(out: &mut String) {
    if !out.is_empty() && !out.ends_with([' ', '\n']) {
        out.push(' ');
    }
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn tidy(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = true;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !previous_blank {
                lines.push("");
                previous_blank = true;
            }
        } else {
            lines.push(line);
            previous_blank = false;
        }
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_table_rows_with_pipe_separated_bold_cells() {
        let html = "<html><body><table>\
            <tr><td>Fecha</td><td><b>01/05/2024</b></td></tr>\
            <tr><td>Comercio</td><td><strong>Supermercado X</strong></td></tr>\
            <tr><td>Importe</td><td><b>ARS 1.234,56</b></td></tr>\
            </table></body></html>";
        let text = to_text(html).expect("converted text");
        assert!(text.contains("Fecha | **01/05/2024**"), "got: {text}");
        assert!(text.contains("Comercio | **Supermercado X**"), "got: {text}");
        assert!(text.contains("Importe | **ARS 1.234,56**"), "got: {text}");
    }

    #[test]
    fn suppresses_link_targets_but_keeps_anchor_text() {
        let html = r#"<p>Ver detalle en <a href="https://bbva.com/consumos?id=9">tu resumen</a></p>"#;
        let text = to_text(html).expect("converted text");
        assert!(text.contains("tu resumen"));
        assert!(!text.contains("https://"), "got: {text}");
    }

    #[test]
    fn suppresses_images_entirely() {
        let html = r#"<div><img src="https://cdn.bank.com/logo.png" alt="logo"><p>Consumo aprobado</p></div>"#;
        let text = to_text(html).expect("converted text");
        assert_eq!(text, "Consumo aprobado");
    }

    #[test]
    fn breaks_lines_on_block_elements_and_br() {
        let html = "<p>linea uno</p><div>linea dos<br>linea tres</div>";
        let text = to_text(html).expect("converted text");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["linea uno", "linea dos", "linea tres"]);
    }

    #[test]
    fn markup_without_text_yields_none() {
        assert_eq!(to_text("<html><head><style>p{}</style></head></html>"), None);
        assert_eq!(to_text(""), None);
    }

    #[test]
    fn plain_text_passes_through_unharmed() {
        let text = to_text("ya es texto plano").expect("converted text");
        assert_eq!(text, "ya es texto plano");
    }
}
