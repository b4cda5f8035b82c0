//! Sample editor documents for testing and demonstration.
//!
//! Each sample is HTML as the editing surface would hand it over.

/// Names accepted by [`sample`].
pub const SAMPLE_NAMES: &[&str] = &["minimal", "report", "long", "breaks", "all-elements"];

/// Look up a sample by name.
pub fn sample(name: &str) -> Option<String> {
    match name {
        "minimal" => Some(minimal_sample().to_string()),
        "report" => Some(report_sample().to_string()),
        "long" => Some(long_sample(60)),
        "breaks" => Some(manual_breaks_sample().to_string()),
        "all-elements" => Some(all_elements_sample().to_string()),
        _ => None,
    }
}

/// Smallest useful document.
pub fn minimal_sample() -> &'static str {
    r#"<h1>Title</h1><p>Body text</p>"#
}

/// A one-page status report with headings, lists and a quote.
pub fn report_sample() -> &'static str {
    r##"
<h1>Release Notes</h1>
<p>Version 2.4 focuses on <strong>editing speed</strong> and
<em>export fidelity</em>. Pagination now follows the same height table in
the editor and in exported PDFs.</p>

<h2>Highlights</h2>
<ul>
    <li>Page markers update only when content changes</li>
    <li>Manual page breaks from the toolbar</li>
    <li>Sharper page images at quality 3 and 4</li>
</ul>

<h2>Upgrade steps</h2>
<ol>
    <li>Back up the documents folder</li>
    <li>Install the new build</li>
    <li>Re-export any PDFs you share externally</li>
</ol>

<blockquote><p>Exported pages now match what you see in the editor.</p></blockquote>

<h3>Known issues</h3>
<p>Very tall images are clipped at the bottom edge of their page.</p>
"##
}

/// `paragraphs` numbered paragraphs under one heading; long enough to span
/// several pages at 60.
pub fn long_sample(paragraphs: usize) -> String {
    let mut html = String::from("<h1>Field Guide</h1>\n");
    for i in 1..=paragraphs {
        html.push_str(&format!(
            "<p>Entry {i}. The trail climbs steadily through mixed forest before \
             opening onto a ridge with views across the valley.</p>\n"
        ));
    }
    html
}

/// Three sections separated by manual page breaks, including a doubled
/// break that must not produce a blank page.
pub fn manual_breaks_sample() -> &'static str {
    r##"
<h1>Chapter One</h1>
<p>The first chapter fits on a single page.</p>
<div data-type="page-break" class="page-break"></div>
<h1>Chapter Two</h1>
<p>The second chapter starts on a fresh page.</p>
<div data-type="page-break" class="page-break"></div>
<div data-type="page-break" class="page-break"></div>
<h1>Chapter Three</h1>
<p>Two breaks in a row still give only one new page.</p>
"##
}

/// Every block type the importer understands.
pub fn all_elements_sample() -> &'static str {
    r##"
<h1>Heading 1</h1>
<h2>Heading 2</h2>
<h3>Heading 3</h3>
<p>A paragraph with <strong>bold</strong>, <em>italic</em>, <u>underlined</u>
and <a href="https://example.com">linked</a> text.</p>
<ul><li>Bullet one</li><li>Bullet two</li></ul>
<ol><li>Step one</li><li>Step two</li></ol>
<blockquote><p>A quoted paragraph.</p></blockquote>
<pre><code>fn main() {
    println!("hello");
}</code></pre>
<hr>
<img src="data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==" alt="pixel" height="60" width="100">
<div data-type="page-break"></div>
<p>After the break.</p>
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, Document};
    use crate::page::PageMetrics;
    use crate::pagination::compute_breaks;

    #[test]
    fn every_named_sample_imports() {
        for name in SAMPLE_NAMES {
            let html = sample(name).unwrap();
            assert!(
                !Document::from_html(&html).is_empty(),
                "sample '{name}' should import to a non-empty document"
            );
        }
        assert!(sample("nope").is_none());
    }

    #[test]
    fn long_sample_spans_several_pages() {
        let doc = Document::from_html(&long_sample(60));
        let result = compute_breaks(doc.blocks(), PageMetrics::a4().content_height());
        assert!(result.page_count >= 3);
    }

    #[test]
    fn manual_breaks_sample_has_three_pages() {
        let doc = Document::from_html(manual_breaks_sample());
        let result = compute_breaks(doc.blocks(), PageMetrics::a4().content_height());
        assert_eq!(result.page_count, 3);
    }

    #[test]
    fn all_elements_sample_covers_block_kinds() {
        let doc = Document::from_html(all_elements_sample());
        let kinds: Vec<BlockKind> = doc.blocks().iter().map(|b| b.kind).collect();
        for kind in [
            BlockKind::Heading,
            BlockKind::Paragraph,
            BlockKind::BulletList,
            BlockKind::OrderedList,
            BlockKind::Blockquote,
            BlockKind::CodeBlock,
            BlockKind::HorizontalRule,
            BlockKind::Image,
            BlockKind::PageBreak,
        ] {
            assert!(kinds.contains(&kind), "missing {kind:?}");
        }
    }
}
