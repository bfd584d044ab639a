//! Markdown to HTML, then down to an allow-listed set of tags and attributes.

use crate::config::AllowedClean;
use pulldown_cmark::{Options, Parser, html as md_html};
use std::collections::{HashMap, HashSet};

/// Tags whose text content is dropped along with the tag itself, unless allowed.
const CONTENT_STRIPPED_TAGS: [&str; 2] = ["script", "style"];

#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::with_capacity(markdown.len() * 2);
    md_html::push_html(&mut html_output, parser);
    html_output
}

/// Allow-list HTML cleaner borrowing its lists from the site configuration.
pub struct HtmlCleaner<'a> {
    builder: ammonia::Builder<'a>,
}

impl<'a> HtmlCleaner<'a> {
    #[must_use]
    pub fn new(allowed: &'a AllowedClean) -> Self {
        let tags: HashSet<&str> = allowed.html_tags.iter().map(String::as_str).collect();

        let mut generic_attributes = HashSet::new();
        let mut tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
        for (tag, attributes) in &allowed.html_attributes {
            let attributes = attributes.iter().map(String::as_str);
            if tag == "*" {
                generic_attributes.extend(attributes);
            } else {
                tag_attributes.entry(tag.as_str()).or_default().extend(attributes);
            }
        }

        let clean_content_tags: HashSet<&str> = CONTENT_STRIPPED_TAGS
            .into_iter()
            .filter(|tag| !tags.contains(tag))
            .collect();

        // ammonia refuses a configuration that allows `rel` while managing it itself.
        let allows_rel = generic_attributes.contains("rel")
            || tag_attributes
                .get("a")
                .is_some_and(|attributes| attributes.contains("rel"));

        let mut builder = ammonia::Builder::default();
        builder
            .tags(tags)
            .clean_content_tags(clean_content_tags)
            .generic_attributes(generic_attributes)
            .tag_attributes(tag_attributes);
        if allows_rel {
            builder.link_rel(None);
        }

        Self { builder }
    }

    #[must_use]
    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }

    /// Renders a stored Markdown body into HTML that only uses allowed markup.
    #[must_use]
    pub fn render(&self, markdown: &str) -> String {
        self.clean(&render_markdown(markdown))
    }
}

/// Removes the newlines pulldown-cmark puts between block tags.
///
/// Text inside `<pre>` is left alone since its whitespace is significant.
#[must_use]
pub fn minify_html(html: &str) -> String {
    let mut minified = String::with_capacity(html.len());
    let mut pre_depth = 0usize;
    let mut rest = html;

    while let Some(position) = rest.find(['<', '\n']) {
        let (before, after) = rest.split_at(position);
        minified.push_str(before);

        if after.starts_with('\n') {
            let following = after.trim_start_matches('\n');
            let newlines = &after[..after.len() - following.len()];

            let next_is_tag = following.is_empty() || following.starts_with('<');
            let previous_is_tag = minified.is_empty() || minified.ends_with('>');
            if pre_depth > 0 || !(next_is_tag && previous_is_tag) {
                minified.push_str(newlines);
            }
            rest = following;
            continue;
        }

        let tag_end = after.find('>').map_or(after.len(), |end| end + 1);
        let tag = &after[..tag_end];
        if starts_with_ignore_case(tag, "<pre") {
            pre_depth += 1;
        } else if starts_with_ignore_case(tag, "</pre") {
            pre_depth = pre_depth.saturating_sub(1);
        }
        minified.push_str(tag);
        rest = &after[tag_end..];
    }

    minified.push_str(rest);
    minified
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use crate::{
        config::tests::example_config,
        markdown::{HtmlCleaner, minify_html, render_markdown},
    };

    #[test]
    fn markdown_basics() {
        assert!(render_markdown("").is_empty());
        assert!(render_markdown("Hello, world!").contains("<p>Hello, world!</p>"));
        assert!(render_markdown("# Title").contains("<h1>Title</h1>"));
        assert!(render_markdown("| a |\n|---|\n| b |").contains("<table>"));
        assert!(render_markdown("~~gone~~").contains("<del>gone</del>"));
    }

    #[test]
    fn cleaner_strips_scripts_and_their_content() {
        let config = example_config();
        let cleaner = HtmlCleaner::new(&config.allowed_clean);

        let html = cleaner.render("Hi\n\n<script>alert('x')</script>\n\n**bold**");
        assert!(!html.contains("script"));
        assert!(!html.contains("alert"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn cleaner_drops_tags_outside_the_allow_list() {
        let config = example_config();
        let cleaner = HtmlCleaner::new(&config.allowed_clean);

        // h4 and tables are not allowed; their text survives.
        let html = cleaner.render("#### Small\n\n| a |\n|---|\n| b |");
        assert!(!html.contains("<h4>"));
        assert!(html.contains("Small"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn cleaner_filters_attributes() {
        let config = example_config();
        let cleaner = HtmlCleaner::new(&config.allowed_clean);

        let html =
            cleaner.clean(r#"<a href="https://example.com" title="t" onclick="x()">link</a>"#);
        assert!(html.contains(r#"href="https://example.com""#));
        assert!(html.contains(r#"title="t""#));
        assert!(!html.contains("onclick"));

        let html = cleaner.clean(r#"<p class="x" style="color:red">text</p>"#);
        assert_eq!(html, "<p>text</p>");

        let html = cleaner.clean(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!html.contains("javascript"));
    }

    #[test]
    fn cleaner_allows_rel_when_configured() {
        let mut config = example_config();
        config
            .allowed_clean
            .html_attributes
            .entry("a".to_owned())
            .or_default()
            .insert("rel".to_owned());
        let cleaner = HtmlCleaner::new(&config.allowed_clean);

        let html = cleaner.clean(r#"<a href="/" rel="me">me</a>"#);
        assert!(html.contains(r#"rel="me""#));
    }

    #[test]
    fn minify_removes_block_newlines() {
        let html = render_markdown("# Title\n\nFirst\n\nSecond");
        assert_eq!(minify_html(&html), "<h1>Title</h1><p>First</p><p>Second</p>");
    }

    #[test]
    fn minify_keeps_text_newlines_and_pre() {
        assert_eq!(minify_html("<p>one\ntwo</p>\n"), "<p>one\ntwo</p>");
        assert_eq!(minify_html("<h1>a</h1>\n\n<p>b</p>"), "<h1>a</h1><p>b</p>");
        assert_eq!(minify_html("<p>a\n\nb</p>"), "<p>a\n\nb</p>");

        let html = render_markdown("```\nfn main() {\n}\n```\n\nafter");
        let minified = minify_html(&html);
        assert!(minified.contains("fn main() {\n}\n</code></pre>"));
        assert!(minified.ends_with("</pre><p>after</p>"));
    }
}
