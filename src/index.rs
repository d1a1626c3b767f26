//! Directory index page / 目录索引页
//!
//! Pages are rendered completely into a `String` before a response is built,
//! so a failed render never leaves a half-written document on the wire.

use std::fmt::Write;

/// One entry of an index page / 索引页链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Already URL-escaped target
    pub href: String,
    /// Display text
    pub label: String,
}

/// Base path plus ordered links, valid for a single render / 页面模型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageModel {
    pub base: String,
    pub links: Vec<Link>,
}

impl PageModel {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            links: Vec::new(),
        }
    }

    pub fn push(&mut self, href: impl Into<String>, label: impl Into<String>) {
        self.links.push(Link {
            href: href.into(),
            label: label.into(),
        });
    }

}

/// Escapes HTML special characters (text and quoted attribute values).
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render the index page / 渲染索引页
pub fn render_index(page: &PageModel) -> Result<String, std::fmt::Error> {
    let base = escape_html(&page.base);
    let mut html = String::with_capacity(256 + page.links.len() * 64);

    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>")?;
    writeln!(html, "  <head>")?;
    writeln!(html, "    <meta charset=\"utf-8\">")?;
    writeln!(html, "    <title>{} Directory</title>", base)?;
    writeln!(html, "  </head>")?;
    writeln!(html, "  <body>")?;
    writeln!(html, "    <h1>{} Directory</h1>", base)?;
    writeln!(html, "    <ul>")?;
    for link in &page.links {
        writeln!(
            html,
            "      <li><a href=\"{}\">{}</a></li>",
            escape_html(&link.href),
            escape_html(&link.label)
        )?;
    }
    writeln!(html, "    </ul>")?;
    writeln!(html, "    <a href=\"/\">Back ←</a>")?;
    writeln!(html, "  </body>")?;
    writeln!(html, "</html>")?;

    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c\"'"), "a&lt;b&gt;&amp;&quot;c&quot;&#39;");
        assert_eq!(escape_html("plain/path.txt"), "plain/path.txt");
        // & first, so entities are not double-escaped by later passes
        assert_eq!(escape_html("<"), "&lt;");
    }

    #[test]
    fn test_render_lists_links_in_order() {
        let mut page = PageModel::new("/photos");
        page.push("/photos/a.txt", "a.txt");
        page.push("/photos/dir/b.png", "dir/b.png");
        let html = render_index(&page).unwrap();

        assert!(html.contains("<h1>/photos Directory</h1>"));
        assert_eq!(html.matches("<li>").count(), 2);
        let first = html.find("<a href=\"/photos/a.txt\">a.txt</a>").unwrap();
        let second = html.find("<a href=\"/photos/dir/b.png\">dir/b.png</a>").unwrap();
        assert!(first < second);
        assert!(html.contains("<a href=\"/\">Back ←</a>"));
    }

    #[test]
    fn test_render_empty_page() {
        let html = render_index(&PageModel::new("/")).unwrap();
        assert!(html.contains("<h1>/ Directory</h1>"));
        assert_eq!(html.matches("<li>").count(), 0);
        assert!(html.contains("<a href=\"/\">Back ←</a>"));
    }

    #[test]
    fn test_render_escapes_untrusted_names() {
        let mut page = PageModel::new("/<b>");
        page.push("/x/\"onmouseover=\"alert(1)", "<script>alert(1)</script>");
        let html = render_index(&page).unwrap();

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("href=\"/x/&quot;onmouseover=&quot;alert(1)\""));
    }
}
