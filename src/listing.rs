//! HTML pages generated by the server itself: directory listings and error responses.

use http::StatusCode;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::fs::DirEntry;

/// Characters left alone in listing links, everything else is percent-encoded.
const LINK: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

pub(crate) const HTML_UTF8: &str = "text/html; charset=utf-8";

/// Renders the listing of one directory.
///
/// Entries are sorted case-insensitively. Directories get a trailing `/` in both name and
/// link, symlinks are shown with a trailing `@`.
pub(crate) fn render_listing(request_path: &str, mut entries: Vec<DirEntry>) -> String {
    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    let title = format!("Directory listing for {}", escape_html(request_path));

    let mut page = String::new();
    page.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    page.push_str(&format!("<h1>{title}</h1>\n<hr>\n<ul>\n"));

    for entry in &entries {
        let mut display = entry.name.clone();
        let mut link = entry.name.clone();
        if entry.is_dir {
            display.push('/');
            link.push('/');
        }
        if entry.is_symlink {
            display = format!("{}@", entry.name);
        }

        page.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            utf8_percent_encode(&link, LINK),
            escape_html(&display)
        ));
    }

    page.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    page
}

/// A short error page: status code and a one line message.
pub(crate) fn render_error(status: StatusCode, message: &str) -> String {
    format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Error response</title>\n</head>\n<body>\n<h1>Error response</h1>\n\
         <p>Error code: {}</p>\n<p>Message: {}.</p>\n</body>\n</html>\n",
        status.as_u16(),
        escape_html(message)
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
