//! CSV export with RFC 4180 quoting.

use crate::models::Article;

const HEADER: [&str; 7] = ["Title", "URL", "Source", "Published", "Category", "Relevance", "Region"];

/// Quote a field when it contains a delimiter, a quote or a line break.
fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = fields.into_iter().map(field).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

pub fn render(articles: &[Article]) -> String {
    let mut out = row(HEADER);
    for a in articles {
        let published = a.published_at().format("%Y-%m-%d %H:%M:%S").to_string();
        let relevance = format!("{:.2}", a.relevance_score());
        out.push_str(&row([
            a.title(),
            a.url(),
            a.source(),
            published.as_str(),
            a.category().as_str(),
            relevance.as_str(),
            a.region(),
        ]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{article, ts};

    #[test]
    fn test_header_and_rows() {
        let articles = vec![article("Тула: новости дня", "ТСН", 0.7, ts(2024, 3, 1, 10))];
        let out = render(&articles);
        let lines: Vec<&str> = out.split("\r\n").collect();
        assert_eq!(lines[0], "Title,URL,Source,Published,Category,Relevance,Region");
        assert!(lines[1].starts_with("Тула: новости дня,https://example.com/"));
        assert!(lines[1].ends_with(",ТСН,2024-03-01 10:00:00,other,0.70,Тульская область"));
        assert_eq!(lines[2], "");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(field("plain"), "plain");
        assert_eq!(field("a, b"), "\"a, b\"");
        assert_eq!(field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(field("two\nlines"), "\"two\nlines\"");
    }
}
