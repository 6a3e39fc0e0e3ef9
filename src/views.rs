//! HTML pages.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::fmt::Write;

use crate::services::catalog::Page;
use crate::services::preview::Preview;
use crate::session::{CurrentUser, FlashMessage};

pub const SITE_TITLE: &str = "Research Data Repository";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, user: Option<&CurrentUser>, flash: Option<&FlashMessage>, body: &str) -> String {
    let nav = match user {
        Some(u) => format!(
            r#"<span class="user">Signed in as {}</span>
<form method="post" action="/logout/" class="inline"><button type="submit">Log out</button></form>"#,
            escape(&u.username)
        ),
        None => r#"<a href="/login/">Log in</a> <a href="/register/">Register</a>"#.to_string(),
    };
    let flash = flash
        .map(|f| {
            format!(
                r#"<div class="alert alert-{}">{}</div>"#,
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} | {site}</title></head>
<body>
<header><h1><a href="/">{site}</a></h1><nav>{nav}</nav></header>
{flash}
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        site = SITE_TITLE,
        nav = nav,
        flash = flash,
        body = body,
    )
}

const UPLOAD_FORM: &str = r#"<section id="upload">
<h2>Upload a dataset</h2>
<form method="post" action="/upload/" enctype="multipart/form-data">
<label>Title <input name="title" maxlength="200" required></label>
<label>Author <input name="author" maxlength="100" required></label>
<label>Description <textarea name="description" required></textarea></label>
<label>File <input type="file" name="file" accept=".csv,.xlsx,.pdf,.doc,.docx" required></label>
<button type="submit">Upload</button>
</form>
</section>"#;

pub fn listing_page(
    page: &Page,
    query: Option<&str>,
    user: Option<&CurrentUser>,
    flash: Option<&FlashMessage>,
) -> String {
    let mut body = String::new();
    if user.is_some() {
        body.push_str(UPLOAD_FORM);
    }

    let query_value = query.unwrap_or("");
    let _ = write!(
        body,
        r#"<section id="search">
<form method="get" action="/search/"><input name="query" value="{}" placeholder="Search by title or author"><button type="submit">Search</button></form>
</section>
<section id="datasets">
<h2>Datasets ({})</h2>
"#,
        escape(query_value),
        page.total
    );

    if page.items.is_empty() {
        body.push_str("<p>No datasets found.</p>\n");
    } else {
        body.push_str(
            "<table class=\"datasets\">\n<thead><tr><th>Title</th><th>Author</th><th>DOI</th><th>Type</th><th>Size</th><th>Uploaded</th><th></th></tr></thead>\n<tbody>\n",
        );
        for d in &page.items {
            let _ = writeln!(
                body,
                r#"<tr><td>{title}</td><td>{author}</td><td>{doi}</td><td>{ty}</td><td>{size}</td><td>{at}</td><td><a href="/preview/{id}/">Preview</a> <a href="/download/{id}/">Download</a></td></tr>"#,
                title = escape(&d.title),
                author = escape(&d.author),
                doi = escape(&d.doi),
                ty = escape(&d.file_type),
                size = d.file_size,
                at = d.created_at.format("%Y-%m-%d %H:%M"),
                id = d.id,
            );
        }
        body.push_str("</tbody>\n</table>\n");
    }

    let base = match query {
        Some(q) if !q.is_empty() => format!("/search/?query={}&", utf8_percent_encode(q, NON_ALPHANUMERIC)),
        _ => "/?".to_string(),
    };
    body.push_str("<nav class=\"pagination\">");
    if page.has_previous() {
        let _ = write!(body, r#"<a href="{}page={}">Previous</a> "#, base, page.number - 1);
    }
    let _ = write!(body, "Page {} of {}", page.number, page.num_pages);
    if page.has_next() {
        let _ = write!(body, r#" <a href="{}page={}">Next</a>"#, base, page.number + 1);
    }
    body.push_str("</nav>\n</section>");

    layout(SITE_TITLE, user, flash, &body)
}

pub fn preview_page(preview: &Preview, user: Option<&CurrentUser>, flash: Option<&FlashMessage>) -> String {
    let d = &preview.dataset;
    let mut body = format!(
        r#"<article class="dataset">
<h2>{title}</h2>
<dl>
<dt>Author</dt><dd>{author}</dd>
<dt>DOI</dt><dd>{doi}</dd>
<dt>Description</dt><dd>{description}</dd>
<dt>File type</dt><dd>{ty}</dd>
<dt>File size</dt><dd>{size} bytes</dd>
<dt>Uploaded</dt><dd>{at}</dd>
</dl>
<a href="/download/{id}/">Download</a>
"#,
        title = escape(&d.title),
        author = escape(&d.author),
        doi = escape(&d.doi),
        description = escape(&d.description),
        ty = escape(&d.file_type),
        size = d.file_size,
        at = d.created_at.format("%Y-%m-%d %H:%M"),
        id = d.id,
    );

    match &preview.table {
        Some(table) => {
            body.push_str("<h3>Preview</h3>\n<table id=\"preview-table\" class=\"table\">\n<thead><tr>");
            for h in &table.header {
                let _ = write!(body, "<th>{}</th>", escape(h));
            }
            body.push_str("</tr></thead>\n<tbody>\n");
            for row in &table.rows {
                body.push_str("<tr>");
                for cell in row {
                    let _ = write!(body, "<td>{}</td>", escape(cell));
                }
                body.push_str("</tr>\n");
            }
            body.push_str("</tbody>\n</table>\n");
        }
        None => body.push_str("<p>No tabular preview is available for this file type.</p>\n"),
    }
    body.push_str("</article>");

    layout(&d.title, user, flash, &body)
}

pub fn login_page(next: &str, flash: Option<&FlashMessage>) -> String {
    let body = format!(
        r#"<h2>Log in</h2>
<form method="post" action="/login/">
<input type="hidden" name="next" value="{}">
<label>Username or email <input name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>
<p>No account? <a href="/register/">Register</a></p>"#,
        escape(next)
    );
    layout("Log in", None, flash, &body)
}

pub fn register_page(username: &str, email: &str, flash: Option<&FlashMessage>) -> String {
    let body = format!(
        r#"<h2>Register</h2>
<form method="post" action="/register/">
<label>Username <input name="username" value="{}" maxlength="150" required></label>
<label>Email <input type="email" name="email" value="{}" required></label>
<label>Password <input type="password" name="password1" required></label>
<label>Confirm password <input type="password" name="password2" required></label>
<button type="submit">Register</button>
</form>"#,
        escape(username),
        escape(email)
    );
    layout("Register", None, flash, &body)
}

pub fn error_page(message: &str, user: Option<&CurrentUser>) -> String {
    let body = format!(
        r#"<h2>Something went wrong</h2>
<p>{}</p>
<p><a href="/">Back to the repository</a></p>"#,
        escape(message)
    );
    layout("Error", user, None, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(escape("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn empty_listing_renders() {
        let page = Page {
            items: vec![],
            number: 1,
            num_pages: 1,
            total: 0,
        };
        let html = listing_page(&page, Some("x<y"), None, None);
        assert!(html.contains(SITE_TITLE));
        assert!(html.contains("No datasets found."));
        assert!(html.contains("x&lt;y"));
        assert!(!html.contains("action=\"/upload/\""));
    }
}
