//! Server-rendered pages
//!
//! The UI is three small forms; pages are assembled as strings rather than
//! through a template engine. User-supplied values are escaped here; flash
//! messages are rendered verbatim, so their producers escape any interpolated
//! text themselves (the success flash deliberately contains a download link).

use axum::response::Html;

use crate::auth::{Flash, FlashLevel};
use crate::db::Account;

fn level_class(level: FlashLevel) -> &'static str {
    match level {
        FlashLevel::Success => "success",
        FlashLevel::Info => "info",
        FlashLevel::Warning => "warning",
        FlashLevel::Danger => "danger",
    }
}

fn render_flashes(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|f| {
            format!(
                "<div class=\"flash {}\">{}</div>\n",
                level_class(f.level),
                f.message
            )
        })
        .collect()
}

fn page(title: &str, flashes: &[Flash], body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{title} - OCR Forge</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }}
.flash {{ padding: 0.5rem 1rem; margin-bottom: 1rem; border-radius: 4px; }}
.flash.success {{ background: #d4edda; }}
.flash.info {{ background: #d1ecf1; }}
.flash.warning {{ background: #fff3cd; }}
.flash.danger {{ background: #f8d7da; }}
label {{ display: block; margin-top: 0.75rem; }}
</style>
</head>
<body>
<h1>{title}</h1>
{flashes}
{body}
</body>
</html>
"#,
        title = html_escape::encode_text(title),
        flashes = render_flashes(flashes),
        body = body,
    ))
}

/// Upload page for an authenticated account
pub fn index_page(flashes: &[Flash], account: &Account, ceiling: i64) -> Html<String> {
    let body = format!(
        r#"<p>Signed in as {email} ({plan} plan, {used}/{ceiling} pages used)</p>
<form method="post" action="/" enctype="multipart/form-data">
  <label>PDF file <input type="file" name="file" accept=".pdf" required></label>
  <label>Language
    <select name="language">
      <option value="eng">English</option>
      <option value="fra">French</option>
      <option value="deu">German</option>
      <option value="spa">Spanish</option>
      <option value="tur">Turkish</option>
    </select>
  </label>
  <button type="submit">Make searchable</button>
</form>
<p><a href="/create-checkout">Upgrade to Pro</a> | <a href="/logout">Log out</a></p>"#,
        email = html_escape::encode_text(&account.email),
        plan = account.plan,
        used = account.pages_processed,
        ceiling = ceiling,
    );
    page("Convert a PDF", flashes, &body)
}

/// Login form; `next` is carried through as a hidden field
pub fn login_page(flashes: &[Flash], next: Option<&str>) -> Html<String> {
    let next_field = next
        .map(|n| {
            format!(
                "<input type=\"hidden\" name=\"next\" value=\"{}\">",
                html_escape::encode_double_quoted_attribute(n)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<form method="post" action="/login">
  {next_field}
  <label>Email <input type="email" name="email" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Log in</button>
</form>
<p>No account yet? <a href="/register">Register</a></p>"#,
    );
    page("Login", flashes, &body)
}

/// Registration form
pub fn register_page(flashes: &[Flash]) -> Html<String> {
    let body = r#"<form method="post" action="/register">
  <label>Email <input type="email" name="email" required></label>
  <label>Password <input type="password" name="password" required></label>
  <button type="submit">Create account</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>"#;
    page("Register", flashes, body)
}
