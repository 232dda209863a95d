use core::fmt::{self, Write as _};

use seat_checkin_config::Config;

use crate::components::Escaped;
use crate::routes::indexcss::INDEX_CSS_VERSION;

/// Page layout around `inner`, which must already be escaped.
pub fn main(page_title: &str, config: &Config, inner: &str) -> Result<String, fmt::Error> {
    let mut html = String::with_capacity(inner.len() + 512);
    write!(
        html,
        r#"<!doctype html>
<html lang="ja">

<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{page_title}</title>
    <link rel="stylesheet" href="/index.css?v={version}">
</head>

<body>
    <nav>
        <span>{site}</span>
    </nav>
    <main>
{inner}    </main>
</body>

</html>
"#,
        page_title = Escaped(page_title),
        version = &*INDEX_CSS_VERSION,
        site = Escaped(&config.title),
    )?;
    Ok(html)
}
