use core::fmt::{self, Write as _};

use seat_checkin_config::{Config, Mode};

use crate::checkin::{CheckIn, CheckInError, Severity};
use crate::components::main::main;
use crate::components::Escaped;

/// What the attendee entered, echoed back into the form.
#[derive(Debug, Default)]
pub struct FormValues<'a> {
    pub identifier: &'a str,
    pub by_name: bool,
}

/// The check-in page, optionally with the outcome of a submission above the
/// form.
pub fn checkin_form(
    config: &Config,
    csrf_token: &str,
    values: &FormValues<'_>,
    outcome: Option<&Result<CheckIn, CheckInError>>,
) -> Result<String, fmt::Error> {
    let mut html = String::new();
    writeln!(html, r#"<h1 class="center">{}</h1>"#, Escaped(&config.title))?;
    if let Some(subtitle) = &config.subtitle {
        writeln!(html, r#"<p class="center subtitle">{}</p>"#, Escaped(subtitle))?;
    }

    writeln!(
        html,
        r#"<form class="container-small" method="post" action="/" enctype="application/x-www-form-urlencoded">"#
    )?;

    // a successful check-in clears the form for the next attendee
    let mut identifier = values.identifier;
    let mut by_name = values.by_name;
    match outcome {
        Some(Ok(CheckIn::Seated { name, seat })) => {
            writeln!(
                html,
                r#"<p class="seat-announcement">{}さんの席番号は{}番テーブルです。</p>"#,
                Escaped(name),
                Escaped(seat),
            )?;
            identifier = "";
            by_name = false;
        }
        Some(Ok(CheckIn::RegistrationClosed { registered })) => {
            writeln!(
                html,
                r#"<div class="info-message">定員（{registered}名）に達したため、受付を終了しました。</div>"#
            )?;
        }
        Some(Err(err)) => {
            let class = match err.severity() {
                Severity::Warning => "warning-message",
                Severity::Error => "error-message",
            };
            writeln!(
                html,
                r#"<div class="{class}">{}</div>"#,
                Escaped(&err.to_string())
            )?;
        }
        None => {}
    }

    writeln!(
        html,
        r#"<input type="hidden" name="csrf_token" value="{}">"#,
        Escaped(csrf_token)
    )?;

    let label = match config.mode {
        Mode::Roster => "社員番号",
        Mode::Random => "お名前（フルネーム）",
    };
    writeln!(html, r#"<label for="identifier">{label}</label>"#)?;
    writeln!(
        html,
        r#"<input id="identifier" name="identifier" type="text" autocomplete="off" autofocus value="{}">"#,
        Escaped(identifier)
    )?;

    if config.mode == Mode::Roster {
        writeln!(html, r#"<div class="checkbox">"#)?;
        writeln!(
            html,
            r#"<input id="by_name" name="by_name" type="checkbox" value="on"{}>"#,
            if by_name { " checked" } else { "" }
        )?;
        writeln!(
            html,
            r#"<label for="by_name">社員番号がわからない方はこちらをチェックし、フルネームをスペースを入れずに入力してください。</label>"#
        )?;
        writeln!(html, "</div>")?;
    }

    writeln!(html, r#"<button type="submit">登録</button>"#)?;
    writeln!(html, "</form>")?;

    main(&config.title, config, &html)
}
