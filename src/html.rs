//! Shared maud templates and display formatting helpers.

use std::sync::OnceLock;

use maud::{DOCTYPE, Markup, PreEscaped, html};
use numfmt::{Formatter, Precision};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

/// The display format for operation timestamps, matching their minute
/// precision.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// The stylesheet embedded into every page.
const STYLESHEET: &str = r#"
body {
    font-family: system-ui, sans-serif;
    max-width: 56rem;
    margin: 0 auto;
    padding: 1rem;
    color: #1f2933;
    background-color: #f8f9fa;
}
nav { margin-bottom: 1.5rem; }
nav a { margin-right: 1rem; color: #2563eb; text-decoration: none; }
nav a.current { font-weight: 700; text-decoration: underline; }
h1 { font-size: 1.4rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border-bottom: 1px solid #d4d8dd; padding: 0.4rem 0.6rem; text-align: left; }
th { background-color: #eef1f4; }
form.stacked { max-width: 24rem; margin: 1rem 0; }
form.stacked label { display: block; margin: 0.5rem 0 0.2rem; font-weight: 600; }
form.stacked input, form.stacked select { width: 100%; padding: 0.3rem; }
form.inline { display: inline; }
button { margin-top: 0.6rem; padding: 0.3rem 0.9rem; cursor: pointer; }
button.link { border: none; background: none; color: #b91c1c; text-decoration: underline; padding: 0; margin: 0; }
p.error { color: #b91c1c; }
p.muted { color: #616e7c; }
fieldset { border: 1px solid #d4d8dd; margin: 1rem 0; padding: 0.8rem; }
"#;

/// Render the common page shell around `content`.
pub fn base(title: &str, content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Coinpurse" }
                style { (PreEscaped(STYLESHEET)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Format a money amount with a currency symbol, a thousands separator and
/// two decimal places.
pub fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::currency("-$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    let mut formatted_string = if number < 0.0 {
        negative_fmt.fmt_string(number.abs())
    } else if number > 0.0 {
        positive_fmt.fmt_string(number)
    } else {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        "$0.00".to_owned()
    };

    // numfmt omits the last trailing zero, so we must add it ourselves
    // For example, "12.30" is rendered as "12.3" so we append "0".
    if formatted_string.as_bytes()[formatted_string.len() - 3] != b'.' {
        formatted_string = format!("{formatted_string}0");
    }

    formatted_string
}

/// Format an operation timestamp for display, to minute precision.
pub fn format_timestamp(date: &OffsetDateTime) -> String {
    date.format(TIMESTAMP_FORMAT).unwrap_or_else(|error| {
        tracing::error!("could not format timestamp {date}: {error}");
        String::new()
    })
}

/// A paragraph holding `error_message`, or nothing when there is no message.
pub fn error_message_view(error_message: Option<&str>) -> Markup {
    html! {
        @if let Some(error_message) = error_message {
            p class="error" { (error_message) }
        }
    }
}
