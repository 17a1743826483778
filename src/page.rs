use std::fmt::Write;

use soundscope_report::report::TrackReport;
use soundscope_spotify_api::user::CurrentUser;

use crate::session::Notice;
use crate::session::NoticeKind;

pub const TITLE: &str = "Your Spotify Analysis";
const SUBTITLE: &str = "Insights about your music listening habits.";

// Musical note emoji as an inline SVG favicon.
const ICON: &str = "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 100 100'><text y='.9em' font-size='90'>%F0%9F%8E%B5</text></svg>";

const STYLE: &str = r#"
body { font-family: sans-serif; max-width: 52rem; margin: 2rem auto; padding: 0 1rem; color: #1f1f1f; }
h1 { margin-bottom: 0.2rem; }
.subtitle { color: #666; margin-top: 0; }
.banner { padding: 0.8rem 1rem; border-radius: 0.4rem; margin: 1rem 0; }
.banner.success { background: #e6f4ea; color: #1e6b34; }
.banner.info { background: #e8f0fe; color: #1a4d99; }
.banner.error { background: #fde8e8; color: #9b1c1c; }
.profile { color: #555; font-size: 0.9rem; }
button { background: #1db954; color: white; border: none; border-radius: 2rem; padding: 0.6rem 1.4rem; font-size: 1rem; cursor: pointer; }
button.secondary { background: #eee; color: #333; font-size: 0.85rem; padding: 0.4rem 1rem; }
table { border-collapse: collapse; width: 100%; font-size: 0.9rem; }
th, td { border-bottom: 1px solid #ddd; padding: 0.35rem 0.5rem; text-align: left; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
svg.chart text { font-size: 12px; fill: #333; }
svg.chart rect { fill: #1db954; }
.loading { display: flex; align-items: center; gap: 0.8rem; color: #555; }
.spinner { width: 1.4rem; height: 1.4rem; border: 3px solid #ddd; border-top-color: #1db954; border-radius: 50%; animation: spin 0.8s linear infinite; }
@keyframes spin { to { transform: rotate(360deg); } }
"#;

pub const LOADING_MESSAGE: &str = "Fetching your top tracks...";

const CHART_LABEL_WIDTH: u32 = 220;
const CHART_BAR_WIDTH: u32 = 420;
const CHART_ROW_HEIGHT: u32 = 22;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    layout_with_head("", body)
}

fn layout_with_head(head: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{TITLE}</title>
    <link rel="icon" href="{ICON}">
    <style>{STYLE}</style>{head}
  </head>
  <body>
    <h1>{TITLE}</h1>
    <p class="subtitle">{SUBTITLE}</p>
{body}
  </body>
</html>
"#
    )
}

fn banner(class: &str, message: &str) -> String {
    format!(
        "    <div class=\"banner {class}\" role=\"status\">{}</div>\n",
        escape_html(message)
    )
}

fn notice_banner(notice: &Notice) -> String {
    let class = match notice.kind {
        NoticeKind::Info => "info",
        NoticeKind::Error => "error",
    };
    banner(class, &notice.message)
}

/// The unauthenticated branch: optional message plus the connect button.
pub fn connect_page(notice: Option<&Notice>) -> String {
    let mut body = String::new();
    if let Some(notice) = notice {
        body.push_str(&notice_banner(notice));
    }
    body.push_str(
        r#"    <form method="post" action="/connect">
      <button type="submit">Connect to Spotify</button>
    </form>
"#,
    );
    layout(&body)
}

/// Shown while the dashboard at `next` renders; the browser keeps it up until the fetch is done.
pub fn loading_page(next: &str) -> String {
    let next = escape_html(next);
    layout_with_head(
        &format!("\n    <meta http-equiv=\"refresh\" content=\"0; url={next}\">"),
        &format!(
            "    <div class=\"loading\" role=\"status\"><div class=\"spinner\"></div><span>{LOADING_MESSAGE}</span></div>\n"
        ),
    )
}

/// The authenticated branch. `report` is `Err(message)` when there is nothing to chart.
pub fn dashboard_page(
    user: &CurrentUser,
    report: Result<&TrackReport, &str>,
    notice: Option<&Notice>,
) -> String {
    let mut body = String::new();
    if let Some(notice) = notice {
        body.push_str(&notice_banner(notice));
    }
    body.push_str(&banner("success", &format!("Connected as: {}", user.name())));
    body.push_str(&profile_line(user));
    body.push_str(
        r#"    <form method="post" action="/disconnect">
      <button type="submit" class="secondary">Disconnect</button>
    </form>
"#,
    );

    match report {
        Ok(report) => {
            body.push_str(&track_list(report));
            body.push_str(&popularity_chart(report));
            body.push_str(&details_table(report));
        }
        Err(message) => body.push_str(&banner("error", message)),
    }
    layout(&body)
}

fn profile_line(user: &CurrentUser) -> String {
    let details: Vec<String> = [
        user.email.as_deref().map(|e| format!("Email: {e}")),
        user.country.as_deref().map(|c| format!("Country: {c}")),
        user.product.as_deref().map(|p| format!("Account: {p}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if details.is_empty() {
        return String::new();
    }
    format!(
        "    <p class=\"profile\">{}</p>\n",
        escape_html(&details.join(" · "))
    )
}

fn track_list(report: &TrackReport) -> String {
    let mut out = String::from("    <h2>Your Top Tracks</h2>\n    <ol class=\"tracks\">\n");
    for line in report.list_lines() {
        let _ = writeln!(out, "      <li>{}</li>", escape_html(&line));
    }
    out.push_str("    </ol>\n");
    out
}

/// Horizontal bars, one per track, in report order.
fn popularity_chart(report: &TrackReport) -> String {
    let series = report.popularity_series();
    let height = CHART_ROW_HEIGHT * series.len() as u32;
    let width = CHART_LABEL_WIDTH + CHART_BAR_WIDTH + 50;
    let mut out = String::from("    <h2>Track Popularity</h2>\n");
    let _ = writeln!(
        out,
        "    <svg class=\"chart\" role=\"img\" aria-label=\"Track popularity\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    for (i, (name, popularity)) in series.iter().enumerate() {
        let y = CHART_ROW_HEIGHT * i as u32;
        let bar = (popularity.clamp(0.0, 1.0) * CHART_BAR_WIDTH as f64).round() as u32;
        let name = escape_html(name);
        let _ = writeln!(
            out,
            "      <g class=\"bar\" data-track=\"{name}\" data-popularity=\"{popularity}\"><text x=\"0\" y=\"{}\">{name}</text><rect x=\"{CHART_LABEL_WIDTH}\" y=\"{}\" width=\"{bar}\" height=\"{}\"></rect><text x=\"{}\" y=\"{}\">{popularity:.2}</text></g>",
            y + 15,
            y + 3,
            CHART_ROW_HEIGHT - 6,
            CHART_LABEL_WIDTH + bar + 6,
            y + 15,
        );
    }
    out.push_str("    </svg>\n");
    out
}

fn details_table(report: &TrackReport) -> String {
    let explicit = report.includes_explicit();
    let mut out = String::from("    <h2>Track Details</h2>\n    <table>\n      <thead><tr><th></th><th>name</th><th>artist</th><th>popularity</th><th>length</th>");
    if explicit {
        out.push_str("<th>explicit</th>");
    }
    out.push_str("</tr></thead>\n      <tbody>\n");
    for (i, record) in report.records().iter().enumerate() {
        let _ = write!(
            out,
            "        <tr><td class=\"num\">{i}</td><td>{}</td><td>{}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td>",
            escape_html(&record.name),
            escape_html(&record.artist),
            record.popularity,
            record.duration_minutes,
        );
        if explicit {
            let flag = match record.explicit {
                Some(true) => "true",
                Some(false) => "false",
                None => "",
            };
            let _ = write!(out, "<td>{flag}</td>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("      </tbody>\n    </table>\n");
    out
}

#[cfg(test)]
mod tests {
    use soundscope_spotify_api::track::Artist;
    use soundscope_spotify_api::track::Track;

    use super::*;

    fn report(include_explicit: bool) -> TrackReport {
        let tracks: Vec<Track> = [("A", 80), ("B <b>", 50), ("C", 10)]
            .into_iter()
            .map(|(name, popularity)| Track {
                name: name.to_string(),
                artists: vec![Artist {
                    name: "X & Y".to_string(),
                    ..Default::default()
                }],
                popularity,
                duration_ms: 185_000,
                explicit: true,
                ..Default::default()
            })
            .collect();
        TrackReport::from_tracks(&tracks, include_explicit).unwrap()
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: "u".to_string(),
            display_name: Some("Ada".to_string()),
            country: Some("SE".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn connect_page_offers_button_and_error() {
        let html = connect_page(Some(&Notice::error("Authentication failed: nope")));
        assert!(html.contains("Connect to Spotify"));
        assert!(html.contains("banner error"));
        assert!(html.contains("Authentication failed: nope"));
        assert!(html.contains(TITLE));
    }

    #[test]
    fn dashboard_renders_list_chart_and_table_in_order() {
        let html = dashboard_page(&user(), Ok(&report(false)), None);
        assert!(html.contains("Connected as: Ada"));
        assert!(html.contains("Country: SE"));

        let a = html.find("<li>1. A by X &amp; Y</li>").unwrap();
        let b = html.find("<li>2. B &lt;b&gt; by X &amp; Y</li>").unwrap();
        let c = html.find("<li>3. C by X &amp; Y</li>").unwrap();
        assert!(a < b && b < c);

        let bars: Vec<_> = html.match_indices("class=\"bar\"").collect();
        assert_eq!(bars.len(), 3);
        assert!(html.contains("data-track=\"A\" data-popularity=\"0.8\""));
        assert!(html.contains("data-track=\"C\" data-popularity=\"0.1\""));
        assert!(html.contains("<td class=\"num\">3.08</td>"));
        assert!(!html.contains("<th>explicit</th>"));
        assert!(!html.contains("Connect to Spotify"));
    }

    #[test]
    fn explicit_column_when_included() {
        let html = dashboard_page(&user(), Ok(&report(true)), None);
        assert!(html.contains("<th>explicit</th>"));
        assert!(html.contains("<td>true</td>"));
    }

    #[test]
    fn loading_page_refreshes_to_dashboard() {
        let html = loading_page("/");
        assert!(html.contains(r#"<meta http-equiv="refresh" content="0; url=/">"#));
        assert!(html.contains("class=\"spinner\""));
        assert!(html.contains(LOADING_MESSAGE));
        assert!(!html.contains("Connect to Spotify"));
    }

    #[test]
    fn empty_report_shows_message() {
        let html = dashboard_page(&user(), Err("No tracks found"), None);
        assert!(html.contains("No tracks found"));
        assert!(!html.contains("Your Top Tracks"));
    }
}
