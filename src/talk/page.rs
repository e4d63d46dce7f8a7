//! Renders the viewer page for one talk.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use super::AssembledTalk;
use crate::catalog::CatalogEntry;
use crate::config::Config;
use crate::dom::{escape_attr, escape_text};
use crate::engine::CAPTIONS_OFF;
use crate::model::{Playback, TalkRecord};
use crate::url::resolve;

/// What the request asked for: a preselected caption language and whether
/// sync mode starts switched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub language: Option<String>,
    pub sync: bool,
}

/// Data the client script needs to drive the sync engine in the browser.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncManifest<'a> {
    pub key: &'a str,
    pub timecodes: &'a [f64],
    pub captions: BTreeMap<&'a str, String>,
    pub sync_elements: Vec<ManifestElement<'a>>,
    pub playback: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ManifestElement<'a> {
    pub id: Option<&'a str>,
    pub slide: bool,
}

impl<'a> SyncManifest<'a> {
    pub fn new(talk: &'a TalkRecord, assembled: &'a AssembledTalk, asset_base: &str) -> Self {
        let captions = talk
            .captions
            .iter()
            .map(|(language, source)| (language, resolve(source, asset_base)))
            .collect();
        let sync_elements = assembled
            .document
            .sync_elements
            .iter()
            .map(|e| ManifestElement {
                id: e.id.as_deref(),
                slide: e.is_slide(),
            })
            .collect();
        let playback = talk.playback().map(|p| match p {
            Playback::Video(_) => "video",
            Playback::Audio(_) => "audio",
        });

        Self {
            key: &talk.key,
            timecodes: assembled.timecodes.as_slice(),
            captions,
            sync_elements,
            playback,
        }
    }
}

/// JSON that is safe inside a `<script>` element.
fn script_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(json) => json.replace("</", "<\\/"),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize page data");
            "null".to_string()
        }
    }
}

/// `"25 minutes"` becomes `PT25M0S`; durations that do not start with a
/// number are left out.
fn iso_duration(duration: &str) -> Option<String> {
    let minutes: u32 = duration.split_whitespace().next()?.parse().ok()?;
    Some(format!("PT{}M0S", minutes))
}

fn talk_href(talk: &TalkRecord) -> String {
    urlencoding::encode(&talk.key).into_owned()
}

pub fn render(entry: &CatalogEntry<'_>, config: &Config, assembled: &AssembledTalk, prefs: &Preferences) -> String {
    let talk = entry.talk;
    let app = &config.app;
    let title = escape_text(&talk.title);
    let presenter = escape_text(&talk.presenter);
    let poster = escape_attr(talk.poster.as_deref().unwrap_or(&app.default_poster));
    let playback = talk.playback();
    let description = format!(
        "{}’s presentation on “{}”.",
        talk.presenter, talk.title
    );

    let mut html = String::with_capacity(16 * 1024);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang=en>
  <head>
    <meta charset=utf-8>
    <meta name=viewport content="width=device-width">
    <title>{site} &ndash; {title}</title>
    <meta name="twitter:card" content="summary_large_image">
    <meta property="og:title" content="{title_attr}">
    <meta property="og:description" content="{description}">
    <meta property="og:image" content="{poster}">
    <meta property="twitter:image" content="{poster}">
    <link rel=stylesheet media="screen, print" href="/talk.css">
"#,
        site = escape_text(&app.site_name),
        title = title,
        title_attr = escape_attr(&talk.title),
        description = escape_attr(&description),
        poster = poster,
    );

    for style in &assembled.document.styles {
        let _ = writeln!(html, "{}", style);
    }
    if let Some(previous) = entry.previous {
        let _ = writeln!(html, "    <link rel=prev href=\"{}\">", talk_href(previous));
    }
    if let Some(next) = entry.next {
        let _ = writeln!(html, "    <link rel=next href=\"{}\">", talk_href(next));
    }

    let mut video_object = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "VideoObject",
        "name": talk.title,
        "description": description,
        "thumbnailUrl": talk.poster.as_deref().unwrap_or(&app.default_poster),
    });
    if let Some(published) = talk.published {
        video_object["uploadDate"] = published.to_rfc3339().into();
    }
    if let Some(duration) = iso_duration(&talk.duration) {
        video_object["duration"] = duration.into();
    }
    if let Some(Playback::Video(url)) = playback {
        video_object["embedUrl"] = url.into();
    }
    let _ = write!(
        html,
        "    <script type=\"application/ld+json\">\n{}\n    </script>\n  </head>\n  <body>\n",
        script_json(&video_object)
    );

    let _ = write!(
        html,
        r#"    <section id=intro>
      <h1>{title}</h1>
      <p>Presenter: <strong>{presenter}</strong><br>
      Duration: <strong>{duration}</strong></p>
"#,
        title = title,
        presenter = presenter,
        duration = escape_text(&talk.duration),
    );
    render_talk_buttons(&mut html, entry, None);
    html.push_str("    </section>\n\n    <section id=talk>\n      <form id=form>\n");

    let _ = write!(
        html,
        "        <input type=checkbox name=sync id=sync{}><label for=sync class=button>Sync {} and hide transcript</label>\n",
        if prefs.sync { " checked" } else { "" },
        playback.map(|p| p.noun()).unwrap_or("recording"),
    );

    if talk.timecodes.is_some() && playback.is_some() {
        html.push_str(
            r##"        <span id=prevnext aria-label="Slide navigation controls" role=navigation>
          <a id=firstslide href="#firstslide" title="First slide" class=button role=button>1st</a>
          <a id=prevslide href="#prevslide" title="Previous slide" class=button role=button>&larr;</a>
          <a id=nextslide href="#nextslide" title="Next slide" class=button role=button>&rarr;</a>
        </span>
"##,
        );
    }

    html.push_str("        <div id=player>\n");
    render_player(&mut html, talk, playback, &app.asset_base);

    if let (Some(first), Some(_)) = (assembled.document.first_slide(), playback) {
        let _ = writeln!(
            html,
            "          <output id=slidenr aria-live=polite><a href=\"#{}\">{}</a></output>",
            escape_attr(&first.id),
            escape_text(&first.label)
        );
    }

    let _ = write!(
        html,
        "          <div id=slides class=fade-in role=region aria-live=off aria-label=\"Slide container\">\n\n{}\n          </div>\n",
        assembled.document.to_html()
    );

    html.push_str("          <p id=caption>\n            <select title=\"Language for subtitles\" id=cuelang name=cuelang>\n");
    let selected = prefs.language.as_deref();
    for language in talk.captions.languages() {
        let _ = writeln!(
            html,
            "              <option value=\"{}\"{}>{}",
            escape_attr(language),
            if selected == Some(language) { " selected" } else { "" },
            escape_text(config.language_label(language))
        );
    }
    let _ = write!(
        html,
        r#"              <option value={off}{selected}>no captions
            </select>
            <output id=cue aria-live=off>
              <noscript>(Synchronization requires JavaScript)</noscript>
            </output>
          </p>
        </div>
      </form>
    </section>
"#,
        off = CAPTIONS_OFF,
        selected = if selected == Some(CAPTIONS_OFF) { " selected" } else { "" },
    );

    // The driver copies #nexttalk into the cue area when the audio ends.
    html.push_str("\n    <section id=extrabuttons>\n");
    render_talk_buttons(&mut html, entry, Some("nexttalk"));
    html.push_str("    </section>\n");

    let manifest = SyncManifest::new(talk, assembled, &app.asset_base);
    let _ = write!(
        html,
        "\n    <script type=\"application/json\" id=sync-manifest>\n{}\n    </script>\n",
        script_json(&manifest)
    );
    if let Some(script) = &app.client_script {
        let _ = writeln!(html, "    <script src=\"{}\"></script>", escape_attr(script));
    }
    html.push_str("  </body>\n</html>\n");

    html
}

fn render_talk_buttons(html: &mut String, entry: &CatalogEntry<'_>, next_id: Option<&str>) {
    html.push_str("      <p class=buttons>\n");
    if let Some(previous) = entry.previous {
        let _ = writeln!(
            html,
            "        <button type=submit form=form formaction=\"{}#intro\">Previous: {}</button>",
            talk_href(previous),
            escape_text(&previous.title)
        );
    }
    html.push_str("        <a href=\"/talks\">All talks</a>\n");
    if let Some(next) = entry.next {
        let id = next_id.map(|id| format!(" id={}", id)).unwrap_or_default();
        let _ = writeln!(
            html,
            "        <button{} type=submit form=form formaction=\"{}#intro\">Next: {}</button>",
            id,
            talk_href(next),
            escape_text(&next.title)
        );
    }
    html.push_str("      </p>\n");
}

fn render_player(html: &mut String, talk: &TalkRecord, playback: Option<Playback<'_>>, asset_base: &str) {
    let Some(playback) = playback else {
        return;
    };
    let label = escape_attr(&format!(
        "{} of ‘{}’ by {}",
        capitalize(playback.noun()),
        talk.title,
        talk.presenter
    ));
    let src = escape_attr(&resolve(playback.url(), asset_base));

    match playback {
        Playback::Audio(_) => {
            let _ = writeln!(html, "          <audio id=audio controls title=\"{}\" src=\"{}\"></audio>", label, src);
        }
        Playback::Video(_) => {
            let _ = writeln!(
                html,
                "          <div id=video1><iframe id=video width=640 height=360 title=\"{}\" src=\"{}\" \
                 allow=\"accelerometer; autoplay; encrypted-media; picture-in-picture\" allowfullscreen></iframe></div>",
                label, src
            );
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
