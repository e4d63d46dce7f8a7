//! WebVTT parser.
//!
//! ```text
//! WEBVTT
//!
//! intro
//! 00:00:00.000 --> 00:00:04.000 align:start
//! <v Speaker>Hello, world!</v>
//!
//! 00:04.000 --> 00:08.500
//! Second cue
//! ```
//!
//! A malformed cue block is reported with its line number and skipped; the
//! blocks after it are still parsed.

use super::Cue;
use crate::error::CueError;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedCaptions {
    pub cues: Vec<Cue>,
    pub errors: Vec<CueError>,
}

pub fn parse_vtt(content: &str) -> ParsedCaptions {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let content = content.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = content.split('\n').collect();
    let mut parsed = ParsedCaptions::default();

    let signature_ok = lines.first().is_some_and(|first| {
        first
            .strip_prefix("WEBVTT")
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
    });
    if !signature_ok {
        parsed.errors.push(CueError::at_line(1, "missing WEBVTT signature"));
        return parsed;
    }

    // The header runs up to the first blank line.
    let mut i = 0;
    while i < lines.len() && !lines[i].trim().is_empty() {
        i += 1;
    }

    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        let block_start = i;
        while i < lines.len() && !lines[i].trim().is_empty() {
            i += 1;
        }
        // Line numbers are 1-based.
        match parse_block(&lines[block_start..i], block_start + 1) {
            Ok(Some(cue)) => parsed.cues.push(cue),
            Ok(None) => {}
            Err(e) => parsed.errors.push(e),
        }
    }

    if !parsed.cues.is_sorted_by(|a, b| a.start <= b.start) {
        tracing::warn!("caption cues are not in start-time order, sorting them");
        parsed.cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    parsed
}

fn parse_block(block: &[&str], first_line: usize) -> Result<Option<Cue>, CueError> {
    let head = block[0];
    if is_keyword_block(head, "NOTE") || is_keyword_block(head, "STYLE") || is_keyword_block(head, "REGION") {
        return Ok(None);
    }

    let timing_index = if head.contains("-->") {
        0
    } else if block.len() > 1 && block[1].contains("-->") {
        1
    } else {
        return Err(CueError::at_line(first_line, "expected a cue timing line"));
    };
    let line = first_line + timing_index;

    let (start, end) = parse_timing_line(block[timing_index]).map_err(|m| CueError::at_line(line, m))?;
    if end < start {
        return Err(CueError::at_line(line, "cue ends before it starts"));
    }

    let text = block[timing_index + 1..].join("\n");
    Ok(Some(Cue {
        start,
        end,
        text: strip_voice_tags(&text),
    }))
}

fn is_keyword_block(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

fn parse_timing_line(line: &str) -> Result<(f64, f64), String> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| format!("expected 'start --> end': {}", line))?;
    let end = rest.split_whitespace().next().unwrap_or("");
    Ok((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// `hh:mm:ss.ttt` or `mm:ss.ttt`, in seconds.
fn parse_timestamp(ts: &str) -> Result<f64, String> {
    let invalid = || format!("invalid timestamp '{}'", ts);

    let parts: Vec<&str> = ts.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };

    let (whole, fraction) = seconds.split_once('.').ok_or_else(invalid)?;
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || !all_digits(minutes) || !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }
    if minutes.len() != 2 || whole.len() != 2 || fraction.len() != 3 {
        return Err(invalid());
    }

    let hours: f64 = hours.parse().map_err(|_| invalid())?;
    let minutes: f64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(invalid());
    }

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Removes `<v Speaker>` and `</v>` voice spans, keeping their content.
pub fn strip_voice_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        let tag = &rest[open + 1..];
        let name = tag.strip_prefix('/').unwrap_or(tag);
        let is_voice = name.starts_with('v')
            && name[1..].starts_with(|c: char| c == '>' || c == '.' || c.is_whitespace());
        match (is_voice, tag.find('>')) {
            (true, Some(close)) => {
                out.push_str(&rest[..open]);
                rest = &tag[close + 1..];
            }
            _ => {
                out.push_str(&rest[..open + 1]);
                rest = tag;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_with_identifiers_and_settings() {
        let vtt = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:09.000\nhi\n\nintro\n00:10.000 --> 00:24.000 align:start\nbye\nthere\n";
        let parsed = parse_vtt(vtt);
        assert!(parsed.errors.is_empty());
        assert_eq!(
            parsed.cues,
            vec![
                Cue::new(0.0, 9.0, "hi"),
                Cue::new(10.0, 24.0, "bye\nthere"),
            ]
        );
    }

    #[test]
    fn test_malformed_cue_is_reported_and_skipped() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\none\n\n00:00:xx.000 --> 00:00:04.000\nbad\n\njust text\n\n00:00:05.000 --> 00:00:06.000\nthree\n";
        let parsed = parse_vtt(vtt);
        assert_eq!(parsed.cues.len(), 2);
        assert_eq!(parsed.cues[1].text, "three");
        assert_eq!(
            parsed.errors,
            vec![
                CueError::at_line(6, "invalid timestamp '00:00:xx.000'"),
                CueError::at_line(9, "expected a cue timing line"),
            ]
        );
    }

    #[test]
    fn test_missing_signature() {
        let parsed = parse_vtt("00:00:01.000 --> 00:00:02.000\nhi\n");
        assert!(parsed.cues.is_empty());
        assert_eq!(parsed.errors[0].line, 1);
    }

    #[test]
    fn test_notes_and_header_are_skipped() {
        let vtt = "WEBVTT - talk\nKind: captions\n\nNOTE this is\na comment\n\nSTYLE\n::cue { color: red }\n\n00:01.000 --> 00:02.000\nx\n";
        let parsed = parse_vtt(vtt);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.cues, vec![Cue::new(1.0, 2.0, "x")]);
    }

    #[test]
    fn test_crlf_and_end_before_start() {
        let parsed = parse_vtt("WEBVTT\r\n\r\n00:00:05.000 --> 00:00:04.000\r\nbackwards\r\n");
        assert!(parsed.cues.is_empty());
        assert_eq!(parsed.errors, vec![CueError::at_line(3, "cue ends before it starts")]);
    }

    #[test]
    fn test_unsorted_cues_are_sorted() {
        let vtt = "WEBVTT\n\n00:10.000 --> 00:11.000\nb\n\n00:01.000 --> 00:02.000\na\n";
        let parsed = parse_vtt(vtt);
        assert_eq!(parsed.cues[0].text, "a");
        assert_eq!(parsed.cues[1].text, "b");
    }

    #[test]
    fn test_strip_voice_tags() {
        assert_eq!(strip_voice_tags("<v Bert Bos>Hello</v> <i>there</i>"), "Hello <i>there</i>");
        assert_eq!(strip_voice_tags("<v.loud Ann>Hi</v>"), "Hi");
        assert_eq!(strip_voice_tags("a < b <video>"), "a < b <video>");
    }
}
