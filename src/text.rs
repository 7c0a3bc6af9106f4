//! Cleanup for free-text synopses coming back from the bundled sources.

/// Strips markup, attribution notes and excess blank lines. Returns `None`
/// when nothing readable is left.
pub fn clean_synopsis(raw: &str) -> Option<String> {
    let text = strip_tags(raw);
    let text = decode_entities(&text);
    let text = drop_attributions(&text);
    let text = collapse_blank_lines(&text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            rest = "";
            break;
        };
        let tag = after[..close].trim().trim_start_matches('/').trim_start();
        if tag.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("br")) {
            out.push('\n');
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| entity_char(&after[..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity_char(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#039" => Some('\''),
        "nbsp" => Some(' '),
        "mdash" => Some('—'),
        "hellip" => Some('…'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Removes "(Source: ...)" and "[Written by ...]" notes that sources append
/// to their blurbs.
fn drop_attributions(input: &str) -> String {
    let mut text = input.to_string();
    for (open, marker, close) in [("(", "source:", ')'), ("[", "written by", ']')] {
        loop {
            let lower = text.to_ascii_lowercase();
            let needle = format!("{}{}", open, marker);
            let Some(start) = lower.find(&needle) else {
                break;
            };
            let end = lower[start..]
                .find(close)
                .map(|rel| start + rel + 1)
                .unwrap_or(text.len());
            text.replace_range(start..end, "");
        }
    }
    text
}

fn collapse_blank_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut blank_run = 0;
    for line in input.replace("\r\n", "\n").split('\n') {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_source_note() {
        let raw = "The third season of <i>One Punch Man</i>.<br><br>\n(Source: EMOTION Label YouTube Channel Description)<br><br>\n<i>Note: Excludes recap.</i>";
        let cleaned = clean_synopsis(raw).expect("text left");
        assert!(!cleaned.contains('<'));
        assert!(!cleaned.to_ascii_lowercase().contains("source:"));
        assert!(cleaned.starts_with("The third season of One Punch Man."));
        assert!(cleaned.ends_with("Note: Excludes recap."));
        assert!(!cleaned.contains("\n\n\n"));
    }

    #[test]
    fn drops_written_by_note() {
        let raw = "Gintoki runs an odd-jobs business.\n\n[Written by MAL Rewrite]";
        assert_eq!(
            clean_synopsis(raw).as_deref(),
            Some("Gintoki runs an odd-jobs business.")
        );
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(
            clean_synopsis("Tom &amp; Jerry&#39;s &#x41;").as_deref(),
            Some("Tom & Jerry's A")
        );
        assert_eq!(clean_synopsis("AT&T rocks").as_deref(), Some("AT&T rocks"));
    }

    #[test]
    fn empty_after_cleanup_is_none() {
        assert_eq!(clean_synopsis("<br><br>  "), None);
    }
}
