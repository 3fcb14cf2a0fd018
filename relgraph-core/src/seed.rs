use url::Url;

/// Extract the item id from a seed argument. Accepts a bare id or a link of
/// the form `youtu.be/<id>`, `youtube.com/watch?v=<id>` or
/// `youtube.com/embed/<id>` (scheme optional).
pub fn parse_video_id(seed: &str) -> Option<String> {
    let seed = seed.trim();
    if seed.is_empty() {
        return None;
    }
    if !seed.contains('/') && !seed.contains('.') {
        return is_item_id(seed).then(|| seed.to_string());
    }

    let url = Url::parse(seed)
        .or_else(|_| Url::parse(&format!("https://{}", seed)))
        .ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let id = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" => match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") => segments.next().map(str::to_string),
            _ => None,
        },
        _ => None,
    }?;

    is_item_id(&id).then_some(id)
}

fn is_item_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_links() {
        assert_eq!(parse_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            parse_video_id("youtube.com/embed/dQw4w9WgXcQ?autoplay=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(parse_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_rejects_other_links() {
        assert_eq!(parse_video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(parse_video_id("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(parse_video_id(""), None);
        assert_eq!(parse_video_id("not an id"), None);
    }
}
