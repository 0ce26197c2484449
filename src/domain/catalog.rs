//! Fixed vocabularies the editor and the series validation share.

/// Built-in card types.
pub const CARD_TYPES: &[&str] = &[
    "anime",
    "banner",
    "calligraphy",
    "comic book",
    "cutout",
    "divider",
    "fade",
    "formula 1",
    "frame",
    "graph",
    "inset",
    "landscape",
    "logo",
    "marvel",
    "music",
    "notification",
    "olivier",
    "overline",
    "poster",
    "roman",
    "shape",
    "standard",
    "star wars",
    "striped",
    "tinted frame",
    "tinted glass",
    "white border",
];

pub const DEFAULT_CARD_TYPE: &str = "standard";

/// Watched/unwatched spoiler styles.
pub const STYLES: &[&str] = &[
    "art",
    "art blur",
    "art blur grayscale",
    "art grayscale",
    "blur",
    "blur grayscale",
    "blur unique",
    "grayscale",
    "grayscale unique",
    "unique",
];

pub const EPISODE_DATA_SOURCES: &[&str] = &["emby", "jellyfin", "plex", "sonarr", "tmdb"];

pub const MEDIA_SERVERS: &[&str] = &["emby", "jellyfin", "plex"];

pub const FONT_CASES: &[&str] = &["blank", "lower", "source", "title", "upper"];

/// Card types are matched case-insensitively; remote card types (`user/Name`)
/// are accepted as-is.
pub fn is_known_card_type(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    CARD_TYPES.contains(&lowered.as_str()) || lowered.contains('/')
}

pub fn is_episode_data_source(value: &str) -> bool {
    EPISODE_DATA_SOURCES.contains(&value.trim().to_ascii_lowercase().as_str())
}

pub fn is_media_server(value: &str) -> bool {
    MEDIA_SERVERS.contains(&value.trim().to_ascii_lowercase().as_str())
}

/// Title-case a vocabulary value for display (`tinted frame` → `Tinted Frame`).
pub fn display_label(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
