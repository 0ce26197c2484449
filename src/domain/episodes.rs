//! Episodes and the multipart grouping rule.

use std::path::PathBuf;

use super::values::ConfigMap;

/// A single logical episode of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub season: u32,
    pub episode: u32,
    /// Last episode number covered when several source episodes were coalesced.
    pub end_episode: Option<u32>,
    pub absolute: Option<u32>,
    pub title: String,
    /// Source artwork; empty until image selection has run.
    pub source: PathBuf,
    /// Where a rendered card for this episode is written.
    pub destination: Option<PathBuf>,
    pub extra_characteristics: ConfigMap,
}

impl Episode {
    pub fn new(season: u32, episode: u32, title: impl Into<String>) -> Self {
        Self {
            season,
            episode,
            end_episode: None,
            absolute: None,
            title: title.into(),
            source: PathBuf::new(),
            destination: None,
            extra_characteristics: ConfigMap::new(),
        }
    }

    /// `s1e2`-style key used for source image names.
    pub fn key(&self) -> String {
        format!("s{}e{}", self.season, self.episode)
    }

    /// Episode number as displayed on a card, e.g. `3` or `3-4`.
    pub fn episode_number_text(&self) -> String {
        match self.end_episode {
            Some(end) if end != self.episode => format!("{}-{end}", self.episode),
            _ => self.episode.to_string(),
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.end_episode.is_some()
    }
}

/// Merge runs of consecutive episodes whose titles share a base and carry
/// increasing part markers, `Title (1)`/`Title (2)` or `Title Part 1`/`Title Part 2`,
/// into single logical episodes titled with the shared base.
pub fn coalesce_multipart(episodes: Vec<Episode>) -> Vec<Episode> {
    let mut coalesced = Vec::with_capacity(episodes.len());
    let mut group: Option<PartGroup> = None;

    for episode in episodes {
        let part = split_part(&episode.title).map(|(base, part)| (base.to_string(), part));

        if let (Some(current), Some((base, part))) = (group.as_mut(), part.as_ref())
            && current.accepts(&episode, base, *part)
        {
            current.extend(&episode, *part);
            continue;
        }

        if let Some(done) = group.take() {
            coalesced.push(done.finish());
        }

        match part {
            Some((base, part)) => group = Some(PartGroup::start(episode, base, part)),
            None => coalesced.push(episode),
        }
    }

    if let Some(done) = group.take() {
        coalesced.push(done.finish());
    }
    coalesced
}

struct PartGroup {
    first: Episode,
    base: String,
    last_part: u32,
    last_episode: u32,
    grouped: bool,
}

impl PartGroup {
    fn start(first: Episode, base: String, part: u32) -> Self {
        let last_episode = first.episode;
        Self {
            first,
            base,
            last_part: part,
            last_episode,
            grouped: false,
        }
    }

    fn accepts(&self, episode: &Episode, base: &str, part: u32) -> bool {
        episode.season == self.first.season
            && self.last_episode.checked_add(1) == Some(episode.episode)
            && self.last_part.checked_add(1) == Some(part)
            && base.eq_ignore_ascii_case(&self.base)
    }

    fn extend(&mut self, episode: &Episode, part: u32) {
        self.last_part = part;
        self.last_episode = episode.episode;
        self.grouped = true;
    }

    fn finish(self) -> Episode {
        if !self.grouped {
            return self.first;
        }
        let mut episode = self.first;
        episode.title = self.base;
        episode.end_episode = Some(self.last_episode);
        episode
    }
}

/// Split `Title (2)` or `Title Part 2` / `Title, Part 2` / `Title - Part 2`
/// into its base title and part number.
fn split_part(title: &str) -> Option<(&str, u32)> {
    let trimmed = title.trim_end();

    if let Some(inner) = trimmed.strip_suffix(')')
        && let Some(open) = inner.rfind('(')
        && let Ok(part) = inner[open + 1..].trim().parse::<u32>()
    {
        let base = inner[..open].trim_end();
        return (!base.is_empty()).then_some((base, part));
    }

    let (head, number) = trimmed.rsplit_once(' ')?;
    let part = number.parse::<u32>().ok()?;
    let head = head.trim_end();
    let lowered = head.to_ascii_lowercase();
    if !lowered.ends_with("part") {
        return None;
    }
    let base = head[..head.len() - "part".len()]
        .trim_end()
        .trim_end_matches([',', ':', '-'])
        .trim_end();
    (!base.is_empty()).then_some((base, part))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(episodes: &[Episode]) -> Vec<(u32, String, Option<u32>)> {
        episodes
            .iter()
            .map(|ep| (ep.episode, ep.title.clone(), ep.end_episode))
            .collect()
    }

    #[test]
    fn parenthesised_parts_are_merged() {
        let episodes = vec![
            Episode::new(1, 1, "Pilot (1)"),
            Episode::new(1, 2, "Pilot (2)"),
            Episode::new(1, 3, "Next"),
        ];

        let merged = coalesce_multipart(episodes);

        assert_eq!(
            titles(&merged),
            vec![(1, "Pilot".into(), Some(2)), (3, "Next".into(), None)]
        );
        assert_eq!(merged[0].episode_number_text(), "1-2");
    }

    #[test]
    fn part_suffixes_are_merged() {
        let episodes = vec![
            Episode::new(2, 5, "The Storm, Part 1"),
            Episode::new(2, 6, "The Storm, Part 2"),
            Episode::new(2, 7, "The Storm - Part 3"),
        ];

        let merged = coalesce_multipart(episodes);

        assert_eq!(titles(&merged), vec![(5, "The Storm".into(), Some(7))]);
    }

    #[test]
    fn lone_part_keeps_its_title() {
        let episodes = vec![Episode::new(1, 1, "Alone (1)"), Episode::new(1, 2, "Other")];

        let merged = coalesce_multipart(episodes);

        assert_eq!(
            titles(&merged),
            vec![(1, "Alone (1)".into(), None), (2, "Other".into(), None)]
        );
    }

    #[test]
    fn gaps_and_season_boundaries_split_groups() {
        let episodes = vec![
            Episode::new(1, 9, "Finale (1)"),
            Episode::new(2, 1, "Finale (2)"),
            Episode::new(2, 3, "Finale (3)"),
        ];

        let merged = coalesce_multipart(episodes);
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|ep| !ep.is_multipart()));
    }

    #[test]
    fn maximal_numbers_do_not_extend_a_group() {
        let episodes = vec![
            Episode::new(1, 1, "Endless (4294967295)"),
            Episode::new(1, 2, "Endless (0)"),
            Episode::new(1, u32::MAX, "Last (1)"),
            Episode::new(1, 0, "Last (2)"),
        ];

        let coalesced = coalesce_multipart(episodes);

        assert_eq!(coalesced.len(), 4);
        assert!(coalesced.iter().all(|episode| !episode.is_multipart()));
    }

    #[test]
    fn years_in_titles_are_not_parts() {
        assert_eq!(split_part("Year One (1987)"), Some(("Year One", 1987)));
        assert_eq!(split_part("Departed"), None);
        assert_eq!(split_part("Counterpart 2"), None);
    }
}
