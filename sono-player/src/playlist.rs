//! Track list and play order

use sono_library::TrackEntry;

/// Play-order strategy
///
/// Linear advancement steps the raw track index modulo the count and never
/// consults a permutation; shuffled advancement walks the stored
/// permutation and wraps within it. The two wraparound rules stay separate.
pub enum PlayOrder {
    Linear,
    Shuffled(Vec<usize>),
}

/// The loaded track set and its play order
///
/// The order always has exactly one slot per track; it is rebuilt whenever
/// the track set changes or shuffle is toggled.
pub struct Playlist {
    entries: Vec<TrackEntry>,
    order: PlayOrder,
}

impl Playlist {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            order: PlayOrder::Linear,
        }
    }

    /// Replace the track set (folder reload), rebuilding the order and
    /// keeping the current shuffle mode
    pub fn set_entries(&mut self, entries: Vec<TrackEntry>) {
        self.entries = entries;
        if self.is_shuffled() {
            self.order = PlayOrder::Shuffled(Self::permutation(self.entries.len()));
        }
    }

    fn permutation(len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        fastrand::shuffle(&mut order);
        order
    }

    /// Generate a fresh random permutation over all tracks
    pub fn enable_shuffle(&mut self) {
        self.order = PlayOrder::Shuffled(Self::permutation(self.entries.len()));
    }

    /// Restore identity ordering
    pub fn disable_shuffle(&mut self) {
        self.order = PlayOrder::Linear;
    }

    pub fn is_shuffled(&self) -> bool {
        matches!(self.order, PlayOrder::Shuffled(_))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, index: usize) -> Option<&TrackEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    /// The play order as track indices (identity when linear)
    pub fn order_indices(&self) -> Vec<usize> {
        match &self.order {
            PlayOrder::Linear => (0..self.entries.len()).collect(),
            PlayOrder::Shuffled(order) => order.clone(),
        }
    }

    /// Track index following `current` in play order
    pub fn next_index(&self, current: usize) -> Option<usize> {
        self.step(current, 1)
    }

    /// Track index preceding `current` in play order
    pub fn previous_index(&self, current: usize) -> Option<usize> {
        self.step(current, -1)
    }

    fn step(&self, current: usize, direction: isize) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }

        let linear = |index: usize| (index + len).wrapping_add_signed(direction) % len;

        Some(match &self.order {
            PlayOrder::Linear => linear(current),
            PlayOrder::Shuffled(order) => match order.iter().position(|&i| i == current) {
                Some(pos) => order[(pos + len).wrapping_add_signed(direction) % len],
                // Current index missing from the permutation; fall back to
                // the raw sequence rather than abort
                None => linear(current),
            },
        })
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn tracks(count: usize) -> Vec<TrackEntry> {
        (0..count)
            .map(|i| TrackEntry {
                path: PathBuf::from(format!("/music/{i:02}.mp3")),
                title: format!("{i:02}"),
            })
            .collect()
    }

    fn playlist(count: usize) -> Playlist {
        let mut playlist = Playlist::new();
        playlist.set_entries(tracks(count));
        playlist
    }

    #[test]
    fn linear_next_wraps_at_the_end() {
        let playlist = playlist(5);
        assert_eq!(playlist.next_index(4), Some(0));
        assert_eq!(playlist.next_index(2), Some(3));
    }

    #[test]
    fn linear_previous_wraps_at_the_start() {
        let playlist = playlist(5);
        assert_eq!(playlist.previous_index(0), Some(4));
        assert_eq!(playlist.previous_index(3), Some(2));
    }

    #[test]
    fn empty_playlist_has_no_neighbors() {
        let playlist = Playlist::new();
        assert_eq!(playlist.next_index(0), None);
        assert_eq!(playlist.previous_index(0), None);
    }

    #[test]
    fn shuffle_off_restores_identity_order() {
        let mut playlist = playlist(8);
        playlist.enable_shuffle();
        playlist.disable_shuffle();
        assert_eq!(playlist.order_indices(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_order_is_a_permutation() {
        let mut playlist = playlist(16);
        playlist.enable_shuffle();
        let order = playlist.order_indices();
        assert_eq!(order.len(), 16);
        assert_eq!(order.iter().copied().collect::<BTreeSet<_>>().len(), 16);
    }

    #[test]
    fn shuffled_next_visits_every_track_once_per_cycle() {
        let mut playlist = playlist(10);
        playlist.enable_shuffle();

        let mut seen = BTreeSet::new();
        let mut current = 3;
        for _ in 0..10 {
            current = playlist.next_index(current).unwrap();
            seen.insert(current);
        }
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn shuffled_previous_inverts_next() {
        let mut playlist = playlist(10);
        playlist.enable_shuffle();

        let start = 7;
        let forward = playlist.next_index(start).unwrap();
        assert_eq!(playlist.previous_index(forward), Some(start));
    }

    #[test]
    fn reload_keeps_shuffle_mode_and_order_length() {
        let mut playlist = playlist(5);
        playlist.enable_shuffle();
        playlist.set_entries(tracks(9));

        assert!(playlist.is_shuffled());
        let order = playlist.order_indices();
        assert_eq!(order.len(), 9);
        assert_eq!(order.iter().copied().collect::<BTreeSet<_>>().len(), 9);
    }
}
