//! Tag color assignment.
//!
//! Every tag gets a palette color the first time any worker sees it and
//! keeps it for the life of the process. The map and the round-robin cursor
//! live under one lock so lookup-or-assign is a single critical section.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use alog_core::{ColorCycle, PaletteColor};

/// Tags with a fixed color, installed before any worker runs.
///
/// Several tags share a color on purpose. Seeding does not move the cursor.
pub const SEEDED_TAGS: [(&str, PaletteColor); 4] = [
    ("dalvikvm", PaletteColor::Blue),
    ("Process", PaletteColor::Blue),
    ("ActivityManager", PaletteColor::Cyan),
    ("ActivityThread", PaletteColor::Cyan),
];

#[derive(Debug, Default)]
struct TagTable {
    colors: HashMap<String, PaletteColor>,
    cycle: ColorCycle,
}

/// Concurrent tag name to color map.
#[derive(Debug, Default)]
pub struct TagColors {
    table: Mutex<TagTable>,
}

impl TagColors {
    /// Creates a map pre-seeded with [`SEEDED_TAGS`].
    pub fn new() -> Self {
        let colors = SEEDED_TAGS
            .iter()
            .map(|(tag, color)| ((*tag).to_string(), *color))
            .collect();
        Self {
            table: Mutex::new(TagTable {
                colors,
                cycle: ColorCycle::new(),
            }),
        }
    }

    /// Creates an empty map with no seeded tags.
    pub fn empty() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TagTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the color for `tag`, assigning the next palette color on first sight.
    pub fn resolve(&self, tag: &str) -> PaletteColor {
        let mut table = self.lock();
        if let Some(color) = table.colors.get(tag) {
            return *color;
        }
        let color = table.cycle.advance();
        table.colors.insert(tag.to_string(), color);
        color
    }

    /// Returns the color for `tag` without assigning one.
    pub fn get(&self, tag: &str) -> Option<PaletteColor> {
        self.lock().colors.get(tag).copied()
    }

    /// Number of tags with a color.
    pub fn len(&self) -> usize {
        self.lock().colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every mapping. Used at teardown.
    pub fn clear(&self) {
        self.lock().colors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alog_core::PALETTE_SIZE;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_seeded_tags_share_colors() {
        let tags = TagColors::new();
        assert_eq!(tags.len(), 4);
        assert_eq!(tags.resolve("dalvikvm"), PaletteColor::Blue);
        assert_eq!(tags.resolve("Process"), PaletteColor::Blue);
        assert_eq!(tags.resolve("ActivityManager"), PaletteColor::Cyan);
        assert_eq!(tags.resolve("ActivityThread"), PaletteColor::Cyan);
    }

    #[test]
    fn test_seeding_does_not_advance_cursor() {
        let tags = TagColors::new();
        assert_eq!(tags.resolve("MyApp"), PaletteColor::Red);
    }

    #[test]
    fn test_resolution_is_stable() {
        let tags = TagColors::empty();
        let first = tags.resolve("Choreographer");
        tags.resolve("OtherTag");
        for _ in 0..5 {
            assert_eq!(tags.resolve("Choreographer"), first);
        }
        assert_eq!(tags.get("Choreographer"), Some(first));
        assert_eq!(tags.get("Unseen"), None);
    }

    #[test]
    fn test_round_robin_covers_palette() {
        let tags = TagColors::empty();
        let colors: Vec<_> = (0..PALETTE_SIZE)
            .map(|i| tags.resolve(&format!("tag-{i}")))
            .collect();

        let unique: HashSet<_> = colors.iter().collect();
        assert_eq!(unique.len(), PALETTE_SIZE);
        assert_eq!(colors, PaletteColor::ALL.to_vec());
        assert_eq!(tags.resolve("tag-wrap"), PaletteColor::Red);
    }

    #[test]
    fn test_concurrent_first_resolution_agrees() {
        let tags = Arc::new(TagColors::empty());
        // Advance the cursor so a racing double-assign would be visible
        tags.resolve("warmup");

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tags = Arc::clone(&tags);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    tags.resolve("RaceTag")
                })
            })
            .collect();

        let seen: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(seen.len(), 1);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.resolve("next"), PaletteColor::Yellow);
    }

    #[test]
    fn test_clear() {
        let tags = TagColors::new();
        tags.resolve("x");
        tags.clear();
        assert!(tags.is_empty());
    }
}
