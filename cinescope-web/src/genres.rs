//! Fixed genre catalog
//!
//! The discovery UI offers a fixed set of genres; the ids are TMDB's
//! canonical genre ids and must match what the catalog expects.

use serde::Serialize;

/// A movie genre as exposed by the discovery endpoints
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: &'static str,
}

/// All genres offered by the discovery UI
pub const GENRES: &[Genre] = &[
    Genre { id: 28, name: "Action" },
    Genre { id: 35, name: "Comedy" },
    Genre { id: 18, name: "Drama" },
    Genre { id: 27, name: "Horror" },
    Genre { id: 16, name: "Animation" },
    Genre { id: 10749, name: "Romance" },
    Genre { id: 878, name: "Science Fiction" },
    Genre { id: 53, name: "Thriller" },
    Genre { id: 80, name: "Crime" },
    Genre { id: 99, name: "Documentary" },
    Genre { id: 10751, name: "Family" },
];

/// Look up a genre by its TMDB id
pub fn by_id(id: u32) -> Option<Genre> {
    GENRES.iter().copied().find(|g| g.id == id)
}

/// Look up a genre by its display name (case-insensitive)
pub fn by_name(name: &str) -> Option<Genre> {
    GENRES
        .iter()
        .copied()
        .find(|g| g.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(by_id(28).unwrap().name, "Action");
        assert_eq!(by_id(10751).unwrap().name, "Family");
        assert!(by_id(12345).is_none());
    }

    #[test]
    fn test_lookup_by_name_case_insensitive() {
        assert_eq!(by_name("science fiction").unwrap().id, 878);
        assert_eq!(by_name("DRAMA").unwrap().id, 18);
        assert!(by_name("Western").is_none());
    }

    #[test]
    fn test_genre_ids_unique() {
        for (i, a) in GENRES.iter().enumerate() {
            for b in &GENRES[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate genre id {}", a.id);
            }
        }
    }
}
