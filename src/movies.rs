use std::collections::HashMap;
use std::path::Path;

/// Static movie catalog, loaded once at startup.
///
/// Maps movie ids to display titles. Used to validate movie identifiers on the
/// feedback path and to put titles on watchlists and recommendation lists.
#[derive(Debug, Default, Clone)]
pub struct MovieCatalog {
    titles: HashMap<i64, String>,
}

impl MovieCatalog {
    /// Loads the catalog from a JSON object of `"movie_id": "title"` pairs
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&raw)?;

        tracing::info!(
            movies = catalog.len(),
            path = %path.as_ref().display(),
            "Loaded movie catalog"
        );

        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let parsed: HashMap<String, String> = serde_json::from_str(raw)?;

        let mut titles = HashMap::with_capacity(parsed.len());
        for (id, title) in parsed {
            let movie_id: i64 = id
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid movie id in catalog: {:?}", id))?;
            titles.insert(movie_id, title);
        }

        Ok(Self { titles })
    }

    pub fn contains(&self, movie_id: i64) -> bool {
        self.titles.contains_key(&movie_id)
    }

    /// Title for a movie id; callers fall back to "Unknown Movie" for display
    pub fn title(&self, movie_id: i64) -> Option<&str> {
        self.titles.get(&movie_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl FromIterator<(i64, String)> for MovieCatalog {
    fn from_iter<I: IntoIterator<Item = (i64, String)>>(iter: I) -> Self {
        Self {
            titles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let catalog =
            MovieCatalog::from_json(r#"{"1": "Toy Story (1995)", "42": "Clerks (1994)"}"#).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(42));
        assert_eq!(catalog.title(1), Some("Toy Story (1995)"));
        assert_eq!(catalog.title(99), None);
    }

    #[test]
    fn test_from_json_rejects_non_numeric_ids() {
        let result = MovieCatalog::from_json(r#"{"tt0114709": "Toy Story (1995)"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_iterator() {
        let catalog: MovieCatalog = [(7, "Twelve Monkeys (1995)".to_string())].into_iter().collect();
        assert!(catalog.contains(7));
        assert!(!catalog.contains(8));
    }
}
