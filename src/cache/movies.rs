use crate::cache::{CacheError, CacheService};

pub const ALL_MOVIES_KEY: &str = "all_movies";
pub const POPULAR_MOVIES_KEY: &str = "popular_movies";
pub const UPCOMING_MOVIES_KEY: &str = "upcoming_movies";

pub fn movie_detail_key(movie_id: i32) -> String {
    format!("movie:{}", movie_id)
}

/// Every cached view whose contents may include `movie_id`.
pub fn movie_keys(movie_id: i32) -> Vec<String> {
    vec![
        ALL_MOVIES_KEY.to_string(),
        POPULAR_MOVIES_KEY.to_string(),
        UPCOMING_MOVIES_KEY.to_string(),
        movie_detail_key(movie_id),
    ]
}

impl CacheService {
    // Инвалидировать все представления, где может быть фильм
    pub async fn invalidate_movie(&self, movie_id: i32) -> Result<(), CacheError> {
        self.invalidate(&movie_keys(movie_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_keys_cover_listings_and_detail() {
        let keys = movie_keys(42);
        assert!(keys.contains(&"all_movies".to_string()));
        assert!(keys.contains(&"popular_movies".to_string()));
        assert!(keys.contains(&"upcoming_movies".to_string()));
        assert!(keys.contains(&"movie:42".to_string()));
        assert_eq!(keys.len(), 4);
    }
}
