use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub synopsis: String,
    pub director_name: String,
    pub duration_minutes: i32,
    pub release_date: NaiveDate,
    pub rating: Option<f64>,
    pub poster_image: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMovie {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub director_name: String,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub duration_minutes: i32,
    pub release_date: NaiveDate,
    #[validate(range(min = 0.0, max = 10.0, message = "must be between 0 and 10"))]
    pub rating: Option<f64>,
    pub poster_image: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MovieUpdate {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: Option<String>,
    pub synopsis: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub director_name: Option<String>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub duration_minutes: Option<i32>,
    pub release_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 10.0, message = "must be between 0 and 10"))]
    pub rating: Option<f64>,
    pub poster_image: Option<String>,
    pub genres: Option<Vec<String>>,
}

impl MovieUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.synopsis.is_none()
            && self.director_name.is_none()
            && self.duration_minutes.is_none()
            && self.release_date.is_none()
            && self.rating.is_none()
            && self.poster_image.is_none()
            && self.genres.is_none()
    }

    pub fn apply(&self, movie: &mut Movie) {
        if let Some(title) = &self.title {
            movie.title = title.clone();
        }
        if let Some(synopsis) = &self.synopsis {
            movie.synopsis = synopsis.clone();
        }
        if let Some(director) = &self.director_name {
            movie.director_name = director.clone();
        }
        if let Some(duration) = self.duration_minutes {
            movie.duration_minutes = duration;
        }
        if let Some(date) = self.release_date {
            movie.release_date = date;
        }
        if let Some(rating) = self.rating {
            movie.rating = Some(rating);
        }
        if let Some(poster) = &self.poster_image {
            movie.poster_image = Some(poster.clone());
        }
        if let Some(genres) = &self.genres {
            movie.genres = genres.clone();
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 12;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Query of `GET /movies/filter`. `genre` is a comma separated list; a movie
/// matches when it carries any of the listed genres.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieFilterQuery {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Normalized filter handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub genres: Vec<String>,
    pub page: u32,
    pub limit: u32,
}

impl MovieFilter {
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }
}

impl From<MovieFilterQuery> for MovieFilter {
    // Некорректные page/limit заменяются значениями по умолчанию
    fn from(query: MovieFilterQuery) -> Self {
        let title = query
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let genres = query
            .genre
            .map(|g| {
                g.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .map_or(DEFAULT_PAGE_LIMIT, |l| l.min(MAX_PAGE_LIMIT));
        MovieFilter { title, genres, page, limit }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// One screening of a movie; `id` is the `now_showing_id` orders refer to.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ShowingSchedule {
    pub id: i32,
    pub movie_id: i32,
    pub movie_title: String,
    pub cinema_id: i32,
    pub cinema_name: String,
    pub location_id: i32,
    pub location_name: String,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
}
