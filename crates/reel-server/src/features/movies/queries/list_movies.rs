//! List movies query
//!
//! Pages through `mv_movie_ratings`, optionally filtered by release year,
//! genre, minimum average rating and minimum rating count. Filters combine
//! with AND.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::features::shared::pagination::{OffsetPage, OffsetParams};
use crate::ingest::schema::MOVIE_RATINGS_VIEW;

const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMoviesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Matched against the `(YYYY)` suffix of the title
    pub year: Option<String>,
    /// Substring of the pipe-separated genre list, case-insensitive
    pub genre: Option<String>,
    /// Minimum average rating
    pub rating: Option<f64>,
    /// Minimum number of ratings
    pub ratings_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct MovieSummary {
    pub movieid: i32,
    pub title: Option<String>,
    pub genres: Option<String>,
    pub average_rating: Option<f64>,
    pub ratings_count: i64,
    pub imdbid: Option<i32>,
    pub tmdbid: Option<i32>,
}

pub type ListMoviesResponse = OffsetPage<MovieSummary>;

#[derive(Debug, thiserror::Error)]
pub enum ListMoviesError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListMoviesResponse, ListMoviesError>> for ListMoviesQuery {}

impl ListMoviesQuery {
    pub fn pagination(&self) -> OffsetParams {
        OffsetParams::new(self.limit, self.offset)
    }

    fn year(&self) -> Option<&str> {
        self.year.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn genre(&self) -> Option<&str> {
        self.genre.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Append ` WHERE ...` for whichever filters are set
    fn push_filters<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>) {
        let mut prefix = " WHERE ";

        if let Some(year) = self.year() {
            builder.push(prefix).push("title ILIKE ").push_bind(format!("%({year})%"));
            prefix = " AND ";
        }
        if let Some(genre) = self.genre() {
            builder.push(prefix).push("genres ILIKE ").push_bind(format!("%{genre}%"));
            prefix = " AND ";
        }
        if let Some(rating) = self.rating {
            builder.push(prefix).push("avg_rating >= ").push_bind(rating);
            prefix = " AND ";
        }
        if let Some(count) = self.ratings_count {
            builder.push(prefix).push("rating_count >= ").push_bind(count);
        }
    }

    fn count_query(&self) -> QueryBuilder<'_, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {MOVIE_RATINGS_VIEW}"));
        self.push_filters(&mut builder);
        builder
    }

    fn page_query(&self) -> QueryBuilder<'_, Postgres> {
        let params = self.pagination();
        let mut builder = QueryBuilder::new(format!(
            "SELECT movieid, title, genres, avg_rating::float8 AS average_rating, \
             rating_count AS ratings_count, imdbid, tmdbid FROM {MOVIE_RATINGS_VIEW}"
        ));
        self.push_filters(&mut builder);
        builder
            .push(" ORDER BY movieid LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());
        builder
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: ListMoviesQuery) -> Result<ListMoviesResponse, ListMoviesError> {
    let params = query.pagination();

    let total: i64 = match query.count_query().build_query_scalar().fetch_one(&pool).await {
        Ok(total) => total,
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNDEFINED_TABLE) => {
            // No import has produced the view yet.
            tracing::debug!("mv_movie_ratings does not exist yet");
            return Ok(OffsetPage::new("/movies", Vec::new(), 0, &params));
        },
        Err(e) => return Err(e.into()),
    };

    let movies: Vec<MovieSummary> = query.page_query().build_query_as().fetch_all(&pool).await?;

    Ok(OffsetPage::new("/movies", movies, total, &params))
}
