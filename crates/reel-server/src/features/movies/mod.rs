//! Imported movie catalogue
//!
//! Read-only, paginated access to the aggregate `mv_movie_ratings` view.

pub mod queries;
pub mod routes;

pub use queries::{ListMoviesError, ListMoviesQuery, ListMoviesResponse, MovieSummary};
pub use routes::movies_routes;
