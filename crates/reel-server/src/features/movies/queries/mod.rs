pub mod list_movies;

pub use list_movies::{ListMoviesError, ListMoviesQuery, ListMoviesResponse, MovieSummary};
