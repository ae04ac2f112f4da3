//! Fixed table layouts for importable CSV files
//!
//! Table identifiers are never taken from user input: every statement is
//! built from a [`TargetTable`], whose names are compile-time constants.

use reel_common::TargetTable;

/// Name of the aggregate view rebuilt after each successful import
pub const MOVIE_RATINGS_VIEW: &str = "mv_movie_ratings";

/// Column definitions, in CSV column order
pub fn column_definitions(table: TargetTable) -> &'static str {
    match table {
        TargetTable::Ratings => {
            "userId INT, movieId INT, rating FLOAT CHECK (rating >= 0.5 AND rating <= 5.0), timestamp BIGINT"
        },
        TargetTable::Tags => "userId INT, movieId INT, tag TEXT, timestamp BIGINT",
        TargetTable::Movies => "movieId INT PRIMARY KEY, title TEXT, genres TEXT",
        TargetTable::Links => "movieId INT PRIMARY KEY, imdbId INT, tmdbId INT",
        TargetTable::GenomeScores => "movieId INT, tagId INT, relevance FLOAT",
        TargetTable::GenomeTags => "tagId INT PRIMARY KEY, tag TEXT",
    }
}

pub fn drop_staging_sql(table: TargetTable) -> String {
    format!("DROP TABLE IF EXISTS {}", table.staging_name())
}

pub fn create_staging_sql(table: TargetTable) -> String {
    format!("CREATE TABLE {} ({})", table.staging_name(), column_definitions(table))
}

pub fn copy_sql(table: TargetTable) -> String {
    format!("COPY {} FROM STDIN WITH CSV HEADER", table.staging_name())
}

pub fn count_staging_sql(table: TargetTable) -> String {
    format!("SELECT COUNT(*) FROM {}", table.staging_name())
}

/// Epoch-seconds `timestamp` column rewritten as `TIMESTAMP`, for tables that carry one
pub fn convert_timestamp_sql(table: TargetTable) -> Option<String> {
    table.has_epoch_timestamp().then(|| {
        format!(
            "ALTER TABLE {} ALTER COLUMN timestamp TYPE TIMESTAMP USING to_timestamp(timestamp)",
            table.staging_name()
        )
    })
}

pub fn drop_live_sql(table: TargetTable) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", table.as_str())
}

pub fn rename_staging_sql(table: TargetTable) -> String {
    format!("ALTER TABLE {} RENAME TO {}", table.staging_name(), table.as_str())
}

/// Primary-key indexes keep their name across a table rename; move the
/// staging index name over so the next staging table can reuse it
pub fn rename_staging_pkey_sql(table: TargetTable) -> String {
    format!(
        "ALTER INDEX IF EXISTS {}_pkey RENAME TO {}_pkey",
        table.staging_name(),
        table.as_str()
    )
}

/// Advisory-lock key for imports into `table`, shared by every process
pub fn import_lock_key(table: TargetTable) -> String {
    format!("reel:import:{}", table.as_str())
}

pub const DROP_VIEW_SQL: &str = "DROP MATERIALIZED VIEW IF EXISTS mv_movie_ratings";

pub const CREATE_VIEW_SQL: &str = r#"
    CREATE MATERIALIZED VIEW mv_movie_ratings AS
    SELECT mv.movieId, mv.title, mv.genres,
           AVG(rt.rating) AS avg_rating,
           COUNT(*) AS rating_count,
           lk.imdbId, lk.tmdbId
    FROM movies mv
    INNER JOIN ratings rt ON mv.movieId = rt.movieId
    INNER JOIN links lk ON mv.movieId = lk.movieId
    GROUP BY mv.movieId, lk.imdbId, lk.tmdbId
"#;
