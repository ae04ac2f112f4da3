//! Import pipeline integration tests
//!
//! These run against a real PostgreSQL database through `#[sqlx::test]`,
//! which creates a fresh database per test and applies the migrations.
//! Set `DATABASE_URL` and run with `cargo test -- --ignored`.
//!
//! Coverage includes:
//! - Staging, swap and view refresh for a full MovieLens subset
//! - Rejected rows leave the live table untouched
//! - Leftover staging tables from an interrupted run
//! - Repeated imports into a table with a primary key
//! - Monotonic status upserts
//! - Concurrent and duplicate imports into one table
//! - Queue claim, redelivery, ack and cancel

use reel_common::JobStatus;
use reel_server::config::Config;
use reel_server::features::movies::queries::list_movies::{self, ListMoviesQuery};
use reel_server::ingest::{
    ImportJob, JobOrchestrator, JobOutcome, JobQueue, PgImportBackend, PgJobQueue, PgStatusStore,
    StatusStore, StatusUpdate, TableLocks,
};
use reel_server::storage::ChunkStore;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const MOVIES_CSV: &str = "movieId,title,genres\n\
1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy\n\
2,Jumanji (1995),Adventure|Children|Fantasy\n\
3,Heat (1995),Action|Crime|Thriller\n";

const LINKS_CSV: &str = "movieId,imdbId,tmdbId\n1,114709,862\n2,113497,8844\n3,113277,949\n";

const RATINGS_CSV: &str = "userId,movieId,rating,timestamp\n\
1,1,4.0,964982703\n\
1,2,3.5,964981247\n\
2,1,5.0,964982224\n\
3,3,2.0,964983815\n";

const BAD_RATINGS_CSV: &str = "userId,movieId,rating,timestamp\n\
1,1,4.0,964982703\n\
1,3,3.0,964982931\n\
2,2,4.5,964982400\n\
1,2,6.0,964981247\n";

struct Harness {
    pool: PgPool,
    chunks: TempDir,
    orchestrator: JobOrchestrator,
}

impl Harness {
    fn new(pool: PgPool) -> Self {
        let chunks = TempDir::new().unwrap();
        let orchestrator = JobOrchestrator::new(
            Arc::new(PgStatusStore::new(pool.clone())),
            Arc::new(PgImportBackend::new(pool.clone())),
            ChunkStore::new(chunks.path()),
            TableLocks::new(),
        );
        Self {
            pool,
            chunks,
            orchestrator,
        }
    }

    fn write_chunk(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.chunks.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    async fn import(&self, job_id: &str, table: &str, contents: &str) -> JobOutcome {
        let name = format!("{job_id}.csv");
        let path = self.write_chunk(&name, contents);
        let job = ImportJob::new(name, table, path);
        self.orchestrator.run(job_id, &job).await
    }

    async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

async fn table_exists(pool: &PgPool, name: &str) -> bool {
    sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Import Tests
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_full_import_builds_movie_ratings_view(pool: PgPool) {
    let harness = Harness::new(pool.clone());

    assert!(matches!(harness.import("job-movies", "movies", MOVIES_CSV).await, JobOutcome::Completed(_)));
    assert!(matches!(harness.import("job-links", "links", LINKS_CSV).await, JobOutcome::Completed(_)));

    let outcome = harness.import("job-ratings", "ratings", RATINGS_CSV).await;
    let JobOutcome::Completed(stats) = outcome else {
        panic!("ratings import failed: {outcome:?}");
    };
    assert_eq!(stats.rows_inserted, 4);
    assert_eq!(stats.rows_failed, 0);

    assert_eq!(harness.count("ratings").await, 4);
    assert!(!table_exists(&pool, "ratings_temp").await);

    let page = list_movies::handle(pool.clone(), ListMoviesQuery::default()).await.unwrap();
    assert_eq!(page.count, 3);
    let toy_story = &page.results[0];
    assert_eq!(toy_story.movieid, 1);
    assert_eq!(toy_story.average_rating, Some(4.5));
    assert_eq!(toy_story.ratings_count, 2);
    assert_eq!(toy_story.imdbid, Some(114709));

    let filtered = list_movies::handle(
        pool.clone(),
        ListMoviesQuery {
            genre: Some("crime".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(filtered.count, 1);
    assert_eq!(filtered.results[0].title.as_deref(), Some("Heat (1995)"));

    let store = PgStatusStore::new(pool);
    let record = store.get("job-ratings").await.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.result.as_deref(), Some("Import completed successfully"));
    assert_eq!(record.rows_inserted, 4);
    assert!(record.completed_at.is_some());
    assert!(record.processing_time.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_out_of_range_rating_keeps_live_table(pool: PgPool) {
    let harness = Harness::new(pool.clone());
    assert!(matches!(harness.import("job-1", "ratings", RATINGS_CSV).await, JobOutcome::Completed(_)));

    let bad_path = harness.chunks.path().join("job-2.csv");
    let outcome = harness.import("job-2", "ratings", BAD_RATINGS_CSV).await;

    assert!(matches!(outcome, JobOutcome::Failed { .. }), "unexpected outcome: {outcome:?}");
    assert_eq!(harness.count("ratings").await, 4);
    assert!(!table_exists(&pool, "ratings_temp").await);
    assert!(!bad_path.exists());

    let record = PgStatusStore::new(pool).get("job-2").await.unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.result.is_some());
    // The valid rows are discarded together with the bad one.
    assert_eq!(record.rows_inserted, 0);
    assert_eq!(record.rows_failed, 0);
    assert!(record.completed_at.is_none());
    assert!(record.processing_time.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_leftover_staging_table_is_replaced(pool: PgPool) {
    sqlx::query("CREATE TABLE tags_temp (junk TEXT)").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO tags_temp VALUES ('left over')").execute(&pool).await.unwrap();

    let harness = Harness::new(pool.clone());
    let csv = "userId,movieId,tag,timestamp\n2,60756,funny,1445714994\n2,60756,Highly quotable,1445714996\n";
    let outcome = harness.import("job-tags", "tags", csv).await;

    assert!(matches!(outcome, JobOutcome::Completed(stats) if stats.rows_inserted == 2));
    assert_eq!(harness.count("tags").await, 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_reimport_table_with_primary_key(pool: PgPool) {
    let harness = Harness::new(pool.clone());

    assert!(matches!(harness.import("job-a", "movies", MOVIES_CSV).await, JobOutcome::Completed(_)));
    let smaller = "movieId,title,genres\n1,Toy Story (1995),Animation\n";
    let outcome = harness.import("job-b", "movies", smaller).await;

    assert!(matches!(outcome, JobOutcome::Completed(_)), "unexpected outcome: {outcome:?}");
    assert_eq!(harness.count("movies").await, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_unsupported_table_fails_job(pool: PgPool) {
    let harness = Harness::new(pool.clone());
    let path = harness.write_chunk("users.csv", "id\n1\n");

    let outcome = harness
        .orchestrator
        .run("job-users", &ImportJob::new("users.csv", "users", path.clone()))
        .await;

    assert!(matches!(outcome, JobOutcome::Failed { ref error, .. } if error.contains("users")));
    assert!(!table_exists(&pool, "users").await);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_concurrent_imports_into_same_table(pool: PgPool) {
    let harness = Harness::new(pool.clone());
    let smaller = "userId,movieId,rating,timestamp\n9,9,1.0,964982703\n";

    let (first, second) = tokio::join!(
        harness.import("job-a", "ratings", RATINGS_CSV),
        harness.import("job-b", "ratings", smaller),
    );

    assert!(matches!(first, JobOutcome::Completed(ref s) if s.rows_inserted == 4), "{first:?}");
    assert!(matches!(second, JobOutcome::Completed(ref s) if s.rows_inserted == 1), "{second:?}");

    // Whichever swap ran last owns the table; nothing is mixed.
    let count = harness.count("ratings").await;
    assert!(count == 4 || count == 1, "unexpected row count {count}");
    assert!(!table_exists(&pool, "ratings_temp").await);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_duplicate_delivery_runs_import_once(pool: PgPool) {
    let harness = Harness::new(pool.clone());
    let path = harness.write_chunk("ratings.csv", RATINGS_CSV);
    let job = ImportJob::new("ratings.csv", "ratings", path);

    let (first, second) = tokio::join!(
        harness.orchestrator.run("job-dup", &job),
        harness.orchestrator.run("job-dup", &job),
    );

    let completed = [&first, &second]
        .iter()
        .filter(|o| matches!(o, JobOutcome::Completed(_)))
        .count();
    let skipped = [&first, &second]
        .iter()
        .filter(|o| matches!(o, JobOutcome::Skipped(JobStatus::Completed)))
        .count();
    assert_eq!((completed, skipped), (1, 1), "{first:?} / {second:?}");
    assert_eq!(harness.count("ratings").await, 4);

    let record = PgStatusStore::new(pool).get("job-dup").await.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.rows_inserted, 4);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_movies_query_before_any_import(pool: PgPool) {
    let page = list_movies::handle(pool, ListMoviesQuery::default()).await.unwrap();
    assert_eq!(page.count, 0);
    assert!(page.results.is_empty());
    assert_eq!(page.next, None);
}

// ============================================================================
// Status Store Tests
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_status_upserts_never_regress(pool: PgPool) {
    let store = PgStatusStore::new(pool);

    assert!(store.upsert(&StatusUpdate::new("job-1", JobStatus::Started)).await.unwrap());
    // The gateway's late `queued` write arrives after the worker picked the job up.
    assert!(!store.upsert(&StatusUpdate::queued("job-1", "ratings.csv", "ratings")).await.unwrap());

    let record = store.get("job-1").await.unwrap();
    assert_eq!(record.status, JobStatus::Started);

    let stats = reel_server::ingest::ImportStats::new(10);
    assert!(store.upsert(&StatusUpdate::completed("job-1", &stats)).await.unwrap());
    assert!(!store
        .upsert(&StatusUpdate::failed("job-1", "late failure", &stats))
        .await
        .unwrap());

    let record = store.get("job-1").await.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.rows_inserted, 10);
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_get_missing_task(pool: PgPool) {
    let store = PgStatusStore::new(pool);
    assert!(store.get("does-not-exist").await.is_err());
}

// ============================================================================
// Queue Tests
// ============================================================================

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_queue_claim_redelivery_and_ack(pool: PgPool) {
    let queue = PgJobQueue::new(pool.clone(), &Config::default().queue);
    let job = ImportJob::new("ratings.csv", "ratings", PathBuf::from("/chunks/ratings.csv"));

    let id = queue.enqueue(&job).await.unwrap();

    let claimed = queue.claim("worker-a").await.unwrap().unwrap();
    assert_eq!(claimed.id, id);
    assert_eq!(claimed.attempts, 1);
    assert_eq!(claimed.job, job);

    // Held by worker-a until its lock goes stale.
    assert!(queue.claim("worker-b").await.unwrap().is_none());

    sqlx::query("UPDATE import_queue SET locked_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(&id)
        .execute(&pool)
        .await
        .unwrap();

    let redelivered = queue.claim("worker-b").await.unwrap().unwrap();
    assert_eq!(redelivered.id, id);
    assert_eq!(redelivered.attempts, 2);

    queue.ack(&id).await.unwrap();
    assert!(queue.claim("worker-c").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore] // Requires database
async fn test_queue_cancel_only_withdraws_pending_entries(pool: PgPool) {
    let queue = PgJobQueue::new(pool, &Config::default().queue);
    let job = ImportJob::new("tags.csv", "tags", PathBuf::from("/chunks/tags.csv"));

    let pending = queue.enqueue(&job).await.unwrap();
    assert!(queue.cancel(&pending).await.unwrap());
    assert!(queue.claim("worker-a").await.unwrap().is_none());

    let running = queue.enqueue(&job).await.unwrap();
    queue.claim("worker-a").await.unwrap().unwrap();
    assert!(!queue.cancel(&running).await.unwrap());

    assert!(!queue.cancel("does-not-exist").await.unwrap());
}
