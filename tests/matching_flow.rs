//! End-to-end tests for the match store and retrieval queries.
//!
//! These run against a real PostgreSQL instance with the pgvector extension
//! and are ignored by default. Point config.toml at a throwaway database and
//! run with: cargo test --test matching_flow -- --ignored

use std::sync::Arc;

use pgvector::Vector;
use sqlx::PgPool;
use talentmatch::database::Database;
use talentmatch::database::MatchUpsert;
use talentmatch::models::MatchStatus;
use talentmatch::AppConfig;
use talentmatch::Result;
use uuid::Uuid;

const TEST_DIMENSION: usize = 3;

async fn setup_test_db() -> Result<Arc<Database>> {
    let config = AppConfig::load()?;
    let pool = PgPool::connect(config.database_url()).await?;
    let db = Database::new(pool);

    // Fresh 3-dimensional schema so similarity values are hand-checkable
    sqlx::query("DROP TABLE IF EXISTS matches, candidates, jobs CASCADE")
        .execute(db.pool())
        .await?;
    db.init_schema(TEST_DIMENSION, true).await?;

    Ok(Arc::new(db))
}

/// Unit vector whose cosine similarity to [1, 0, 0] equals `similarity`
fn vector_with_similarity(similarity: f32) -> Vector {
    Vector::from(vec![
        similarity,
        (1.0 - similarity * similarity).sqrt(),
        0.0,
    ])
}

async fn insert_candidate(
    db: &Database,
    name: &str,
    coords: Option<(f64, f64)>,
    embedding: Vector,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r"
        INSERT INTO candidates
            (id, full_name, category, latitude, longitude, embedding,
             embedding_generated_at)
        VALUES ($1, $2, 'finance', $3, $4, $5, now())
        ",
    )
    .bind(id)
    .bind(name)
    .bind(coords.map(|c| c.0))
    .bind(coords.map(|c| c.1))
    .bind(embedding)
    .execute(db.pool())
    .await?;
    Ok(id)
}

async fn insert_job(db: &Database, title: &str, coords: Option<(f64, f64)>) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r"
        INSERT INTO jobs (id, title, category, latitude, longitude, embedding,
                          embedding_generated_at)
        VALUES ($1, $2, 'finance', $3, $4, $5, now())
        ",
    )
    .bind(id)
    .bind(title)
    .bind(coords.map(|c| c.0))
    .bind(coords.map(|c| c.1))
    .bind(Vector::from(vec![1.0, 0.0, 0.0]))
    .execute(db.pool())
    .await?;
    Ok(id)
}

fn sample_upsert(candidate_id: Uuid, job_id: Uuid, score: f64) -> MatchUpsert {
    MatchUpsert {
        candidate_id,
        job_id,
        similarity: 0.87,
        distance_km: Some(12.0),
        ai_score: score,
        explanation: "Solid fit".to_string(),
        strengths: vec!["SAP".to_string()],
        weaknesses: vec![],
        risks: vec![],
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_upsert_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;
    let candidate_id =
        insert_candidate(&db, "Ada", None, vector_with_similarity(0.9)).await?;
    let job_id = insert_job(&db, "Accountant", None).await?;

    let (first, inserted) = db
        .upsert_match(&sample_upsert(candidate_id, job_id, 0.8))
        .await?;
    assert!(inserted);
    assert_eq!(first.status, MatchStatus::AiChecked);

    let (second, inserted) = db
        .upsert_match(&sample_upsert(candidate_id, job_id, 0.8))
        .await?;
    assert!(!inserted);
    assert_eq!(second.id, first.id);
    assert!((second.ai_score - 0.8).abs() < f64::EPSILON);

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM matches WHERE candidate_id = $1 AND job_id = $2")
            .bind(candidate_id)
            .bind(job_id)
            .fetch_one(db.pool())
            .await?;
    assert_eq!(count.0, 1);

    // Read paths used by the pipeline and alerting consumers
    let for_job = db.list_matches_for_job(job_id, 10).await?;
    assert_eq!(for_job.len(), 1);
    assert_eq!(for_job[0].candidate_id, candidate_id);

    let top = db.list_top_matches(0.75, 10).await?;
    assert_eq!(top.len(), 1);
    assert!(db.list_top_matches(0.95, 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_feedback_survives_re_evaluation() -> Result<()> {
    let db = setup_test_db().await?;
    let candidate_id =
        insert_candidate(&db, "Grace", None, vector_with_similarity(0.9)).await?;
    let job_id = insert_job(&db, "Controller", None).await?;

    db.upsert_match(&sample_upsert(candidate_id, job_id, 0.7))
        .await?;
    db.record_feedback(candidate_id, job_id, "good", Some("call went well"), None, None)
        .await?;

    // Re-running the funnel refreshes the score but not the feedback
    let (updated, _) = db
        .upsert_match(&sample_upsert(candidate_id, job_id, 0.95))
        .await?;
    assert!((updated.ai_score - 0.95).abs() < f64::EPSILON);
    assert_eq!(updated.feedback.as_deref(), Some("good"));
    assert_eq!(updated.feedback_note.as_deref(), Some("call went well"));
    assert!(updated.feedback_at.is_some());

    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_status_never_regresses() -> Result<()> {
    let db = setup_test_db().await?;
    let candidate_id =
        insert_candidate(&db, "Alan", None, vector_with_similarity(0.9)).await?;
    let job_id = insert_job(&db, "Analyst", None).await?;

    db.upsert_match(&sample_upsert(candidate_id, job_id, 0.7))
        .await?;
    db.record_feedback(
        candidate_id,
        job_id,
        "placed",
        None,
        None,
        Some(MatchStatus::Placed),
    )
    .await?;

    let (after, _) = db
        .upsert_match(&sample_upsert(candidate_id, job_id, 0.6))
        .await?;
    assert_eq!(after.status, MatchStatus::Placed);
    assert!((after.ai_score - 0.6).abs() < f64::EPSILON);

    // A backwards status request is ignored too
    let m = db
        .record_feedback(candidate_id, job_id, "n/a", None, None, Some(MatchStatus::New))
        .await?;
    assert_eq!(m.status, MatchStatus::Placed);

    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_geo_filter_and_ranking() -> Result<()> {
    let db = setup_test_db().await?;

    // Job in central Berlin; 0.108 degrees of latitude is roughly 12 km
    let berlin = (52.52, 13.405);
    let job_id = insert_job(&db, "Tax Advisor", Some(berlin)).await?;
    let job = db.get_job(job_id).await?.unwrap();

    let a = insert_candidate(
        &db,
        "A near",
        Some((52.628, 13.405)),
        vector_with_similarity(0.91),
    )
    .await?;
    let b = insert_candidate(&db, "B no coords", None, vector_with_similarity(0.85)).await?;
    let _c = insert_candidate(
        &db,
        "C far",
        Some((52.925, 13.405)),
        vector_with_similarity(0.40),
    )
    .await?;

    let rows = db
        .find_similar_candidates(
            job.embedding.as_ref().unwrap(),
            "finance",
            job.latitude,
            job.longitude,
            30.0,
            10,
        )
        .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.candidate_id).collect();
    assert_eq!(ids, vec![a, b]);

    assert!(rows[0].distance_km.is_some());
    assert!(rows[0].distance_km.unwrap() < 15.0);
    assert!(rows[1].distance_km.is_none());
    assert!(rows[0].similarity > rows[1].similarity);

    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_staleness_detection_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;
    let candidate_id =
        insert_candidate(&db, "Edsger", None, vector_with_similarity(0.9)).await?;
    let job_id = insert_job(&db, "Auditor", None).await?;

    db.upsert_match(&sample_upsert(candidate_id, job_id, 0.8))
        .await?;
    assert_eq!(db.detect_stale_matches().await?, 0);

    // Candidate edited after the match was scored
    sqlx::query("UPDATE candidates SET updated_at = now() + interval '1 second' WHERE id = $1")
        .bind(candidate_id)
        .execute(db.pool())
        .await?;

    assert_eq!(db.detect_stale_matches().await?, 1);
    let m = db.get_match(candidate_id, job_id).await?.unwrap();
    assert!(m.stale);
    assert_eq!(m.stale_reason.as_deref(), Some("candidate_updated"));
    assert!(m.stale_since.is_some());

    // Second pass finds nothing new
    assert_eq!(db.detect_stale_matches().await?, 0);

    // Re-scoring clears the flag
    let (fresh, _) = db
        .upsert_match(&sample_upsert(candidate_id, job_id, 0.85))
        .await?;
    assert!(!fresh.stale);
    assert!(fresh.stale_reason.is_none());

    Ok(())
}

#[tokio::test]
#[ignore = "requires PostgreSQL with pgvector"]
async fn test_stats_surfaces_count_coverage() -> Result<()> {
    let db = setup_test_db().await?;
    insert_candidate(&db, "With vector", None, vector_with_similarity(0.5)).await?;
    sqlx::query("INSERT INTO candidates (full_name, category) VALUES ('No vector', 'finance')")
        .execute(db.pool())
        .await?;
    insert_job(&db, "Clerk", None).await?;

    let stats = db.get_embedding_stats().await?;
    assert_eq!(stats.candidates_total, 2);
    assert_eq!(stats.candidates_embedded, 1);
    assert_eq!(stats.jobs_embedded, 1);
    assert!((stats.candidate_coverage() - 50.0).abs() < 1e-9);

    Ok(())
}
