use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::review::{RawReview, ScoredReview};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS runs (
            id               INTEGER PRIMARY KEY,
            url              TEXT NOT NULL,
            item_name        TEXT NOT NULL,
            aggregate_rating TEXT NOT NULL,
            pages_visited    INTEGER NOT NULL,
            stop_reason      TEXT NOT NULL,
            total_reviews    INTEGER NOT NULL,
            scored_reviews   INTEGER NOT NULL,
            accuracy         REAL NOT NULL,
            scheme           TEXT NOT NULL,
            started_at       TEXT NOT NULL,
            finished_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_runs_url ON runs(url);

        CREATE TABLE IF NOT EXISTS reviews (
            id              INTEGER PRIMARY KEY,
            run_id          INTEGER NOT NULL REFERENCES runs(id),
            position        INTEGER NOT NULL,
            declared_rating TEXT NOT NULL,
            title           TEXT NOT NULL,
            body            TEXT NOT NULL,
            compound        REAL,
            predicted_stars INTEGER CHECK(predicted_stars BETWEEN 1 AND 5),
            UNIQUE(run_id, position)
        );
        CREATE INDEX IF NOT EXISTS idx_reviews_run ON reviews(run_id);
        ",
    )?;
    Ok(())
}

pub struct RunRecord {
    pub url: String,
    pub item_name: String,
    pub aggregate_rating: String,
    pub pages_visited: u32,
    pub stop_reason: String,
    pub total_reviews: usize,
    pub scored_reviews: usize,
    pub accuracy: f64,
    pub scheme: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Store one run and its reviews. Dropped reviews are kept with no prediction.
pub fn save_run(
    conn: &Connection,
    run: &RunRecord,
    reviews: &[RawReview],
    scored: &[ScoredReview],
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO runs (url, item_name, aggregate_rating, pages_visited, stop_reason,
                           total_reviews, scored_reviews, accuracy, scheme, started_at, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            run.url,
            run.item_name,
            run.aggregate_rating,
            run.pages_visited,
            run.stop_reason,
            run.total_reviews as i64,
            run.scored_reviews as i64,
            run.accuracy,
            run.scheme,
            run.started_at.to_rfc3339(),
            run.finished_at.to_rfc3339(),
        ],
    )?;
    let run_id = tx.last_insert_rowid();

    let by_position: HashMap<usize, &ScoredReview> =
        scored.iter().map(|s| (s.position, s)).collect();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO reviews (run_id, position, declared_rating, title, body, compound, predicted_stars)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (position, r) in reviews.iter().enumerate() {
            let s = by_position.get(&position);
            stmt.execute(rusqlite::params![
                run_id,
                position as i64,
                r.declared_rating.text(),
                r.title.text(),
                r.body.text(),
                s.map(|s| s.sentiment),
                s.map(|s| s.predicted.get()),
            ])?;
        }
    }
    tx.commit()?;
    Ok(run_id)
}

pub struct RunRow {
    pub id: i64,
    pub url: String,
    pub item_name: String,
    pub aggregate_rating: String,
    pub pages_visited: u32,
    pub stop_reason: String,
    pub total_reviews: i64,
    pub scored_reviews: i64,
    pub accuracy: f64,
    pub scheme: String,
    pub started_at: String,
}

pub fn fetch_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, url, item_name, aggregate_rating, pages_visited, stop_reason,
                total_reviews, scored_reviews, accuracy, scheme, started_at
         FROM runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(RunRow {
                id: row.get(0)?,
                url: row.get(1)?,
                item_name: row.get(2)?,
                aggregate_rating: row.get(3)?,
                pages_visited: row.get(4)?,
                stop_reason: row.get(5)?,
                total_reviews: row.get(6)?,
                scored_reviews: row.get(7)?,
                accuracy: row.get(8)?,
                scheme: row.get(9)?,
                started_at: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{Field, Stars};

    fn run(url: &str) -> RunRecord {
        RunRecord {
            url: url.into(),
            item_name: "Kettle".into(),
            aggregate_rating: "4.3".into(),
            pages_visited: 2,
            stop_reason: "empty page 2".into(),
            total_reviews: 2,
            scored_reviews: 1,
            accuracy: 100.0,
            scheme: "legacy".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    fn raw(rating: Field, body: &str) -> RawReview {
        RawReview {
            declared_rating: rating,
            title: Field::Unavailable,
            body: Field::Value(body.into()),
        }
    }

    #[test]
    fn saves_runs_and_reviews() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let reviews = vec![raw(Field::Unavailable, "meh"), raw(Field::Value("5".into()), "great")];
        let scored = vec![ScoredReview {
            position: 1,
            review: reviews[1].clone(),
            sentiment: 0.6249,
            declared: Stars::new(5).unwrap(),
            predicted: Stars::new(5).unwrap(),
        }];
        let id = save_run(&conn, &run("https://a.example/r"), &reviews, &scored).unwrap();

        let stored: Vec<(i64, String, Option<f64>, Option<u8>)> = conn
            .prepare("SELECT position, declared_rating, compound, predicted_stars FROM reviews WHERE run_id = ?1 ORDER BY position")
            .unwrap()
            .query_map([id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            stored,
            vec![(0, "NA".to_string(), None, None), (1, "5".to_string(), Some(0.6249), Some(5))]
        );
    }

    #[test]
    fn history_is_newest_first() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        save_run(&conn, &run("https://a.example/1"), &[], &[]).unwrap();
        save_run(&conn, &run("https://a.example/2"), &[], &[]).unwrap();
        save_run(&conn, &run("https://a.example/3"), &[], &[]).unwrap();

        let rows = fetch_runs(&conn, 2).unwrap();
        let urls: Vec<&str> = rows.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/3", "https://a.example/2"]);
        assert_eq!(rows[0].pages_visited, 2);
    }
}
