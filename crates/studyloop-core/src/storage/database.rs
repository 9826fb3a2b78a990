//! SQLite-backed persistence for the engine's entities.
//!
//! Provides persistent storage for:
//! - Courses and their session calendars
//! - Memory concepts and their review state
//! - Per-course cursors and per-learner progress
//!
//! Every read-modify-write runs inside an IMMEDIATE transaction, so a second
//! writer for the same row waits on the lock instead of interleaving.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::badges::StatsSnapshot;
use crate::course::{CardCompletion, CourseProgress, CourseSession, CourseSessionDraft};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::ledger::{ProgressDelta, UserProgress};
use crate::review::{schedule, MemoryConcept, Quality, ReviewState};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CONCEPT_COLUMNS: &str = "id, user_id, course_id, title, content, repetition, easiness_factor,
     interval, next_review, last_reviewed, retired";

const SESSION_COLUMNS: &str = "id, course_id, session_number, scheduled_date, cards_start_index,
     cards_end_index, is_completed, completed_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub card_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Result of recording a learner's activity for a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub progress: UserProgress,
    /// Streak went up by one.
    pub extended: bool,
    /// A missed day broke the previous streak before extending.
    pub reset: bool,
}

/// SQLite database for engine state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/studyloop/studyloop.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studyloop.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn write_tx(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // ── courses ────────────────────────────────────────────────────────

    pub fn create_course(&self, user_id: &str, title: &str, card_count: i64) -> Result<Course> {
        if card_count <= 0 || card_count > u32::MAX as i64 {
            return Err(ValidationError::InvalidValue {
                field: "card_count".into(),
                message: format!("must be a positive card count (got {card_count})"),
            }
            .into());
        }
        let course = Course {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            card_count: card_count as u32,
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO courses (id, user_id, title, card_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                course.id,
                course.user_id,
                course.title,
                course.card_count,
                course.created_at.to_rfc3339(),
            ],
        )?;
        tracing::info!(course_id = %course.id, user_id, card_count, "created course");
        Ok(course)
    }

    pub fn get_course(&self, id: &str) -> Result<Course> {
        fetch_course(&self.conn, id)?.ok_or_else(|| CoreError::not_found("course", id))
    }

    pub fn list_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, card_count, created_at
             FROM courses WHERE user_id = ?1 ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map(params![user_id], course_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ── concepts ───────────────────────────────────────────────────────

    pub fn create_concept(&self, concept: &MemoryConcept) -> Result<()> {
        if let Some(course_id) = &concept.course_id {
            self.get_course(course_id)?;
        }
        self.conn.execute(
            &format!("INSERT INTO memory_concepts ({CONCEPT_COLUMNS})
                      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                concept.id,
                concept.user_id,
                concept.course_id,
                concept.title,
                concept.content,
                concept.state.repetition,
                concept.state.easiness_factor,
                concept.state.interval,
                concept.state.next_review.to_string(),
                concept.state.last_reviewed.map(|d| d.to_string()),
                concept.retired,
            ],
        )?;
        tracing::info!(concept_id = %concept.id, user_id = %concept.user_id, "created concept");
        Ok(())
    }

    pub fn get_concept(&self, id: &str) -> Result<MemoryConcept> {
        fetch_concept(&self.conn, id)?.ok_or_else(|| CoreError::not_found("concept", id))
    }

    pub fn list_concepts(&self, user_id: &str) -> Result<Vec<MemoryConcept>> {
        self.query_concepts(
            &format!(
                "SELECT {CONCEPT_COLUMNS} FROM memory_concepts
                 WHERE user_id = ?1 ORDER BY next_review, title"
            ),
            params![user_id],
        )
    }

    /// Active concepts whose next review is on or before `today`.
    pub fn due_concepts(&self, user_id: &str, today: NaiveDate) -> Result<Vec<MemoryConcept>> {
        self.query_concepts(
            &format!(
                "SELECT {CONCEPT_COLUMNS} FROM memory_concepts
                 WHERE user_id = ?1 AND retired = 0 AND next_review <= ?2
                 ORDER BY next_review, title"
            ),
            params![user_id, today.to_string()],
        )
    }

    fn query_concepts(
        &self,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<MemoryConcept>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, concept_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Soft-retire a concept; it stays in history but never comes due.
    pub fn retire_concept(&self, id: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE memory_concepts SET retired = 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("concept", id));
        }
        tracing::info!(concept_id = id, "retired concept");
        Ok(())
    }

    /// Apply one review to a stored concept.
    ///
    /// The quality is validated before any lock is taken; on error the
    /// stored concept is unchanged.
    pub fn review_concept(
        &self,
        id: &str,
        raw_quality: i64,
        today: NaiveDate,
    ) -> Result<MemoryConcept> {
        let quality = Quality::new(raw_quality)?;

        let tx = self.write_tx()?;
        let mut concept =
            fetch_concept(&tx, id)?.ok_or_else(|| CoreError::not_found("concept", id))?;
        if concept.retired {
            return Err(ValidationError::InvalidValue {
                field: "concept".into(),
                message: format!("concept {id} is retired"),
            }
            .into());
        }

        concept.state = schedule(&concept.state, quality, today);
        write_review_state(&tx, id, &concept.state)?;
        tx.commit()?;

        tracing::info!(
            concept_id = id,
            quality = quality.value(),
            interval = concept.state.interval,
            next_review = %concept.state.next_review,
            "reviewed concept"
        );
        Ok(concept)
    }

    // ── sessions ───────────────────────────────────────────────────────

    /// Replace a course's whole session calendar in one transaction.
    ///
    /// # Errors
    /// Rejects drafts that do not partition the course's cards exactly.
    pub fn replace_sessions(
        &self,
        course_id: &str,
        drafts: &[CourseSessionDraft],
    ) -> Result<Vec<CourseSession>> {
        let tx = self.write_tx()?;
        let course =
            fetch_course(&tx, course_id)?.ok_or_else(|| CoreError::not_found("course", course_id))?;
        check_partition(drafts, course.card_count)?;

        tx.execute(
            "DELETE FROM course_sessions WHERE course_id = ?1",
            params![course_id],
        )?;
        let sessions: Vec<CourseSession> = drafts
            .iter()
            .cloned()
            .map(|d| d.into_session(course_id))
            .collect();
        for s in &sessions {
            tx.execute(
                &format!("INSERT INTO course_sessions ({SESSION_COLUMNS})
                          VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    s.id,
                    s.course_id,
                    s.draft.session_number,
                    s.draft.scheduled_date.to_string(),
                    s.draft.cards_start_index,
                    s.draft.cards_end_index,
                    s.is_completed,
                    s.completed_at.map(|t| t.to_rfc3339()),
                ],
            )?;
        }
        tx.commit()?;

        tracing::info!(course_id, sessions = sessions.len(), "stored session plan");
        Ok(sessions)
    }

    pub fn list_sessions(&self, course_id: &str) -> Result<Vec<CourseSession>> {
        Ok(fetch_sessions(&self.conn, course_id)?)
    }

    /// Mark a session complete. Already-completed sessions keep their
    /// original timestamp.
    pub fn complete_session(
        &self,
        course_id: &str,
        session_number: u32,
        at: DateTime<Utc>,
    ) -> Result<CourseSession> {
        let tx = self.write_tx()?;
        let session = fetch_sessions(&tx, course_id)?
            .into_iter()
            .find(|s| s.draft.session_number == session_number)
            .ok_or_else(|| {
                CoreError::not_found("session", format!("{course_id}#{session_number}"))
            })?;
        let done = session.complete(at);
        mark_session_complete(&tx, &done)?;
        tx.commit()?;
        Ok(done)
    }

    // ── course progress ────────────────────────────────────────────────

    pub fn course_progress(&self, user_id: &str, course_id: &str) -> Result<Option<CourseProgress>> {
        Ok(fetch_course_progress(&self.conn, user_id, course_id)?)
    }

    /// Enrol a learner in a course. Returns the existing cursor if already
    /// enrolled.
    pub fn start_course(&self, user_id: &str, course_id: &str) -> Result<CourseProgress> {
        let tx = self.write_tx()?;
        fetch_course(&tx, course_id)?.ok_or_else(|| CoreError::not_found("course", course_id))?;
        let progress = match fetch_course_progress(&tx, user_id, course_id)? {
            Some(existing) => existing,
            None => {
                let fresh = CourseProgress::new(user_id, course_id);
                write_course_progress(&tx, &fresh)?;
                tracing::info!(user_id, course_id, "started course");
                fresh
            }
        };
        tx.commit()?;
        Ok(progress)
    }

    /// Record a finished card and complete its session if that was the
    /// session's last open card.
    pub fn complete_card(
        &self,
        user_id: &str,
        course_id: &str,
        index: u32,
        xp_per_card: u64,
        at: DateTime<Utc>,
    ) -> Result<CardCompletion> {
        let tx = self.write_tx()?;
        let course =
            fetch_course(&tx, course_id)?.ok_or_else(|| CoreError::not_found("course", course_id))?;
        let sessions = fetch_sessions(&tx, course_id)?;
        let drafts: Vec<CourseSessionDraft> = sessions.iter().map(|s| s.draft.clone()).collect();

        let progress = fetch_course_progress(&tx, user_id, course_id)?
            .unwrap_or_else(|| CourseProgress::new(user_id, course_id));
        let completion = progress.complete_card(index, course.card_count, xp_per_card, &drafts)?;

        write_course_progress(&tx, &completion.progress)?;
        if let Some(number) = completion.session_finished {
            if let Some(session) = sessions.iter().find(|s| s.draft.session_number == number) {
                mark_session_complete(&tx, &session.complete(at))?;
            }
        }
        tx.commit()?;

        tracing::debug!(
            user_id,
            course_id,
            index,
            session_finished = ?completion.session_finished,
            course_finished = completion.course_finished,
            "completed card"
        );
        Ok(completion)
    }

    // ── user progress ──────────────────────────────────────────────────

    pub fn load_progress(&self, user_id: &str) -> Result<UserProgress> {
        Ok(fetch_user_progress(&self.conn, user_id)?
            .map(|row| row.progress)
            .unwrap_or_default())
    }

    /// Apply one ledger delta atomically: read, apply, write back.
    pub fn update_progress(&self, user_id: &str, delta: &ProgressDelta) -> Result<UserProgress> {
        let tx = self.write_tx()?;
        let current = fetch_user_progress(&tx, user_id)?
            .map(|row| row.progress)
            .unwrap_or_default();
        let next = current.apply(delta)?;
        write_user_progress(&tx, user_id, &next)?;
        tx.commit()?;

        tracing::debug!(user_id, ?delta, xp = next.xp, streak = next.streak, "updated progress");
        Ok(next)
    }

    /// Record that the learner was active on `today`.
    ///
    /// Extends the streak at most once per calendar day, restarts it at 1
    /// after a missed day, and zeroes today's minutes on a new day.
    pub fn record_daily_activity(&self, user_id: &str, today: NaiveDate) -> Result<StreakUpdate> {
        let tx = self.write_tx()?;
        let row = fetch_user_progress(&tx, user_id)?.unwrap_or_default();

        let mut progress = row.progress;
        if row.last_active_date != Some(today) {
            progress = progress.roll_over_day();
        }

        let yesterday = today.checked_sub_days(Days::new(1));
        let (extended, reset) = match row.last_streak_date {
            Some(last) if last >= today => (false, false),
            Some(last) if Some(last) == yesterday => {
                progress = progress.increment_streak();
                (true, false)
            }
            previous => {
                let reset = previous.is_some() && progress.streak > 0;
                progress = progress.break_streak().increment_streak();
                (true, reset)
            }
        };

        write_user_progress(&tx, user_id, &progress)?;
        let streak_date = if extended { Some(today) } else { row.last_streak_date };
        tx.execute(
            "UPDATE user_progress SET last_active_date = ?2, last_streak_date = ?3
             WHERE user_id = ?1",
            params![user_id, today.to_string(), streak_date.map(|d| d.to_string())],
        )?;
        tx.commit()?;

        if reset {
            tracing::info!(user_id, %today, "streak restarted after missed day");
        }
        Ok(StreakUpdate {
            progress,
            extended,
            reset,
        })
    }

    // ── stats ──────────────────────────────────────────────────────────

    /// Assemble the badge stats for a learner from one consistent read.
    pub fn stats_snapshot(&self, user_id: &str) -> Result<StatsSnapshot> {
        let tx = self.conn.unchecked_transaction()?;
        let progress = fetch_user_progress(&tx, user_id)?
            .map(|row| row.progress)
            .unwrap_or_default();
        let count = |sql: &str| -> rusqlite::Result<u32> {
            tx.query_row(sql, params![user_id], |row| row.get::<_, u32>(0))
        };
        let snapshot = StatsSnapshot {
            xp: progress.xp,
            streak: progress.streak,
            courses_completed: count(
                "SELECT COUNT(*) FROM course_progress WHERE user_id = ?1 AND is_completed = 1",
            )?,
            concepts_learned: count(
                "SELECT COUNT(*) FROM memory_concepts
                 WHERE user_id = ?1 AND retired = 0 AND repetition > 0",
            )?,
            courses_created: count("SELECT COUNT(*) FROM courses WHERE user_id = ?1")?,
        };
        tx.commit()?;
        Ok(snapshot)
    }
}

// ── row helpers ────────────────────────────────────────────────────────

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    raw.parse::<NaiveDate>().map_err(|e| conversion_error(idx, e))
}

fn opt_date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| raw.parse::<NaiveDate>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| conversion_error(idx, e))
        })
        .transpose()
}

fn json_at<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        card_count: row.get(3)?,
        created_at: timestamp_at(row, 4)?.unwrap_or_default(),
    })
}

fn concept_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryConcept> {
    Ok(MemoryConcept {
        id: row.get(0)?,
        user_id: row.get(1)?,
        course_id: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        state: ReviewState {
            repetition: row.get(5)?,
            easiness_factor: row.get(6)?,
            interval: row.get(7)?,
            next_review: date_at(row, 8)?,
            last_reviewed: opt_date_at(row, 9)?,
        },
        retired: row.get(10)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<CourseSession> {
    Ok(CourseSession {
        id: row.get(0)?,
        course_id: row.get(1)?,
        draft: CourseSessionDraft {
            session_number: row.get(2)?,
            scheduled_date: date_at(row, 3)?,
            cards_start_index: row.get(4)?,
            cards_end_index: row.get(5)?,
        },
        is_completed: row.get(6)?,
        completed_at: timestamp_at(row, 7)?,
    })
}

fn fetch_course(conn: &Connection, id: &str) -> rusqlite::Result<Option<Course>> {
    conn.query_row(
        "SELECT id, user_id, title, card_count, created_at FROM courses WHERE id = ?1",
        params![id],
        course_from_row,
    )
    .optional()
}

fn fetch_concept(conn: &Connection, id: &str) -> rusqlite::Result<Option<MemoryConcept>> {
    conn.query_row(
        &format!("SELECT {CONCEPT_COLUMNS} FROM memory_concepts WHERE id = ?1"),
        params![id],
        concept_from_row,
    )
    .optional()
}

fn write_review_state(conn: &Connection, id: &str, state: &ReviewState) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE memory_concepts
         SET repetition = ?2, easiness_factor = ?3, interval = ?4,
             next_review = ?5, last_reviewed = ?6
         WHERE id = ?1",
        params![
            id,
            state.repetition,
            state.easiness_factor,
            state.interval,
            state.next_review.to_string(),
            state.last_reviewed.map(|d| d.to_string()),
        ],
    )?;
    Ok(())
}

fn fetch_sessions(conn: &Connection, course_id: &str) -> rusqlite::Result<Vec<CourseSession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM course_sessions
         WHERE course_id = ?1 ORDER BY session_number"
    ))?;
    let rows = stmt.query_map(params![course_id], session_from_row)?;
    rows.collect()
}

fn mark_session_complete(conn: &Connection, session: &CourseSession) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE course_sessions SET is_completed = 1, completed_at = ?2
         WHERE id = ?1 AND is_completed = 0",
        params![session.id, session.completed_at.map(|t| t.to_rfc3339())],
    )?;
    Ok(())
}

fn check_partition(drafts: &[CourseSessionDraft], card_count: u32) -> Result<(), ValidationError> {
    let mut cursor = 0;
    for (i, d) in drafts.iter().enumerate() {
        if d.session_number as usize != i + 1
            || d.cards_start_index != cursor
            || d.cards_start_index >= d.cards_end_index
        {
            return Err(ValidationError::InvalidValue {
                field: "sessions".into(),
                message: format!("session {} breaks the card partition", d.session_number),
            });
        }
        cursor = d.cards_end_index;
    }
    if cursor != card_count {
        return Err(ValidationError::InvalidValue {
            field: "sessions".into(),
            message: format!("sessions cover {cursor} of {card_count} cards"),
        });
    }
    Ok(())
}

fn fetch_course_progress(
    conn: &Connection,
    user_id: &str,
    course_id: &str,
) -> rusqlite::Result<Option<CourseProgress>> {
    conn.query_row(
        "SELECT id, user_id, course_id, current_card_index, completed_cards, earned_xp, is_completed
         FROM course_progress WHERE user_id = ?1 AND course_id = ?2",
        params![user_id, course_id],
        |row| {
            Ok(CourseProgress {
                id: row.get(0)?,
                user_id: row.get(1)?,
                course_id: row.get(2)?,
                current_card_index: row.get(3)?,
                completed_cards: json_at::<BTreeSet<u32>>(row, 4)?,
                earned_xp: row.get(5)?,
                is_completed: row.get(6)?,
            })
        },
    )
    .optional()
}

fn write_course_progress(conn: &Connection, p: &CourseProgress) -> Result<()> {
    conn.execute(
        "INSERT INTO course_progress
             (id, user_id, course_id, current_card_index, completed_cards, earned_xp, is_completed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id, course_id) DO UPDATE SET
             current_card_index = excluded.current_card_index,
             completed_cards = excluded.completed_cards,
             earned_xp = excluded.earned_xp,
             is_completed = excluded.is_completed",
        params![
            p.id,
            p.user_id,
            p.course_id,
            p.current_card_index,
            serde_json::to_string(&p.completed_cards)?,
            p.earned_xp,
            p.is_completed,
        ],
    )?;
    Ok(())
}

#[derive(Default)]
struct ProgressRow {
    progress: UserProgress,
    last_active_date: Option<NaiveDate>,
    last_streak_date: Option<NaiveDate>,
}

fn fetch_user_progress(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<ProgressRow>> {
    conn.query_row(
        "SELECT xp, streak, today_minutes, completed_lessons, last_active_date, last_streak_date
         FROM user_progress WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(ProgressRow {
                progress: UserProgress {
                    xp: row.get(0)?,
                    streak: row.get(1)?,
                    today_minutes: row.get(2)?,
                    completed_lessons: json_at::<BTreeSet<String>>(row, 3)?,
                },
                last_active_date: opt_date_at(row, 4)?,
                last_streak_date: opt_date_at(row, 5)?,
            })
        },
    )
    .optional()
}

fn write_user_progress(conn: &Connection, user_id: &str, p: &UserProgress) -> Result<()> {
    conn.execute(
        "INSERT INTO user_progress (user_id, xp, streak, today_minutes, completed_lessons)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
             xp = excluded.xp,
             streak = excluded.streak,
             today_minutes = excluded.today_minutes,
             completed_lessons = excluded.completed_lessons",
        params![
            user_id,
            p.xp,
            p.streak,
            p.today_minutes,
            serde_json::to_string(&p.completed_lessons)?,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::plan;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn concept_roundtrip_and_review() {
        let db = Database::open_memory().unwrap();
        let concept = MemoryConcept::new("u1", "Pattern matching", day(1)).with_content("match");
        db.create_concept(&concept).unwrap();
        assert_eq!(db.get_concept(&concept.id).unwrap(), concept);

        let reviewed = db.review_concept(&concept.id, 4, day(1)).unwrap();
        assert_eq!(reviewed.state.repetition, 1);
        assert_eq!(db.get_concept(&concept.id).unwrap(), reviewed);
    }

    #[test]
    fn invalid_quality_leaves_row_untouched() {
        let db = Database::open_memory().unwrap();
        let concept = MemoryConcept::new("u1", "Closures", day(1));
        db.create_concept(&concept).unwrap();
        let err = db.review_concept(&concept.id, 6, day(1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::QualityOutOfRange(6))));
        assert_eq!(db.get_concept(&concept.id).unwrap(), concept);
    }

    #[test]
    fn missing_concept_is_not_found() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.review_concept("nope", 3, day(1)),
            Err(CoreError::NotFound { entity: "concept", .. })
        ));
        assert!(matches!(db.retire_concept("nope"), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn due_concepts_skip_retired_and_future() {
        let db = Database::open_memory().unwrap();
        let due = MemoryConcept::new("u1", "Due", day(1));
        let retired = MemoryConcept::new("u1", "Retired", day(1));
        let later = MemoryConcept::new("u1", "Later", day(9));
        for c in [&due, &retired, &later] {
            db.create_concept(c).unwrap();
        }
        db.retire_concept(&retired.id).unwrap();

        let ids: Vec<_> = db.due_concepts("u1", day(2)).unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![due.id.clone()]);
        assert_eq!(db.list_concepts("u1").unwrap().len(), 3);
        assert!(db.review_concept(&retired.id, 5, day(2)).is_err());
    }

    #[test]
    fn concept_in_unknown_course_rejected() {
        let db = Database::open_memory().unwrap();
        let c = MemoryConcept::new("u1", "Orphan", day(1)).in_course("missing");
        assert!(matches!(db.create_concept(&c), Err(CoreError::NotFound { entity: "course", .. })));
    }

    #[test]
    fn sessions_replace_atomically() {
        let db = Database::open_memory().unwrap();
        let course = db.create_course("u1", "Rust", 10).unwrap();
        db.replace_sessions(&course.id, &plan(10, 5, 2, day(1)).unwrap()).unwrap();
        assert_eq!(db.list_sessions(&course.id).unwrap().len(), 5);

        let replanned = db.replace_sessions(&course.id, &plan(10, 2, 5, day(3)).unwrap()).unwrap();
        let stored = db.list_sessions(&course.id).unwrap();
        assert_eq!(stored, replanned);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].draft.scheduled_date, day(3));
    }

    #[test]
    fn sessions_must_cover_course() {
        let db = Database::open_memory().unwrap();
        let course = db.create_course("u1", "Rust", 10).unwrap();
        let short = plan(8, 4, 2, day(1)).unwrap();
        assert!(matches!(
            db.replace_sessions(&course.id, &short),
            Err(CoreError::Validation(_))
        ));
        assert!(db.list_sessions(&course.id).unwrap().is_empty());
    }

    #[test]
    fn completing_cards_closes_sessions() {
        let db = Database::open_memory().unwrap();
        let course = db.create_course("u1", "Rust", 3).unwrap();
        db.replace_sessions(&course.id, &plan(3, 3, 2, day(1)).unwrap()).unwrap();

        db.complete_card("u1", &course.id, 0, 10, at()).unwrap();
        let r = db.complete_card("u1", &course.id, 1, 10, at()).unwrap();
        assert_eq!(r.session_finished, Some(1));
        let sessions = db.list_sessions(&course.id).unwrap();
        assert!(sessions[0].is_completed);
        assert_eq!(sessions[0].completed_at, Some(at()));
        assert!(!sessions[1].is_completed);

        let r = db.complete_card("u1", &course.id, 2, 10, at()).unwrap();
        assert!(r.course_finished);
        let stored = db.course_progress("u1", &course.id).unwrap().unwrap();
        assert!(stored.is_completed);
        assert_eq!(stored.earned_xp, 30);
        assert_eq!(stored.current_card_index, 3);
    }

    #[test]
    fn start_course_is_idempotent() {
        let db = Database::open_memory().unwrap();
        let course = db.create_course("u1", "Rust", 4).unwrap();
        let first = db.start_course("u1", &course.id).unwrap();
        let again = db.start_course("u1", &course.id).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.current_card_index, 0);
        assert!(matches!(db.start_course("u1", "missing"), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn complete_session_is_idempotent() {
        let db = Database::open_memory().unwrap();
        let course = db.create_course("u1", "Rust", 2).unwrap();
        db.replace_sessions(&course.id, &plan(2, 1, 2, day(1)).unwrap()).unwrap();
        let first = db.complete_session(&course.id, 1, at()).unwrap();
        let later = at() + chrono::Duration::hours(3);
        let again = db.complete_session(&course.id, 1, later).unwrap();
        assert_eq!(first.completed_at, again.completed_at);
        assert!(matches!(
            db.complete_session(&course.id, 9, at()),
            Err(CoreError::NotFound { entity: "session", .. })
        ));
    }

    #[test]
    fn progress_deltas_persist() {
        let db = Database::open_memory().unwrap();
        db.update_progress("u1", &ProgressDelta::AddXp(300)).unwrap();
        db.update_progress("u1", &ProgressDelta::AddXp(250)).unwrap();
        db.update_progress("u1", &ProgressDelta::CompleteLesson("L1".into())).unwrap();
        db.update_progress("u1", &ProgressDelta::CompleteLesson("L1".into())).unwrap();
        let p = db.load_progress("u1").unwrap();
        assert_eq!(p.xp, 550);
        assert_eq!(p.level(), 2);
        assert_eq!(p.completed_lessons.len(), 1);

        assert!(db.update_progress("u1", &ProgressDelta::AddMinutes(-3)).is_err());
        assert_eq!(db.load_progress("u1").unwrap(), p);
    }

    #[test]
    fn streak_extends_once_per_day() {
        let db = Database::open_memory().unwrap();
        let first = db.record_daily_activity("u1", day(1)).unwrap();
        assert!(first.extended);
        assert!(!first.reset);
        assert_eq!(first.progress.streak, 1);

        let same_day = db.record_daily_activity("u1", day(1)).unwrap();
        assert!(!same_day.extended);
        assert_eq!(same_day.progress.streak, 1);

        assert_eq!(db.record_daily_activity("u1", day(2)).unwrap().progress.streak, 2);

        let after_gap = db.record_daily_activity("u1", day(5)).unwrap();
        assert!(after_gap.reset);
        assert_eq!(after_gap.progress.streak, 1);
    }

    #[test]
    fn new_day_resets_minutes() {
        let db = Database::open_memory().unwrap();
        db.record_daily_activity("u1", day(1)).unwrap();
        db.update_progress("u1", &ProgressDelta::AddMinutes(30)).unwrap();
        assert_eq!(db.record_daily_activity("u1", day(1)).unwrap().progress.today_minutes, 30);
        assert_eq!(db.record_daily_activity("u1", day(2)).unwrap().progress.today_minutes, 0);
    }

    #[test]
    fn stats_snapshot_counts_entities() {
        let db = Database::open_memory().unwrap();
        let course = db.create_course("u1", "Rust", 1).unwrap();
        db.create_course("u2", "Go", 4).unwrap();
        db.replace_sessions(&course.id, &plan(1, 1, 1, day(1)).unwrap()).unwrap();
        db.complete_card("u1", &course.id, 0, 10, at()).unwrap();

        let learned = MemoryConcept::new("u1", "Learned", day(1));
        let fresh = MemoryConcept::new("u1", "Fresh", day(1));
        db.create_concept(&learned).unwrap();
        db.create_concept(&fresh).unwrap();
        db.review_concept(&learned.id, 5, day(1)).unwrap();
        db.update_progress("u1", &ProgressDelta::AddXp(42)).unwrap();

        let stats = db.stats_snapshot("u1").unwrap();
        assert_eq!(
            stats,
            StatsSnapshot {
                xp: 42,
                streak: 0,
                courses_completed: 1,
                concepts_learned: 1,
                courses_created: 1,
            }
        );
    }

    #[test]
    fn create_course_rejects_empty() {
        let db = Database::open_memory().unwrap();
        assert!(db.create_course("u1", "Empty", 0).is_err());
    }
}
