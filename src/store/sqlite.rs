use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::{LessonFilter, Store};
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Decodes the subject column. The current format is a JSON list; rows
/// written before the list migration hold a bare subject string, which
/// decodes as a single-element list. Callers never see the raw encoding.
fn decode_subjects(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(_) if raw.is_empty() => Vec::new(),
        Err(_) => vec![raw.to_string()],
    }
}

fn encode_subjects(subjects: &[String]) -> String {
    serde_json::to_string(subjects).unwrap_or_else(|e| {
        tracing::error!("Failed to encode subject list: {}", e);
        "[]".to_string()
    })
}

fn parse_status(s: &str) -> PaymentStatus {
    PaymentStatus::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid payment status in database: '{}'", s);
        PaymentStatus::Due
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, email, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id,
                user.email,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, created_at, updated_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, created_at, updated_at FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, email, created_at, updated_at
             FROM users WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
                updated_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE id = ?1",
            params![id],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    is_admin: row.get(3)?,
                    user_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    is_admin: row.get(3)?,
                    user_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], |row| {
            Ok(Token {
                id: row.get(0)?,
                token_hash: row.get(1)?,
                token_lookup: row.get(2)?,
                is_admin: row.get(3)?,
                user_id: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Token {
                id: row.get(0)?,
                token_hash: row.get(1)?,
                token_lookup: row.get(2)?,
                is_admin: row.get(3)?,
                user_id: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Profile operations

    fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, display_name, avatar_url, updated_at FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Profile {
                    user_id: row.get(0)?,
                    display_name: row.get(1)?,
                    avatar_url: row.get(2)?,
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn().execute(
            "INSERT INTO profiles (user_id, display_name, avatar_url, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at",
            params![
                profile.user_id,
                profile.display_name,
                profile.avatar_url,
                format_datetime(&profile.updated_at),
            ],
        )?;
        Ok(())
    }

    // Student operations

    fn create_student(&self, student: &Student) -> Result<()> {
        self.conn().execute(
            "INSERT INTO students (id, user_id, name, batch, subjects, target_classes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                student.id,
                student.user_id,
                student.name,
                student.batch,
                encode_subjects(&student.subjects),
                student.target_classes,
                format_datetime(&student.created_at),
                format_datetime(&student.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_student(&self, user_id: &str, id: &str) -> Result<Option<Student>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, name, batch, subjects, target_classes, created_at, updated_at
             FROM students WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
            |row| {
                Ok(Student {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    batch: row.get(3)?,
                    subjects: decode_subjects(&row.get::<_, String>(4)?),
                    target_classes: row.get(5)?,
                    created_at: parse_datetime(&row.get::<_, String>(6)?),
                    updated_at: parse_datetime(&row.get::<_, String>(7)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_students(&self, user_id: &str) -> Result<Vec<Student>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, batch, subjects, target_classes, created_at, updated_at
             FROM students WHERE user_id = ?1 ORDER BY rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Student {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                batch: row.get(3)?,
                subjects: decode_subjects(&row.get::<_, String>(4)?),
                target_classes: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
                updated_at: parse_datetime(&row.get::<_, String>(7)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_student(&self, student: &Student) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE students SET name = ?1, batch = ?2, subjects = ?3, target_classes = ?4, updated_at = ?5
             WHERE user_id = ?6 AND id = ?7",
            params![
                student.name,
                student.batch,
                encode_subjects(&student.subjects),
                student.target_classes,
                format_datetime(&Utc::now()),
                student.user_id,
                student.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_student(&self, user_id: &str, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM students WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(rows > 0)
    }

    // Lesson operations

    fn create_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.conn().execute(
            "INSERT INTO lessons (id, user_id, student_name, batch, subject, topic, lesson_date, class_serial, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                lesson.id,
                lesson.user_id,
                lesson.student_name,
                lesson.batch,
                lesson.subject,
                lesson.topic,
                lesson.lesson_date,
                lesson.class_serial,
                format_datetime(&lesson.created_at),
                format_datetime(&lesson.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_lesson(&self, user_id: &str, id: &str) -> Result<Option<Lesson>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, student_name, batch, subject, topic, lesson_date, class_serial, created_at, updated_at
             FROM lessons WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
            |row| {
                Ok(Lesson {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    student_name: row.get(2)?,
                    batch: row.get(3)?,
                    subject: row.get(4)?,
                    topic: row.get(5)?,
                    lesson_date: row.get(6)?,
                    class_serial: row.get(7)?,
                    created_at: parse_datetime(&row.get::<_, String>(8)?),
                    updated_at: parse_datetime(&row.get::<_, String>(9)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_recent_lessons(&self, user_id: &str, limit: i32) -> Result<Vec<Lesson>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, student_name, batch, subject, topic, lesson_date, class_serial, created_at, updated_at
             FROM lessons WHERE user_id = ?1
             ORDER BY lesson_date DESC, rowid DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok(Lesson {
                id: row.get(0)?,
                user_id: row.get(1)?,
                student_name: row.get(2)?,
                batch: row.get(3)?,
                subject: row.get(4)?,
                topic: row.get(5)?,
                lesson_date: row.get(6)?,
                class_serial: row.get(7)?,
                created_at: parse_datetime(&row.get::<_, String>(8)?),
                updated_at: parse_datetime(&row.get::<_, String>(9)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_lessons_by(
        &self,
        user_id: &str,
        filter: LessonFilter,
        value: &str,
    ) -> Result<Vec<Lesson>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, student_name, batch, subject, topic, lesson_date, class_serial, created_at, updated_at
             FROM lessons WHERE user_id = ?1 AND {} = ?2
             ORDER BY lesson_date DESC, rowid DESC",
            filter.column()
        ))?;

        let rows = stmt.query_map(params![user_id, value], |row| {
            Ok(Lesson {
                id: row.get(0)?,
                user_id: row.get(1)?,
                student_name: row.get(2)?,
                batch: row.get(3)?,
                subject: row.get(4)?,
                topic: row.get(5)?,
                lesson_date: row.get(6)?,
                class_serial: row.get(7)?,
                created_at: parse_datetime(&row.get::<_, String>(8)?),
                updated_at: parse_datetime(&row.get::<_, String>(9)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_lesson(&self, lesson: &Lesson) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE lessons SET student_name = ?1, batch = ?2, subject = ?3, topic = ?4, lesson_date = ?5, class_serial = ?6, updated_at = ?7
             WHERE user_id = ?8 AND id = ?9",
            params![
                lesson.student_name,
                lesson.batch,
                lesson.subject,
                lesson.topic,
                lesson.lesson_date,
                lesson.class_serial,
                format_datetime(&Utc::now()),
                lesson.user_id,
                lesson.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_lesson(&self, user_id: &str, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM lessons WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(rows > 0)
    }

    // Subject operations

    fn create_subject(&self, subject: &Subject) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO subjects (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                subject.id,
                subject.user_id,
                subject.name,
                format_datetime(&subject.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_subject(&self, user_id: &str, id: &str) -> Result<Option<Subject>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, name, created_at FROM subjects WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
            |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, created_at FROM subjects WHERE user_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Subject {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_subject(&self, user_id: &str, id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM subjects WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(rows > 0)
    }

    // Payment operations

    fn upsert_payment(&self, payment: &Payment) -> Result<()> {
        self.conn().execute(
            "INSERT INTO payments (student_id, user_id, month, year, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (student_id, month, year) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![
                payment.student_id,
                payment.user_id,
                payment.month,
                payment.year,
                payment.status.as_str(),
                format_datetime(&payment.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_payment(
        &self,
        user_id: &str,
        student_id: &str,
        period: BillingPeriod,
    ) -> Result<Option<Payment>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT student_id, user_id, month, year, status, updated_at
             FROM payments WHERE user_id = ?1 AND student_id = ?2 AND month = ?3 AND year = ?4",
            params![user_id, student_id, period.month, period.year],
            |row| {
                Ok(Payment {
                    student_id: row.get(0)?,
                    user_id: row.get(1)?,
                    month: row.get(2)?,
                    year: row.get(3)?,
                    status: parse_status(&row.get::<_, String>(4)?),
                    updated_at: parse_datetime(&row.get::<_, String>(5)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_student_payments(&self, user_id: &str, student_id: &str) -> Result<Vec<Payment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT student_id, user_id, month, year, status, updated_at
             FROM payments WHERE user_id = ?1 AND student_id = ?2
             ORDER BY year DESC, month DESC",
        )?;

        let rows = stmt.query_map(params![user_id, student_id], |row| {
            Ok(Payment {
                student_id: row.get(0)?,
                user_id: row.get(1)?,
                month: row.get(2)?,
                year: row.get(3)?,
                status: parse_status(&row.get::<_, String>(4)?),
                updated_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_payments_for_period(
        &self,
        user_id: &str,
        period: BillingPeriod,
    ) -> Result<Vec<Payment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT student_id, user_id, month, year, status, updated_at
             FROM payments WHERE user_id = ?1 AND month = ?2 AND year = ?3
             ORDER BY student_id",
        )?;

        let rows = stmt.query_map(params![user_id, period.month, period.year], |row| {
            Ok(Payment {
                student_id: row.get(0)?,
                user_id: row.get(1)?,
                month: row.get(2)?,
                year: row.get(3)?,
                status: parse_status(&row.get::<_, String>(4)?),
                updated_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn commit_lesson_with_payment(&self, payment: &Payment, lesson: &Lesson) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO payments (student_id, user_id, month, year, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (student_id, month, year) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![
                payment.student_id,
                payment.user_id,
                payment.month,
                payment.year,
                payment.status.as_str(),
                format_datetime(&payment.updated_at),
            ],
        )?;

        tx.execute(
            "INSERT INTO lessons (id, user_id, student_name, batch, subject, topic, lesson_date, class_serial, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                lesson.id,
                lesson.user_id,
                lesson.student_name,
                lesson.batch,
                lesson.subject,
                lesson.topic,
                lesson.lesson_date,
                lesson.class_serial,
                format_datetime(&lesson.created_at),
                format_datetime(&lesson.updated_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn seed_user(store: &SqliteStore, id: &str, email: &str) {
        let now = Utc::now();
        store
            .create_user(&User {
                id: id.to_string(),
                email: email.to_string(),
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn sample_student(user_id: &str, id: &str, name: &str, target: i64) -> Student {
        let now = Utc::now();
        Student {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            batch: "Morning".to_string(),
            subjects: vec!["Math".to_string()],
            target_classes: target,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_lesson(user_id: &str, id: &str, student_name: &str, date: &str) -> Lesson {
        let now = Utc::now();
        Lesson {
            id: id.to_string(),
            user_id: user_id.to_string(),
            student_name: student_name.to_string(),
            batch: "Morning".to_string(),
            subject: "Math".to_string(),
            topic: "Fractions".to_string(),
            lesson_date: date.to_string(),
            class_serial: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"tokens".to_string()));
        assert!(tables.contains(&"profiles".to_string()));
        assert!(tables.contains(&"students".to_string()));
        assert!(tables.contains(&"lessons".to_string()));
        assert!(tables.contains(&"subjects".to_string()));
        assert!(tables.contains(&"payments".to_string()));
    }

    #[test]
    fn test_duplicate_email_is_already_exists() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        let now = Utc::now();
        let result = store.create_user(&User {
            id: "user-2".to_string(),
            email: "a@example.com".to_string(),
            created_at: now,
            updated_at: now,
        });
        assert!(matches!(result, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_student_crud() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        let mut student = sample_student("user-1", "student-1", "Rafi", 8);
        store.create_student(&student).unwrap();

        let fetched = store.get_student("user-1", "student-1").unwrap().unwrap();
        assert_eq!(fetched.name, "Rafi");
        assert_eq!(fetched.target_classes, 8);

        student.name = "Rafi Ahmed".to_string();
        student.target_classes = 12;
        store.update_student(&student).unwrap();

        let fetched = store.get_student("user-1", "student-1").unwrap().unwrap();
        assert_eq!(fetched.name, "Rafi Ahmed");
        assert_eq!(fetched.target_classes, 12);

        assert!(store.delete_student("user-1", "student-1").unwrap());
        assert!(store.get_student("user-1", "student-1").unwrap().is_none());
    }

    #[test]
    fn test_update_missing_student_is_not_found() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        let student = sample_student("user-1", "student-x", "Ghost", 0);
        let result = store.update_student(&student);
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn test_students_are_owner_scoped() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");
        seed_user(&store, "user-2", "b@example.com");

        store
            .create_student(&sample_student("user-1", "student-1", "Rafi", 8))
            .unwrap();

        assert!(store.get_student("user-2", "student-1").unwrap().is_none());
        assert!(store.list_students("user-2").unwrap().is_empty());
        assert!(!store.delete_student("user-2", "student-1").unwrap());

        // Still present for the owner
        assert!(store.get_student("user-1", "student-1").unwrap().is_some());
    }

    #[test]
    fn test_students_list_newest_first() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        store
            .create_student(&sample_student("user-1", "student-1", "First", 0))
            .unwrap();
        store
            .create_student(&sample_student("user-1", "student-2", "Second", 0))
            .unwrap();

        let students = store.list_students("user-1").unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].name, "Second");
        assert_eq!(students[1].name, "First");
    }

    #[test]
    fn test_subject_list_round_trip() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        let mut student = sample_student("user-1", "student-1", "Rafi", 0);
        student.subjects = vec!["Math".to_string(), "Physics".to_string()];
        store.create_student(&student).unwrap();

        let fetched = store.get_student("user-1", "student-1").unwrap().unwrap();
        assert_eq!(fetched.subjects, vec!["Math", "Physics"]);
    }

    #[test]
    fn test_legacy_bare_subject_decodes_as_singleton() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        // Rows written before the list migration hold the subject unencoded
        store
            .conn()
            .execute(
                "INSERT INTO students (id, user_id, name, subjects) VALUES (?1, ?2, ?3, ?4)",
                params!["student-1", "user-1", "Rafi", "Chemistry"],
            )
            .unwrap();

        let fetched = store.get_student("user-1", "student-1").unwrap().unwrap();
        assert_eq!(fetched.subjects, vec!["Chemistry"]);
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = test_store();

        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup123".to_string(),
            is_admin: true,
            user_id: None,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();

        let token2 = Token {
            id: "token-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup123".to_string(), // Same lookup
            is_admin: true,
            user_id: None,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_payment_upsert_is_last_write_wins() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");
        store
            .create_student(&sample_student("user-1", "student-1", "Rafi", 8))
            .unwrap();

        let mut payment = Payment {
            student_id: "student-1".to_string(),
            user_id: "user-1".to_string(),
            month: 8,
            year: 2026,
            status: PaymentStatus::Due,
            updated_at: Utc::now(),
        };
        store.upsert_payment(&payment).unwrap();

        payment.status = PaymentStatus::Paid;
        store.upsert_payment(&payment).unwrap();

        let fetched = store
            .get_payment("user-1", "student-1", BillingPeriod::new(8, 2026))
            .unwrap()
            .unwrap();
        assert_eq!(fetched.status, PaymentStatus::Paid);

        let all = store.list_student_payments("user-1", "student-1").unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_payments_keyed_per_month() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");
        store
            .create_student(&sample_student("user-1", "student-1", "Rafi", 8))
            .unwrap();

        for month in [7u32, 8] {
            store
                .upsert_payment(&Payment {
                    student_id: "student-1".to_string(),
                    user_id: "user-1".to_string(),
                    month,
                    year: 2026,
                    status: PaymentStatus::Paid,
                    updated_at: Utc::now(),
                })
                .unwrap();
        }

        let history = store.list_student_payments("user-1", "student-1").unwrap();
        assert_eq!(history.len(), 2);
        // Newest period first
        assert_eq!(history[0].month, 8);
        assert_eq!(history[1].month, 7);

        assert!(
            store
                .get_payment("user-1", "student-1", BillingPeriod::new(6, 2026))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_delete_student_cascades_payments_not_lessons() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");
        store
            .create_student(&sample_student("user-1", "student-1", "Rafi", 8))
            .unwrap();
        store
            .upsert_payment(&Payment {
                student_id: "student-1".to_string(),
                user_id: "user-1".to_string(),
                month: 8,
                year: 2026,
                status: PaymentStatus::Paid,
                updated_at: Utc::now(),
            })
            .unwrap();
        store
            .create_lesson(&sample_lesson("user-1", "lesson-1", "Rafi", "2026-08-01"))
            .unwrap();

        assert!(store.delete_student("user-1", "student-1").unwrap());

        assert!(
            store
                .list_student_payments("user-1", "student-1")
                .unwrap()
                .is_empty()
        );
        // The lesson snapshot survives its student
        let lessons = store.list_recent_lessons("user-1", 20).unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].student_name, "Rafi");
    }

    #[test]
    fn test_recent_lessons_ordered_and_limited() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        store
            .create_lesson(&sample_lesson("user-1", "lesson-1", "Rafi", "2026-08-01"))
            .unwrap();
        store
            .create_lesson(&sample_lesson("user-1", "lesson-2", "Rafi", "2026-08-03"))
            .unwrap();
        store
            .create_lesson(&sample_lesson("user-1", "lesson-3", "Rafi", "2026-08-03"))
            .unwrap();

        let lessons = store.list_recent_lessons("user-1", 20).unwrap();
        // Date descending, same-day ties broken by insertion order descending
        assert_eq!(lessons[0].id, "lesson-3");
        assert_eq!(lessons[1].id, "lesson-2");
        assert_eq!(lessons[2].id, "lesson-1");

        let limited = store.list_recent_lessons("user-1", 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_lessons_filtered_by_each_dimension() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        let mut lesson = sample_lesson("user-1", "lesson-1", "Rafi", "2026-08-01");
        lesson.batch = "Evening".to_string();
        lesson.subject = "Physics".to_string();
        store.create_lesson(&lesson).unwrap();
        store
            .create_lesson(&sample_lesson("user-1", "lesson-2", "Nadia", "2026-08-02"))
            .unwrap();

        let by_student = store
            .list_lessons_by("user-1", LessonFilter::StudentName, "Rafi")
            .unwrap();
        assert_eq!(by_student.len(), 1);
        assert_eq!(by_student[0].id, "lesson-1");

        let by_batch = store
            .list_lessons_by("user-1", LessonFilter::Batch, "Evening")
            .unwrap();
        assert_eq!(by_batch.len(), 1);

        let by_subject = store
            .list_lessons_by("user-1", LessonFilter::Subject, "Math")
            .unwrap();
        assert_eq!(by_subject.len(), 1);
        assert_eq!(by_subject[0].id, "lesson-2");
    }

    #[test]
    fn test_duplicate_subject_name_is_already_exists() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");
        seed_user(&store, "user-2", "b@example.com");

        let now = Utc::now();
        store
            .create_subject(&Subject {
                id: "subject-1".to_string(),
                user_id: "user-1".to_string(),
                name: "Math".to_string(),
                created_at: now,
            })
            .unwrap();

        let result = store.create_subject(&Subject {
            id: "subject-2".to_string(),
            user_id: "user-1".to_string(),
            name: "Math".to_string(),
            created_at: now,
        });
        assert!(matches!(result, Err(Error::AlreadyExists)));

        // Same name under another owner is fine
        store
            .create_subject(&Subject {
                id: "subject-3".to_string(),
                user_id: "user-2".to_string(),
                name: "Math".to_string(),
                created_at: now,
            })
            .unwrap();
    }

    #[test]
    fn test_commit_lesson_with_payment_is_atomic() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");
        store
            .create_student(&sample_student("user-1", "student-1", "Rafi", 8))
            .unwrap();

        let lesson = sample_lesson("user-1", "lesson-1", "Rafi", "2026-08-01");
        let payment = Payment {
            student_id: "student-1".to_string(),
            user_id: "user-1".to_string(),
            month: 8,
            year: 2026,
            status: PaymentStatus::Due,
            updated_at: Utc::now(),
        };
        store.commit_lesson_with_payment(&payment, &lesson).unwrap();

        assert!(store.get_lesson("user-1", "lesson-1").unwrap().is_some());
        assert!(
            store
                .get_payment("user-1", "student-1", BillingPeriod::new(8, 2026))
                .unwrap()
                .is_some()
        );

        // A failing lesson insert (duplicate id) must roll the payment back
        let bad_payment = Payment {
            status: PaymentStatus::Paid,
            month: 9,
            ..payment.clone()
        };
        let result = store.commit_lesson_with_payment(&bad_payment, &lesson);
        assert!(result.is_err());
        assert!(
            store
                .get_payment("user-1", "student-1", BillingPeriod::new(9, 2026))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_profile_upsert_round_trip() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");

        assert!(store.get_profile("user-1").unwrap().is_none());

        let mut profile = Profile {
            user_id: "user-1".to_string(),
            display_name: "a".to_string(),
            avatar_url: None,
            updated_at: Utc::now(),
        };
        store.upsert_profile(&profile).unwrap();

        profile.display_name = "Ms. Anika".to_string();
        profile.avatar_url = Some("https://example.com/a.png".to_string());
        store.upsert_profile(&profile).unwrap();

        let fetched = store.get_profile("user-1").unwrap().unwrap();
        assert_eq!(fetched.display_name, "Ms. Anika");
        assert_eq!(
            fetched.avatar_url.as_deref(),
            Some("https://example.com/a.png")
        );
    }

    #[test]
    fn test_delete_user_cascades_owned_rows() {
        let (_temp, store) = test_store();
        seed_user(&store, "user-1", "a@example.com");
        store
            .create_student(&sample_student("user-1", "student-1", "Rafi", 8))
            .unwrap();
        store
            .create_lesson(&sample_lesson("user-1", "lesson-1", "Rafi", "2026-08-01"))
            .unwrap();

        assert!(store.delete_user("user-1").unwrap());

        assert!(store.get_student("user-1", "student-1").unwrap().is_none());
        assert!(store.list_recent_lessons("user-1", 20).unwrap().is_empty());
    }
}
