use studyhub_core::domain::{Course, Enrollment, EnrollmentStatus, EntityId, Millis};
use studyhub_core::Result;

use super::{Persist, SqlQuery};

#[derive(sqlx::FromRow)]
pub struct CourseRow {
    pub id: i64,
    pub title: String,
    pub code: String,
    pub description: String,
    pub price: f64,
    pub duration_hours: i64,
    pub is_active: bool,
    pub starts_at: i64,
    pub ends_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Persist for Course {
    const ENTITY: &'static str = "course";
    type Row = CourseRow;

    fn from_row(row: CourseRow) -> Self {
        Course {
            id: row.id,
            title: row.title,
            code: row.code,
            description: row.description,
            price: row.price,
            duration_hours: row.duration_hours,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn deleted_at(&self) -> Option<Millis> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<Millis>) {
        self.deleted_at = at;
    }

    fn before_create(&mut self, now: Millis) -> Result<()> {
        self.validate()?;
        self.created_at = now;
        self.updated_at = now;
        Ok(())
    }

    fn before_update(&mut self, now: Millis) -> Result<()> {
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.title.as_str())
            .bind(self.code.as_str())
            .bind(self.description.as_str())
            .bind(self.price)
            .bind(self.duration_hours)
            .bind(self.is_active)
            .bind(self.starts_at)
            .bind(self.ends_at)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.deleted_at)
    }

    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.title.as_str())
            .bind(self.code.as_str())
            .bind(self.description.as_str())
            .bind(self.price)
            .bind(self.duration_hours)
            .bind(self.is_active)
            .bind(self.starts_at)
            .bind(self.ends_at)
            .bind(self.updated_at)
            .bind(self.deleted_at)
            .bind(self.id)
    }
}

#[derive(sqlx::FromRow)]
pub struct EnrollmentRow {
    pub id: i64,
    pub account_id: i64,
    pub course_id: i64,
    pub status: String,
    pub grade: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Persist for Enrollment {
    const ENTITY: &'static str = "enrollment";
    type Row = EnrollmentRow;

    fn from_row(row: EnrollmentRow) -> Self {
        Enrollment {
            id: row.id,
            account_id: row.account_id,
            course_id: row.course_id,
            status: EnrollmentStatus::parse(&row.status),
            grade: row.grade,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn deleted_at(&self) -> Option<Millis> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<Millis>) {
        self.deleted_at = at;
    }

    fn before_create(&mut self, now: Millis) -> Result<()> {
        self.validate()?;
        self.created_at = now;
        self.updated_at = now;
        Ok(())
    }

    fn before_update(&mut self, now: Millis) -> Result<()> {
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }

    fn bind_insert<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.account_id)
            .bind(self.course_id)
            .bind(self.status.to_string())
            .bind(self.grade)
            .bind(self.created_at)
            .bind(self.updated_at)
            .bind(self.deleted_at)
    }

    fn bind_update<'q>(&'q self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        query
            .bind(self.account_id)
            .bind(self.course_id)
            .bind(self.status.to_string())
            .bind(self.grade)
            .bind(self.updated_at)
            .bind(self.deleted_at)
            .bind(self.id)
    }
}
