use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{
    Admin, AdminId, AdminRole, Application, ApplicationForm, ApplicationId, Branch, BranchId,
    BranchScope, Course, CourseCategory, CourseId, Lesson, LessonId, Payment, PaymentId,
    PaymentMethod, PortalAccess, ScopeFilter, Student, StudentId,
};

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated on {field}")]
    Conflict { field: &'static str },
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Branch seed used before an id is assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBranch {
    pub name: String,
    pub code: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub name: String,
    pub code: String,
    pub category: CourseCategory,
    pub duration_weeks: u32,
    pub total_hours: u32,
    pub fee: Decimal,
    pub branch_id: BranchId,
    pub instructor: Option<AdminId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub scope: BranchScope,
}

/// Student seed assembled by the review operation when accepting an application.
/// The store assigns the id and student number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
    pub application_id: ApplicationId,
    pub enrollment_date: NaiveDate,
    pub course_start_date: NaiveDate,
    pub course_end_date: NaiveDate,
    pub total_fee: Decimal,
    pub course_id: CourseId,
    pub branch_id: BranchId,
    pub assigned_instructor: Option<AdminId>,
    pub created_by: Option<AdminId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub student_id: StudentId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub received_by: AdminId,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLesson {
    pub student_id: StudentId,
    pub instructor_id: AdminId,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
}

/// Storage abstraction for the enrollment workflow.
///
/// Every mutating method is one transactional unit: identifier sequencing,
/// uniqueness checks, and the row writes it implies happen atomically inside
/// the call, so callers never observe duplicate sequence numbers or lost
/// `amount_paid` updates under concurrent requests.
pub trait EnrollmentStore: Send + Sync {
    fn insert_branch(&self, seed: NewBranch) -> Result<Branch, StoreError>;
    fn insert_course(&self, seed: NewCourse) -> Result<Course, StoreError>;
    fn insert_admin(&self, seed: NewAdmin) -> Result<Admin, StoreError>;
    fn branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError>;
    fn branches(&self) -> Result<Vec<Branch>, StoreError>;
    fn course(&self, id: CourseId) -> Result<Option<Course>, StoreError>;
    fn courses(&self) -> Result<Vec<Course>, StoreError>;
    fn admin(&self, id: AdminId) -> Result<Option<Admin>, StoreError>;

    /// Insert a new application with a freshly generated application number.
    fn create_application(
        &self,
        form: ApplicationForm,
        now: NaiveDateTime,
    ) -> Result<Application, StoreError>;
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError>;
    fn application_by_number(&self, number: &str) -> Result<Option<Application>, StoreError>;
    fn applications(&self, scope: ScopeFilter) -> Result<Vec<Application>, StoreError>;
    fn update_application(&self, application: Application) -> Result<(), StoreError>;

    /// Persist the accepted status and materialize the 1:1 student row in one
    /// unit. Fails with a conflict if the application already has a student.
    fn accept_application(
        &self,
        application: Application,
        seed: NewStudent,
        now: NaiveDateTime,
    ) -> Result<(Application, Student), StoreError>;

    fn student(&self, id: StudentId) -> Result<Option<Student>, StoreError>;
    fn student_by_number(&self, number: &str) -> Result<Option<Student>, StoreError>;
    fn students(&self, scope: ScopeFilter) -> Result<Vec<Student>, StoreError>;
    fn update_student(&self, student: Student) -> Result<(), StoreError>;

    /// Insert a completed payment, accumulate `amount_paid`, and rederive the
    /// student's payment status in one unit. Returns the updated student.
    fn record_payment(
        &self,
        seed: NewPayment,
        now: NaiveDateTime,
    ) -> Result<(Payment, Student), StoreError>;
    fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError>;
    fn payments(&self, scope: ScopeFilter) -> Result<Vec<Payment>, StoreError>;
    fn payments_for(&self, student: StudentId) -> Result<Vec<Payment>, StoreError>;
    /// Stamp the verifier onto a completed payment; the only mutation allowed
    /// after completion.
    fn verify_payment(&self, id: PaymentId, verifier: AdminId) -> Result<Payment, StoreError>;

    /// Fails with a conflict when the (student, date, time) slot is taken.
    fn schedule_lesson(&self, seed: NewLesson) -> Result<Lesson, StoreError>;
    fn lesson(&self, id: LessonId) -> Result<Option<Lesson>, StoreError>;
    /// Mark a lesson completed and refresh the student's progress percentage.
    fn complete_lesson(
        &self,
        id: LessonId,
        score: Option<u8>,
        completed_on: NaiveDate,
    ) -> Result<(Lesson, Student), StoreError>;
    fn lessons_for(&self, student: StudentId) -> Result<Vec<Lesson>, StoreError>;

    /// Create portal access with a collision-free generated access code.
    fn create_portal_access(
        &self,
        student: StudentId,
        email: String,
        phone: String,
        now: NaiveDateTime,
    ) -> Result<PortalAccess, StoreError>;
    fn portal_access_for(&self, student: StudentId) -> Result<Option<PortalAccess>, StoreError>;
    fn update_portal_access(&self, access: PortalAccess) -> Result<(), StoreError>;
    /// Re-sample the access code until the store reports no existing match.
    fn regenerate_access_code(&self, student: StudentId) -> Result<PortalAccess, StoreError>;
}
