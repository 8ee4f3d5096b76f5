use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SchoolConfig;

use super::documents::{DocumentError, DocumentFile, DocumentGenerator};
use super::domain::{
    Admin, AdminId, Application, ApplicationForm, ApplicationId, ApplicationStatus, Branch,
    BranchId, Course, Lesson, LessonId, Payment, PaymentId, PaymentMethod, ReviewAction, Student,
    StudentId,
};
use super::notifier::{Notification, Notifier};
use super::store::{EnrollmentStore, NewLesson, NewPayment, NewStudent, StoreError};
use super::views::{
    AcceptanceLetter, ApplicationExportRow, ApplicationStatusView, DashboardStats, InvoiceView,
    PaymentExportRow, StudentExportRow, StudentStatusView,
};

/// Error taxonomy for every entity-mutating operation. Notifier and document
/// failures never appear here when they are post-commit side effects; those
/// are logged and surfaced as warnings only.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("conflict on {field}")]
    Conflict { field: &'static str },
    #[error("document generation failed: {0}")]
    Document(String),
    #[error("store unavailable: {0}")]
    Store(String),
}

impl EnrollmentError {
    /// Stable taxonomy code carried alongside the human-readable message.
    pub const fn code(&self) -> &'static str {
        match self {
            EnrollmentError::Validation(_) => "validation",
            EnrollmentError::NotFound(_) => "not_found",
            EnrollmentError::Permission(_) => "permission",
            EnrollmentError::Conflict { .. } => "conflict",
            EnrollmentError::Document(_) => "document",
            EnrollmentError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for EnrollmentError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { field } => EnrollmentError::Conflict { field },
            StoreError::NotFound => EnrollmentError::NotFound("record"),
            StoreError::Unavailable(reason) => EnrollmentError::Store(reason),
        }
    }
}

impl From<DocumentError> for EnrollmentError {
    fn from(value: DocumentError) -> Self {
        EnrollmentError::Document(value.to_string())
    }
}

/// Result of a review action; `student` is present only for acceptances.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub application: Application,
    pub student: Option<Student>,
}

/// Inbound payment payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Service composing the persistence store, notifier, and document generator.
/// All lifecycle rules live here; handlers stay thin.
pub struct EnrollmentService<S, N, D> {
    store: Arc<S>,
    notifier: Arc<N>,
    documents: Arc<D>,
    school: SchoolConfig,
}

impl<S, N, D> EnrollmentService<S, N, D>
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, documents: Arc<D>, school: SchoolConfig) -> Self {
        Self {
            store,
            notifier,
            documents,
            school,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(super) fn notifier(&self) -> &Arc<N> {
        &self.notifier
    }

    /// Look up an active admin account acting as the request principal.
    pub fn require_admin(&self, id: AdminId) -> Result<Admin, EnrollmentError> {
        let admin = self
            .store
            .admin(id)?
            .ok_or(EnrollmentError::NotFound("admin"))?;
        if !admin.active {
            return Err(EnrollmentError::Permission(format!(
                "admin account {} is disabled",
                admin.username
            )));
        }
        Ok(admin)
    }

    fn require_branch_access(
        &self,
        admin: &Admin,
        branch: BranchId,
    ) -> Result<(), EnrollmentError> {
        if admin.can_access(branch) {
            return Ok(());
        }
        Err(EnrollmentError::Permission(format!(
            "reviewer {} lacks access to branch {branch}",
            admin.username
        )))
    }

    fn notify_best_effort(&self, action: &'static str, message: Notification) {
        let recipient = message.recipient.clone();
        if let Err(error) = self.notifier.send(message) {
            warn!(%error, action, recipient, "notification delivery failed");
        }
    }

    // ---- applications -----------------------------------------------------

    /// Validate and record an admission application; the public entry point.
    pub fn submit_application(
        &self,
        form: ApplicationForm,
        now: NaiveDateTime,
    ) -> Result<Application, EnrollmentError> {
        validate_form(&form)?;

        let course = self
            .store
            .course(form.course_id)?
            .filter(|course| course.active)
            .ok_or_else(|| EnrollmentError::Validation("unknown or inactive course".to_string()))?;
        let branch = self
            .store
            .branch(form.branch_id)?
            .filter(|branch| branch.active)
            .ok_or_else(|| EnrollmentError::Validation("unknown or inactive branch".to_string()))?;

        // An identifier collision is retryable once; everything else surfaces.
        let application = match self.store.create_application(form.clone(), now) {
            Err(StoreError::Conflict {
                field: "application_number",
            }) => self.store.create_application(form, now)?,
            other => other?,
        };

        self.notify_best_effort(
            "submit_application",
            Notification::new(
                self.school.admin_email.clone(),
                format!("New Application Received: {}", application.application_number),
                format!(
                    "New application from {} for {} at {}.",
                    application.full_name(),
                    course.name,
                    branch.name
                ),
            ),
        );
        self.notify_best_effort(
            "submit_application",
            Notification::new(
                application.email.clone(),
                format!("Application Received - {}", self.school.name),
                format!(
                    "Dear {},\n\nYour application {} for {} has been received. \
                     We will review it and get back to you within 2-3 business days.",
                    application.first_name, application.application_number, course.name
                ),
            ),
        );

        Ok(application)
    }

    /// Apply a reviewer-driven status transition. Accepting atomically
    /// materializes the student row; the letter and email run after commit
    /// and never unwind it.
    pub fn review(
        &self,
        application_id: ApplicationId,
        action: ReviewAction,
        reviewer: &Admin,
        notes: Option<String>,
        now: NaiveDateTime,
    ) -> Result<ReviewOutcome, EnrollmentError> {
        let mut application = self
            .store
            .application(application_id)?
            .ok_or(EnrollmentError::NotFound("application"))?;
        self.require_branch_access(reviewer, application.branch_id)?;

        let next = action.next_status(application.status).ok_or_else(|| {
            EnrollmentError::Validation(format!(
                "cannot {action:?} an application in status {}",
                application.status.label()
            ))
        })?;

        application.status = next;
        application.reviewed_by = Some(reviewer.id);
        application.reviewed_at = Some(now);
        if notes.is_some() {
            application.admin_notes = notes;
        }

        if next != ApplicationStatus::Accepted {
            self.store.update_application(application.clone())?;
            return Ok(ReviewOutcome {
                application,
                student: None,
            });
        }

        let course = self
            .store
            .course(application.course_id)?
            .ok_or(EnrollmentError::NotFound("course"))?;
        let course_start = now.date() + Duration::days(self.school.course_start_lead_days);
        let seed = NewStudent {
            application_id: application.id,
            enrollment_date: now.date(),
            course_start_date: course_start,
            course_end_date: course_start + Duration::weeks(course.duration_weeks as i64),
            total_fee: course.fee,
            course_id: course.id,
            branch_id: application.branch_id,
            assigned_instructor: course.instructor,
            created_by: Some(reviewer.id),
        };
        let (application, student) = self.store.accept_application(application, seed, now)?;

        self.send_acceptance_letter(&application, &student, &course);

        Ok(ReviewOutcome {
            application,
            student: Some(student),
        })
    }

    fn send_acceptance_letter(&self, application: &Application, student: &Student, course: &Course) {
        let branch_name = self
            .branch_name(application.branch_id)
            .unwrap_or_else(|| "Main Branch".to_string());
        let letter = AcceptanceLetter {
            school_name: self.school.name.clone(),
            application_number: application.application_number.clone(),
            full_name: application.full_name(),
            course_name: course.name.clone(),
            branch_name,
            course_start_date: student.course_start_date,
            total_fee: student.total_fee,
            currency: self.school.currency.clone(),
            issued_on: student.enrollment_date,
        };

        let mut message = Notification::new(
            application.email.clone(),
            "Congratulations! Your Application Has Been Accepted".to_string(),
            format!(
                "Dear {},\n\nYour application {} has been accepted. \
                 Your student number is {} and your course starts on {}.",
                application.first_name,
                application.application_number,
                student.student_number,
                student.course_start_date
            ),
        );
        match self.documents.acceptance_letter(&letter) {
            Ok(file) => message = message.with_attachment(file),
            Err(error) => warn!(
                %error,
                application = %application.id,
                action = "accept",
                "acceptance letter rendering failed"
            ),
        }
        self.notify_best_effort("accept", message);
    }

    pub fn application(
        &self,
        id: ApplicationId,
        reviewer: &Admin,
    ) -> Result<Application, EnrollmentError> {
        let application = self
            .store
            .application(id)?
            .ok_or(EnrollmentError::NotFound("application"))?;
        self.require_branch_access(reviewer, application.branch_id)?;
        Ok(application)
    }

    pub fn applications(&self, reviewer: &Admin) -> Result<Vec<Application>, EnrollmentError> {
        Ok(self.store.applications(reviewer.scope_filter())?)
    }

    /// Public status lookup: application number plus date of birth as the
    /// secondary verification factor. A factor mismatch reads as not-found so
    /// the endpoint is not an existence oracle.
    pub fn application_status(
        &self,
        application_number: &str,
        date_of_birth: NaiveDate,
    ) -> Result<ApplicationStatusView, EnrollmentError> {
        let application = self
            .store
            .application_by_number(application_number)?
            .filter(|application| application.date_of_birth == date_of_birth)
            .ok_or(EnrollmentError::NotFound("application"))?;

        Ok(ApplicationStatusView {
            application_number: application.application_number.clone(),
            full_name: application.full_name(),
            status: application.status.label(),
            course_name: self.course_name(&application),
            branch_name: self
                .branch_name(application.branch_id)
                .unwrap_or_default(),
            application_date: application.application_date,
            reviewed_at: application.reviewed_at,
        })
    }

    // ---- students ---------------------------------------------------------

    pub fn student(&self, id: StudentId, reviewer: &Admin) -> Result<Student, EnrollmentError> {
        let student = self
            .store
            .student(id)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        self.require_branch_access(reviewer, student.branch_id)?;
        Ok(student)
    }

    pub fn students(&self, reviewer: &Admin) -> Result<Vec<Student>, EnrollmentError> {
        Ok(self.store.students(reviewer.scope_filter())?)
    }

    /// Public student status lookup guarded by the date-of-birth factor.
    pub fn student_status(
        &self,
        student_number: &str,
        date_of_birth: NaiveDate,
    ) -> Result<StudentStatusView, EnrollmentError> {
        let student = self
            .store
            .student_by_number(student_number)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        let application = self
            .store
            .application(student.application_id)?
            .filter(|application| application.date_of_birth == date_of_birth)
            .ok_or(EnrollmentError::NotFound("student"))?;

        Ok(StudentStatusView {
            student_number: student.student_number.clone(),
            full_name: application.full_name(),
            status: student.status.label(),
            course_name: self.course_name(&application),
            payment_status: student.payment_status.label(),
            progress_percentage: self.fresh_progress(&student)?,
            course_start_date: student.course_start_date,
            course_end_date: student.course_end_date,
        })
    }

    /// Derive progress from lesson counts so reads never trail completions.
    pub(super) fn fresh_progress(&self, student: &Student) -> Result<u8, EnrollmentError> {
        let lessons = self.store.lessons_for(student.id)?;
        if lessons.is_empty() {
            return Ok(student.progress_percentage);
        }
        let completed = lessons
            .iter()
            .filter(|lesson| lesson.status == super::domain::LessonStatus::Completed)
            .count();
        Ok(super::domain::progress_percentage(completed, lessons.len()))
    }

    // ---- payments ---------------------------------------------------------

    /// Record a completed payment and rederive the student's financial state.
    /// Overpayment is allowed by design; the balance simply goes negative.
    pub fn record_payment(
        &self,
        student_id: StudentId,
        request: PaymentRequest,
        receiver: &Admin,
        now: NaiveDateTime,
    ) -> Result<(Payment, Student), EnrollmentError> {
        if request.amount <= Decimal::ZERO {
            return Err(EnrollmentError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        let student = self
            .store
            .student(student_id)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        self.require_branch_access(receiver, student.branch_id)?;

        let (payment, student) = self.store.record_payment(
            NewPayment {
                student_id,
                amount: request.amount,
                method: request.method,
                payment_date: request.payment_date,
                received_by: receiver.id,
                notes: request.notes,
            },
            now,
        )?;

        self.send_receipt(&payment, &student);

        Ok((payment, student))
    }

    fn send_receipt(&self, payment: &Payment, student: &Student) {
        let Ok(Some(application)) = self.store.application(student.application_id) else {
            warn!(
                student = %student.id,
                action = "record_payment",
                "student has no application row; receipt skipped"
            );
            return;
        };

        let invoice = InvoiceView {
            school_name: self.school.name.clone(),
            payment_number: payment.payment_number.clone(),
            payment_date: payment.payment_date,
            student_number: student.student_number.clone(),
            student_name: application.full_name(),
            course_name: self.course_name(&application),
            amount: payment.amount,
            method: payment.method.label(),
            balance: student.balance(),
            currency: self.school.currency.clone(),
        };

        let mut message = Notification::new(
            application.email.clone(),
            format!("Payment Received - {}", payment.payment_number),
            format!(
                "Dear {},\n\nWe have received your payment of {} {:.2}. \
                 Your current balance is {} {:.2}.",
                application.first_name,
                self.school.currency,
                payment.amount,
                self.school.currency,
                student.balance()
            ),
        );
        match self.documents.invoice(&invoice) {
            Ok(file) => message = message.with_attachment(file),
            Err(error) => warn!(
                %error,
                payment = %payment.id,
                action = "record_payment",
                "invoice rendering failed"
            ),
        }
        self.notify_best_effort("record_payment", message);
    }

    pub fn verify_payment(
        &self,
        payment_id: PaymentId,
        verifier: &Admin,
    ) -> Result<Payment, EnrollmentError> {
        let payment = self
            .store
            .payment(payment_id)?
            .ok_or(EnrollmentError::NotFound("payment"))?;
        let student = self
            .store
            .student(payment.student_id)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        self.require_branch_access(verifier, student.branch_id)?;
        Ok(self.store.verify_payment(payment_id, verifier.id)?)
    }

    pub fn payments(&self, reviewer: &Admin) -> Result<Vec<Payment>, EnrollmentError> {
        Ok(self.store.payments(reviewer.scope_filter())?)
    }

    // ---- lessons ----------------------------------------------------------

    pub fn schedule_lesson(
        &self,
        student_id: StudentId,
        instructor_id: AdminId,
        scheduled_date: NaiveDate,
        scheduled_time: NaiveTime,
        scheduler: &Admin,
    ) -> Result<Lesson, EnrollmentError> {
        let student = self
            .store
            .student(student_id)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        self.require_branch_access(scheduler, student.branch_id)?;
        Ok(self.store.schedule_lesson(NewLesson {
            student_id,
            instructor_id,
            scheduled_date,
            scheduled_time,
        })?)
    }

    pub fn complete_lesson(
        &self,
        lesson_id: LessonId,
        score: Option<u8>,
        scheduler: &Admin,
        today: NaiveDate,
    ) -> Result<(Lesson, Student), EnrollmentError> {
        if let Some(score) = score {
            if score > 100 {
                return Err(EnrollmentError::Validation(
                    "lesson score must be between 0 and 100".to_string(),
                ));
            }
        }
        let lesson = self
            .store
            .lesson(lesson_id)?
            .ok_or(EnrollmentError::NotFound("lesson"))?;
        let student = self
            .store
            .student(lesson.student_id)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        self.require_branch_access(scheduler, student.branch_id)?;
        Ok(self.store.complete_lesson(lesson_id, score, today)?)
    }

    // ---- statistics and exports -------------------------------------------

    pub fn statistics(&self, reviewer: &Admin) -> Result<DashboardStats, EnrollmentError> {
        let scope = reviewer.scope_filter();
        let applications = self.store.applications(scope)?;
        let students = self.store.students(scope)?;
        let payments = self.store.payments(scope)?;

        let count_status = |status: ApplicationStatus| {
            applications
                .iter()
                .filter(|application| application.status == status)
                .count()
        };

        Ok(DashboardStats {
            total_applications: applications.len(),
            pending_applications: count_status(ApplicationStatus::Pending),
            reviewing_applications: count_status(ApplicationStatus::Reviewing),
            accepted_applications: count_status(ApplicationStatus::Accepted),
            rejected_applications: count_status(ApplicationStatus::Rejected),
            total_students: students.len(),
            active_students: students
                .iter()
                .filter(|student| student.status == super::domain::StudentStatus::Active)
                .count(),
            total_revenue: payments
                .iter()
                .filter(|payment| payment.state == super::domain::PaymentState::Completed)
                .map(|payment| payment.amount)
                .sum(),
            outstanding_balance: students.iter().map(Student::balance).sum(),
        })
    }

    pub fn export_applications(&self, reviewer: &Admin) -> Result<DocumentFile, EnrollmentError> {
        let rows = self
            .applications(reviewer)?
            .iter()
            .map(|application| self.application_row(application))
            .collect::<Vec<_>>();
        Ok(self.documents.applications_sheet(&rows)?)
    }

    pub fn export_students(&self, reviewer: &Admin) -> Result<DocumentFile, EnrollmentError> {
        let students = self.students(reviewer)?;
        let mut rows = Vec::with_capacity(students.len());
        for student in &students {
            let application = self.store.application(student.application_id)?;
            let (first, last, email, phone, course_name) = match &application {
                Some(application) => (
                    application.first_name.clone(),
                    application.last_name.clone(),
                    application.email.clone(),
                    application.phone.clone(),
                    self.course_name(application),
                ),
                None => Default::default(),
            };
            rows.push(StudentExportRow {
                id: student.id.0,
                student_number: student.student_number.clone(),
                first_name: first,
                last_name: last,
                email,
                phone,
                course: course_name,
                branch: self.branch_name(student.branch_id).unwrap_or_default(),
                enrollment_date: student.enrollment_date,
                course_start_date: student.course_start_date,
                course_end_date: student.course_end_date,
                status: student.status.label(),
                payment_status: student.payment_status.label(),
                total_fee: student.total_fee,
                amount_paid: student.amount_paid,
                balance: student.balance(),
                progress_percentage: self.fresh_progress(student)?,
            });
        }
        Ok(self.documents.students_sheet(&rows)?)
    }

    pub fn export_payments(&self, reviewer: &Admin) -> Result<DocumentFile, EnrollmentError> {
        let payments = self.payments(reviewer)?;
        let mut rows = Vec::with_capacity(payments.len());
        for payment in &payments {
            let student = self.store.student(payment.student_id)?;
            let (student_number, student_name) = match &student {
                Some(student) => {
                    let name = self
                        .store
                        .application(student.application_id)?
                        .map(|application| application.full_name())
                        .unwrap_or_default();
                    (student.student_number.clone(), name)
                }
                None => Default::default(),
            };
            rows.push(PaymentExportRow {
                id: payment.id.0,
                payment_number: payment.payment_number.clone(),
                student_number,
                student_name,
                amount: payment.amount,
                payment_method: payment.method.label(),
                payment_date: payment.payment_date,
                status: payment.state.label(),
                received_by: self
                    .store
                    .admin(payment.received_by)?
                    .map(|admin| admin.name)
                    .unwrap_or_default(),
                notes: payment.notes.clone(),
            });
        }
        Ok(self.documents.payments_sheet(&rows)?)
    }

    /// Printable single-application summary, permission-checked like the
    /// detail view.
    pub fn export_application_summary(
        &self,
        id: ApplicationId,
        reviewer: &Admin,
    ) -> Result<DocumentFile, EnrollmentError> {
        let application = self.application(id, reviewer)?;
        let row = self.application_row(&application);
        Ok(self.documents.application_summary(&row)?)
    }

    fn application_row(&self, application: &Application) -> ApplicationExportRow {
        ApplicationExportRow {
            id: application.id.0,
            application_number: application.application_number.clone(),
            first_name: application.first_name.clone(),
            last_name: application.last_name.clone(),
            email: application.email.clone(),
            phone: application.phone.clone(),
            date_of_birth: application.date_of_birth,
            gender: match application.gender {
                super::domain::Gender::Male => "male",
                super::domain::Gender::Female => "female",
                super::domain::Gender::Other => "other",
            },
            nrc_number: application.nrc_number.clone(),
            address: application.address.clone(),
            city: application.city.clone(),
            province: application.province.clone(),
            course: self.course_name(application),
            branch: self.branch_name(application.branch_id).unwrap_or_default(),
            status: application.status.label(),
            application_date: application.application_date,
            admin_notes: application.admin_notes.clone(),
        }
    }

    fn course_name(&self, application: &Application) -> String {
        self.store
            .course(application.course_id)
            .ok()
            .flatten()
            .map(|course| course.name)
            .unwrap_or_default()
    }

    pub(super) fn branch_name(&self, id: BranchId) -> Option<String> {
        self.store.branch(id).ok().flatten().map(|branch| branch.name)
    }

    pub(super) fn school(&self) -> &SchoolConfig {
        &self.school
    }

    pub fn branches(&self) -> Result<Vec<Branch>, EnrollmentError> {
        Ok(self.store.branches()?)
    }

    pub fn courses(&self) -> Result<Vec<Course>, EnrollmentError> {
        Ok(self.store.courses()?)
    }
}

fn validate_form(form: &ApplicationForm) -> Result<(), EnrollmentError> {
    let required = [
        ("first_name", &form.first_name),
        ("last_name", &form.last_name),
        ("email", &form.email),
        ("phone", &form.phone),
        ("nrc_number", &form.nrc_number),
        ("address", &form.address),
        ("city", &form.city),
        ("province", &form.province),
        ("emergency_name", &form.emergency_contact.name),
        ("emergency_phone", &form.emergency_contact.phone),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(EnrollmentError::Validation(format!(
                "please fill in the {} field",
                field.replace('_', " ")
            )));
        }
    }
    if !form.email.contains('@') {
        return Err(EnrollmentError::Validation(
            "email address is not valid".to_string(),
        ));
    }
    Ok(())
}
