use std::sync::Mutex;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::domain::{
    progress_percentage, Admin, AdminId, Application, ApplicationForm, ApplicationId,
    ApplicationStatus, Branch, BranchId, Course, CourseId, Lesson, LessonId, LessonStatus, Payment,
    PaymentId, PaymentState, PaymentStatus, PortalAccess, ScopeFilter, Student, StudentId,
    StudentStatus,
};
use super::identifiers;
use super::store::{
    EnrollmentStore, NewAdmin, NewBranch, NewCourse, NewLesson, NewPayment, NewStudent, StoreError,
};

/// Arena-style in-memory store. Rows live in flat vectors keyed by integer id;
/// one mutex is the transactional unit, which is what makes the sequence
/// computations and the `amount_paid` accumulation race-free.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    branches: Vec<Branch>,
    courses: Vec<Course>,
    admins: Vec<Admin>,
    applications: Vec<Application>,
    students: Vec<Student>,
    payments: Vec<Payment>,
    lessons: Vec<Lesson>,
    portal: Vec<PortalAccess>,
}

impl Inner {
    fn applications_in_month(&self, year: i32, month: u32) -> u32 {
        self.applications
            .iter()
            .filter(|row| row.created_at.year() == year && row.created_at.month() == month)
            .count() as u32
    }

    fn payments_in_month(&self, year: i32, month: u32) -> u32 {
        self.payments
            .iter()
            .filter(|row| row.created_at.year() == year && row.created_at.month() == month)
            .count() as u32
    }

    fn fresh_access_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = identifiers::access_code(&mut rng);
            if !self.portal.iter().any(|row| row.access_code == code) {
                return code;
            }
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

impl EnrollmentStore for MemoryStore {
    fn insert_branch(&self, seed: NewBranch) -> Result<Branch, StoreError> {
        let mut inner = self.lock();
        if inner
            .branches
            .iter()
            .any(|row| row.name == seed.name || row.code == seed.code)
        {
            return Err(StoreError::Conflict { field: "branch" });
        }
        let branch = Branch {
            id: BranchId(inner.branches.len() as u32 + 1),
            name: seed.name,
            code: seed.code,
            address: seed.address,
            city: seed.city,
            phone: seed.phone,
            email: seed.email,
            active: true,
        };
        inner.branches.push(branch.clone());
        Ok(branch)
    }

    fn insert_course(&self, seed: NewCourse) -> Result<Course, StoreError> {
        let mut inner = self.lock();
        if inner.courses.iter().any(|row| row.code == seed.code) {
            return Err(StoreError::Conflict { field: "course_code" });
        }
        let course = Course {
            id: CourseId(inner.courses.len() as u32 + 1),
            name: seed.name,
            code: seed.code,
            category: seed.category,
            duration_weeks: seed.duration_weeks,
            total_hours: seed.total_hours,
            fee: seed.fee,
            branch_id: seed.branch_id,
            instructor: seed.instructor,
            active: true,
        };
        inner.courses.push(course.clone());
        Ok(course)
    }

    fn insert_admin(&self, seed: NewAdmin) -> Result<Admin, StoreError> {
        let mut inner = self.lock();
        if inner.admins.iter().any(|row| row.username == seed.username) {
            return Err(StoreError::Conflict { field: "username" });
        }
        let admin = Admin {
            id: AdminId(inner.admins.len() as u32 + 1),
            username: seed.username,
            name: seed.name,
            email: seed.email,
            role: seed.role,
            scope: seed.scope,
            active: true,
            last_login: None,
        };
        inner.admins.push(admin.clone());
        Ok(admin)
    }

    fn branch(&self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        Ok(self.lock().branches.iter().find(|row| row.id == id).cloned())
    }

    fn branches(&self) -> Result<Vec<Branch>, StoreError> {
        Ok(self.lock().branches.clone())
    }

    fn course(&self, id: CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.lock().courses.iter().find(|row| row.id == id).cloned())
    }

    fn courses(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.lock().courses.clone())
    }

    fn admin(&self, id: AdminId) -> Result<Option<Admin>, StoreError> {
        Ok(self.lock().admins.iter().find(|row| row.id == id).cloned())
    }

    fn create_application(
        &self,
        form: ApplicationForm,
        now: NaiveDateTime,
    ) -> Result<Application, StoreError> {
        let mut inner = self.lock();
        if inner
            .applications
            .iter()
            .any(|row| row.nrc_number == form.nrc_number)
        {
            return Err(StoreError::Conflict { field: "nrc_number" });
        }

        let seq = inner.applications_in_month(now.year(), now.month()) + 1;
        let number = identifiers::application_number(now.year(), now.month(), seq);
        if inner
            .applications
            .iter()
            .any(|row| row.application_number == number)
        {
            return Err(StoreError::Conflict {
                field: "application_number",
            });
        }

        let application = Application {
            id: ApplicationId(inner.applications.len() as u32 + 1),
            application_number: number,
            application_date: now.date(),
            status: ApplicationStatus::Pending,
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            phone: form.phone.clone(),
            whatsapp: form.whatsapp.or(Some(form.phone)),
            date_of_birth: form.date_of_birth,
            gender: form.gender,
            nrc_number: form.nrc_number,
            address: form.address,
            city: form.city,
            province: form.province,
            course_id: form.course_id,
            branch_id: form.branch_id,
            preferred_schedule: form.preferred_schedule,
            preferred_language: form
                .preferred_language
                .unwrap_or_else(|| "English".to_string()),
            education_level: form.education_level,
            previous_experience: form.previous_experience,
            medical_conditions: form.medical_conditions,
            emergency_contact: form.emergency_contact,
            reviewed_by: None,
            reviewed_at: None,
            admin_notes: None,
            documents: form.documents,
            created_at: now,
        };
        inner.applications.push(application.clone());
        Ok(application)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    fn application_by_number(&self, number: &str) -> Result<Option<Application>, StoreError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .find(|row| row.application_number == number)
            .cloned())
    }

    fn applications(&self, scope: ScopeFilter) -> Result<Vec<Application>, StoreError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .filter(|row| scope.admits(row.branch_id))
            .cloned()
            .collect())
    }

    fn update_application(&self, application: Application) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let slot = inner
            .applications
            .iter_mut()
            .find(|row| row.id == application.id)
            .ok_or(StoreError::NotFound)?;
        *slot = application;
        Ok(())
    }

    fn accept_application(
        &self,
        application: Application,
        seed: NewStudent,
        now: NaiveDateTime,
    ) -> Result<(Application, Student), StoreError> {
        let mut inner = self.lock();
        if inner
            .students
            .iter()
            .any(|row| row.application_id == seed.application_id)
        {
            return Err(StoreError::Conflict {
                field: "application_id",
            });
        }

        let prefix = identifiers::student_number_prefix(now.year(), now.month());
        let seq = identifiers::next_student_seq(
            inner.students.iter().map(|row| row.student_number.as_str()),
            &prefix,
        );
        let student = Student {
            id: StudentId(inner.students.len() as u32 + 1),
            student_number: identifiers::student_number(now.year(), now.month(), seq),
            application_id: seed.application_id,
            enrollment_date: seed.enrollment_date,
            course_start_date: seed.course_start_date,
            course_end_date: seed.course_end_date,
            status: StudentStatus::Active,
            progress_percentage: 0,
            last_assessment_score: None,
            total_fee: seed.total_fee,
            amount_paid: Decimal::ZERO,
            payment_status: PaymentStatus::derive(Decimal::ZERO, seed.total_fee),
            course_id: seed.course_id,
            branch_id: seed.branch_id,
            assigned_instructor: seed.assigned_instructor,
            created_by: seed.created_by,
            created_at: now,
        };

        let slot = inner
            .applications
            .iter_mut()
            .find(|row| row.id == application.id)
            .ok_or(StoreError::NotFound)?;
        *slot = application.clone();
        inner.students.push(student.clone());
        Ok((application, student))
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.lock().students.iter().find(|row| row.id == id).cloned())
    }

    fn student_by_number(&self, number: &str) -> Result<Option<Student>, StoreError> {
        Ok(self
            .lock()
            .students
            .iter()
            .find(|row| row.student_number == number)
            .cloned())
    }

    fn students(&self, scope: ScopeFilter) -> Result<Vec<Student>, StoreError> {
        Ok(self
            .lock()
            .students
            .iter()
            .filter(|row| scope.admits(row.branch_id))
            .cloned()
            .collect())
    }

    fn update_student(&self, student: Student) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let slot = inner
            .students
            .iter_mut()
            .find(|row| row.id == student.id)
            .ok_or(StoreError::NotFound)?;
        *slot = student;
        Ok(())
    }

    fn record_payment(
        &self,
        seed: NewPayment,
        now: NaiveDateTime,
    ) -> Result<(Payment, Student), StoreError> {
        let mut inner = self.lock();
        let seq = inner.payments_in_month(now.year(), now.month()) + 1;
        let number = identifiers::payment_number(now.year(), now.month(), seed.student_id, seq);

        let payment = Payment {
            id: PaymentId(inner.payments.len() as u32 + 1),
            payment_number: number,
            student_id: seed.student_id,
            amount: seed.amount,
            method: seed.method,
            state: PaymentState::Completed,
            payment_date: seed.payment_date,
            received_date: now.date(),
            received_by: seed.received_by,
            verified_by: None,
            notes: seed.notes,
            created_at: now,
        };

        let student = inner
            .students
            .iter_mut()
            .find(|row| row.id == seed.student_id)
            .ok_or(StoreError::NotFound)?;
        student.amount_paid += payment.amount;
        student.payment_status = PaymentStatus::derive(student.amount_paid, student.total_fee);
        let student = student.clone();

        inner.payments.push(payment.clone());
        Ok((payment, student))
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.lock().payments.iter().find(|row| row.id == id).cloned())
    }

    fn payments(&self, scope: ScopeFilter) -> Result<Vec<Payment>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .payments
            .iter()
            .filter(|row| {
                inner
                    .students
                    .iter()
                    .find(|student| student.id == row.student_id)
                    .is_some_and(|student| scope.admits(student.branch_id))
            })
            .cloned()
            .collect())
    }

    fn payments_for(&self, student: StudentId) -> Result<Vec<Payment>, StoreError> {
        Ok(self
            .lock()
            .payments
            .iter()
            .filter(|row| row.student_id == student)
            .cloned()
            .collect())
    }

    fn verify_payment(&self, id: PaymentId, verifier: AdminId) -> Result<Payment, StoreError> {
        let mut inner = self.lock();
        let payment = inner
            .payments
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound)?;
        payment.verified_by = Some(verifier);
        Ok(payment.clone())
    }

    fn schedule_lesson(&self, seed: NewLesson) -> Result<Lesson, StoreError> {
        let mut inner = self.lock();
        if inner.lessons.iter().any(|row| {
            row.student_id == seed.student_id
                && row.scheduled_date == seed.scheduled_date
                && row.scheduled_time == seed.scheduled_time
        }) {
            return Err(StoreError::Conflict {
                field: "lesson_slot",
            });
        }
        let lesson = Lesson {
            id: LessonId(inner.lessons.len() as u32 + 1),
            student_id: seed.student_id,
            instructor_id: seed.instructor_id,
            scheduled_date: seed.scheduled_date,
            scheduled_time: seed.scheduled_time,
            status: LessonStatus::Scheduled,
            score: None,
            completion_date: None,
        };
        inner.lessons.push(lesson.clone());
        Ok(lesson)
    }

    fn lesson(&self, id: LessonId) -> Result<Option<Lesson>, StoreError> {
        Ok(self.lock().lessons.iter().find(|row| row.id == id).cloned())
    }

    fn complete_lesson(
        &self,
        id: LessonId,
        score: Option<u8>,
        completed_on: NaiveDate,
    ) -> Result<(Lesson, Student), StoreError> {
        let mut inner = self.lock();
        let lesson = inner
            .lessons
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound)?;
        lesson.status = LessonStatus::Completed;
        lesson.score = score;
        lesson.completion_date = Some(completed_on);
        let lesson = lesson.clone();

        let total = inner
            .lessons
            .iter()
            .filter(|row| row.student_id == lesson.student_id)
            .count();
        let completed = inner
            .lessons
            .iter()
            .filter(|row| {
                row.student_id == lesson.student_id && row.status == LessonStatus::Completed
            })
            .count();

        let student = inner
            .students
            .iter_mut()
            .find(|row| row.id == lesson.student_id)
            .ok_or(StoreError::NotFound)?;
        student.progress_percentage = progress_percentage(completed, total);
        if score.is_some() {
            student.last_assessment_score = score;
        }
        Ok((lesson, student.clone()))
    }

    fn lessons_for(&self, student: StudentId) -> Result<Vec<Lesson>, StoreError> {
        Ok(self
            .lock()
            .lessons
            .iter()
            .filter(|row| row.student_id == student)
            .cloned()
            .collect())
    }

    fn create_portal_access(
        &self,
        student: StudentId,
        email: String,
        phone: String,
        now: NaiveDateTime,
    ) -> Result<PortalAccess, StoreError> {
        let mut inner = self.lock();
        if inner.portal.iter().any(|row| row.student_id == student) {
            return Err(StoreError::Conflict { field: "student_id" });
        }
        let access = PortalAccess {
            id: inner.portal.len() as u32 + 1,
            student_id: student,
            access_code: inner.fresh_access_code(),
            email,
            phone,
            created_at: now,
            last_login: None,
            login_count: 0,
            active: true,
        };
        inner.portal.push(access.clone());
        Ok(access)
    }

    fn portal_access_for(&self, student: StudentId) -> Result<Option<PortalAccess>, StoreError> {
        Ok(self
            .lock()
            .portal
            .iter()
            .find(|row| row.student_id == student)
            .cloned())
    }

    fn update_portal_access(&self, access: PortalAccess) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let slot = inner
            .portal
            .iter_mut()
            .find(|row| row.id == access.id)
            .ok_or(StoreError::NotFound)?;
        *slot = access;
        Ok(())
    }

    fn regenerate_access_code(&self, student: StudentId) -> Result<PortalAccess, StoreError> {
        let mut inner = self.lock();
        let code = inner.fresh_access_code();
        let access = inner
            .portal
            .iter_mut()
            .find(|row| row.student_id == student)
            .ok_or(StoreError::NotFound)?;
        access.access_code = code;
        Ok(access.clone())
    }
}
