//! Student self-service portal: registration against verified application
//! identity, access-code login, and the combined dashboard read.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::documents::DocumentGenerator;
use super::domain::{Admin, LessonStatus, PortalAccess, StudentId};
use super::notifier::{Notification, Notifier};
use super::service::{EnrollmentError, EnrollmentService};
use super::store::EnrollmentStore;
use super::views::PortalDashboard;

/// Inbound portal registration payload. Every field doubles as an identity
/// verification factor against the student's original application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalRegistration {
    pub student_number: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalLogin {
    pub student_number: String,
    pub access_code: String,
}

impl<S, N, D> EnrollmentService<S, N, D>
where
    S: EnrollmentStore + 'static,
    N: Notifier + 'static,
    D: DocumentGenerator + 'static,
{
    /// Register portal access after verifying the supplied email, phone, and
    /// date of birth against the application record. Any mismatch reads as
    /// not-found so the endpoint leaks nothing about which factor failed.
    pub fn register_portal(
        &self,
        registration: PortalRegistration,
        now: NaiveDateTime,
    ) -> Result<PortalAccess, EnrollmentError> {
        let student = self
            .store()
            .student_by_number(&registration.student_number)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        let application = self
            .store()
            .application(student.application_id)?
            .ok_or(EnrollmentError::NotFound("student"))?;

        let matches = application.email.eq_ignore_ascii_case(&registration.email)
            && application.phone == registration.phone
            && application.date_of_birth == registration.date_of_birth;
        if !matches {
            return Err(EnrollmentError::NotFound("student"));
        }

        let access = match self.store().portal_access_for(student.id)? {
            Some(existing) if existing.active => {
                return Err(EnrollmentError::Conflict {
                    field: "portal_access",
                })
            }
            // Reactivation gets a fresh code; the old one stays dead.
            Some(mut existing) => {
                let regenerated = self.store().regenerate_access_code(student.id)?;
                existing.access_code = regenerated.access_code;
                existing.active = true;
                existing.email = registration.email.clone();
                existing.phone = registration.phone.clone();
                self.store().update_portal_access(existing.clone())?;
                existing
            }
            None => self.store().create_portal_access(
                student.id,
                registration.email.clone(),
                registration.phone.clone(),
                now,
            )?,
        };

        self.send_portal_welcome(&application.first_name, &access);
        Ok(access)
    }

    fn send_portal_welcome(&self, first_name: &str, access: &PortalAccess) {
        let message = Notification::new(
            access.email.clone(),
            format!("Your Student Portal Access - {}", self.school().name),
            format!(
                "Dear {first_name},\n\nYour student portal is ready. \
                 Log in with your student number and this access code: {}\n\n\
                 Keep the code private; anyone holding it can view your records.",
                access.access_code
            ),
        );
        if let Err(error) = self.notifier().send(message) {
            tracing::warn!(
                %error,
                student = %access.student_id,
                action = "register_portal",
                "portal welcome delivery failed"
            );
        }
    }

    /// Exchange a student number and access code for the student id, bumping
    /// the login bookkeeping on success.
    pub fn portal_login(
        &self,
        login: &PortalLogin,
        now: NaiveDateTime,
    ) -> Result<StudentId, EnrollmentError> {
        let student = self
            .store()
            .student_by_number(&login.student_number)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        let mut access = self
            .store()
            .portal_access_for(student.id)?
            .filter(|access| access.active)
            .ok_or(EnrollmentError::NotFound("student"))?;
        if access.access_code != login.access_code.trim().to_uppercase() {
            return Err(EnrollmentError::Permission(
                "invalid access code".to_string(),
            ));
        }

        access.last_login = Some(now);
        access.login_count += 1;
        self.store().update_portal_access(access)?;
        Ok(student.id)
    }

    /// Assemble the full portal dashboard in one read. Progress comes from
    /// lesson counts at read time, not the stored snapshot.
    pub fn portal_dashboard(
        &self,
        login: &PortalLogin,
        now: NaiveDateTime,
    ) -> Result<PortalDashboard, EnrollmentError> {
        let student_id = self.portal_login(login, now)?;
        let student = self
            .store()
            .student(student_id)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        let application = self
            .store()
            .application(student.application_id)?
            .ok_or(EnrollmentError::NotFound("student"))?;
        let lessons = self.store().lessons_for(student.id)?;
        let mut payments = self.store().payments_for(student.id)?;
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        payments.truncate(5);

        let total_lessons = lessons.len();
        let completed_lessons = lessons
            .iter()
            .filter(|lesson| lesson.status == LessonStatus::Completed)
            .count();
        let today = now.date();
        let mut upcoming: Vec<_> = lessons
            .into_iter()
            .filter(|lesson| {
                lesson.status == LessonStatus::Scheduled && lesson.scheduled_date >= today
            })
            .collect();
        upcoming.sort_by_key(|lesson| (lesson.scheduled_date, lesson.scheduled_time));

        let course_name = self
            .store()
            .course(student.course_id)?
            .map(|course| course.name)
            .unwrap_or_default();

        Ok(PortalDashboard {
            balance: student.balance(),
            progress_percentage: self.fresh_progress(&student)?,
            full_name: application.full_name(),
            course_name,
            branch_name: self.branch_name(student.branch_id).unwrap_or_default(),
            student,
            recent_payments: payments,
            upcoming_lessons: upcoming,
            completed_lessons,
            total_lessons,
        })
    }

    /// Admin-side issuance of portal access without the self-service identity
    /// factors; branch permission applies instead.
    pub fn grant_portal_access(
        &self,
        student_id: StudentId,
        granter: &Admin,
        now: NaiveDateTime,
    ) -> Result<PortalAccess, EnrollmentError> {
        let student = self.student(student_id, granter)?;
        let application = self
            .store()
            .application(student.application_id)?
            .ok_or(EnrollmentError::NotFound("application"))?;

        let access = match self.store().portal_access_for(student.id)? {
            Some(existing) if existing.active => {
                return Err(EnrollmentError::Conflict {
                    field: "portal_access",
                })
            }
            Some(mut existing) => {
                let regenerated = self.store().regenerate_access_code(student.id)?;
                existing.access_code = regenerated.access_code;
                existing.active = true;
                self.store().update_portal_access(existing.clone())?;
                existing
            }
            None => self.store().create_portal_access(
                student.id,
                application.email.clone(),
                application.phone.clone(),
                now,
            )?,
        };
        self.send_portal_welcome(&application.first_name, &access);
        Ok(access)
    }

    /// Invalidate the current code and issue a new one.
    pub fn reset_portal_code(
        &self,
        student_id: StudentId,
        granter: &Admin,
    ) -> Result<PortalAccess, EnrollmentError> {
        let student = self.student(student_id, granter)?;
        let access = self.store().regenerate_access_code(student.id)?;
        if let Ok(Some(application)) = self.store().application(student.application_id) {
            self.send_portal_welcome(&application.first_name, &access);
        }
        Ok(access)
    }

    pub fn disable_portal_access(
        &self,
        student_id: StudentId,
        granter: &Admin,
    ) -> Result<(), EnrollmentError> {
        let student = self.student(student_id, granter)?;
        let mut access = self
            .store()
            .portal_access_for(student.id)?
            .ok_or(EnrollmentError::NotFound("portal access"))?;
        access.active = false;
        self.store().update_portal_access(access)?;
        Ok(())
    }
}
