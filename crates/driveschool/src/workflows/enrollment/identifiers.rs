//! Human-readable identifier formats with an embedded period and sequence.
//!
//! Formatting is pure; the store calls these under the same lock that performs
//! the insert so sequences stay collision-free under concurrent requests.

use rand::Rng;

use super::domain::StudentId;

/// `APP-{year}-{month:02}-{seq:04}`, seq = applications already created this month + 1.
pub fn application_number(year: i32, month: u32, seq: u32) -> String {
    format!("APP-{year}-{month:02}-{seq:04}")
}

/// `{year}{month:02}{seq:03}`. The month prefix shared by all students enrolled
/// in the same period.
pub fn student_number(year: i32, month: u32, seq: u32) -> String {
    format!("{year}{month:02}{seq:03}")
}

/// Month prefix used to scan existing student numbers.
pub fn student_number_prefix(year: i32, month: u32) -> String {
    format!("{year}{month:02}")
}

/// Scan-and-increment scheme: the next 3-digit suffix after the highest one
/// already issued under `prefix`. Malformed suffixes are skipped.
pub fn next_student_seq<'a>(existing: impl Iterator<Item = &'a str>, prefix: &str) -> u32 {
    existing
        .filter_map(|number| number.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .map_or(1, |last| last + 1)
}

/// `PAY-{year}{month:02}{student_id:03}-{seq:03}`, seq = payments created this month + 1.
pub fn payment_number(year: i32, month: u32, student: StudentId, seq: u32) -> String {
    format!("PAY-{year}{month:02}{:03}-{seq:03}", student.0)
}

/// 8-character portal access code: 4 uppercase letters, 3 digits, 1 letter.
/// Callers resample on collision against the store.
pub fn access_code<R: Rng>(rng: &mut R) -> String {
    const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"0123456789";

    let mut code = String::with_capacity(8);
    for _ in 0..4 {
        code.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
    }
    for _ in 0..3 {
        code.push(DIGITS[rng.gen_range(0..DIGITS.len())] as char);
    }
    code.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
    code
}
