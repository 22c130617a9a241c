pub mod seed;

use std::borrow::Cow;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::errors::{AppError, AppResult};

// ── Password helpers ──────────────────────────────────────────

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt    = SaltString::generate(&mut OsRng);
    let argon2  = Argon2::default();
    let hash    = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// `Err(Unauthorized)` on a wrong password; `Err(Internal)` on a corrupt hash.
pub fn verify_password(password: &str, hash: &str) -> AppResult<()> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid hash: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)
}

// ── Registration form ─────────────────────────────────────────

pub const PHONE_DIGITS: usize = 10;

pub const MSG_EMAIL_TAKEN: &str = "อีเมลนี้ถูกใช้แล้ว!";
const MSG_PHONE: &str = "กรุณากรอกเบอร์โทรศัพท์ของคุณให้ครบ 10 หลัก";

/// Field order in which validation messages are reported.
const REGISTER_FIELDS: [&str; 6] = [
    "user_email", "user_fname", "user_lname", "user_phone", "user_pass", "user_cpass",
];

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[serde(default)]
    #[validate(email(message = "ที่อยู่อีเมลไม่ถูกต้อง!"))]
    pub user_email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "กรุณากรอกชื่อ"))]
    pub user_fname: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "กรุณากรอกนามสกุล"))]
    pub user_lname: String,
    #[serde(default)]
    #[validate(custom(function = "validate_phone"))]
    pub user_phone: String,
    #[serde(default)]
    pub user_dob: String,
    #[serde(default)]
    pub user_gender: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "รหัสผ่านต้องมีความยาวอย่างน้อย 6 ตัวอักษร"))]
    pub user_pass: String,
    #[serde(default)]
    #[validate(must_match(other = "user_pass", message = "รหัสผ่านและยืนยันรหัสผ่านไม่ตรงกัน"))]
    pub user_cpass: String,
}

/// What the register page echoes back after a failed submit. Passwords are
/// never echoed.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterEcho {
    pub user_email:  String,
    pub user_fname:  String,
    pub user_lname:  String,
    pub user_phone:  String,
    pub user_dob:    String,
    pub user_gender: String,
}

impl RegisterForm {
    /// Trim every field, as the form inputs are free text.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.user_email,
            &mut self.user_fname,
            &mut self.user_lname,
            &mut self.user_phone,
            &mut self.user_dob,
            &mut self.user_gender,
            &mut self.user_pass,
            &mut self.user_cpass,
        ] {
            *field = field.trim().to_owned();
        }
        self
    }

    /// Messages for every failed rule, in form order. Empty when valid.
    pub fn problems(&self) -> Vec<String> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => ordered_messages(&errors, &REGISTER_FIELDS),
        }
    }

    /// Whether the email is well-formed enough to be worth looking up.
    pub fn email_is_valid(&self) -> bool {
        self.user_email.validate_email()
    }

    pub fn date_of_birth(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.user_dob, "%Y-%m-%d").ok()
    }

    pub fn gender(&self) -> Option<String> {
        Some(self.user_gender.clone()).filter(|g| !g.is_empty())
    }

    pub fn echo(&self) -> RegisterEcho {
        RegisterEcho {
            user_email:  self.user_email.clone(),
            user_fname:  self.user_fname.clone(),
            user_lname:  self.user_lname.clone(),
            user_phone:  self.user_phone.clone(),
            user_dob:    self.user_dob.clone(),
            user_gender: self.user_gender.clone(),
        }
    }
}

// ── Login form ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "กรุณากรอกรหัสผ่าน"))]
    pub user_pass: String,
}

impl LoginForm {
    pub fn normalized(mut self) -> Self {
        self.user_email = self.user_email.trim().to_owned();
        self.user_pass = self.user_pass.trim().to_owned();
        self
    }

    pub fn problems(&self) -> Vec<String> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => ordered_messages(&errors, &["user_email", "user_pass"]),
        }
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_phone_number(phone) {
        return Ok(());
    }
    let mut err = ValidationError::new("phone");
    err.message = Some(Cow::Borrowed(MSG_PHONE));
    Err(err)
}

pub fn is_phone_number(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.chars().all(|c| c.is_ascii_digit())
}

fn ordered_messages(errors: &ValidationErrors, order: &[&str]) -> Vec<String> {
    let by_field = errors.field_errors();
    order
        .iter()
        .filter_map(|field| by_field.get(*field))
        .flat_map(|errs| errs.iter())
        .map(|e| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string())
        })
        .collect()
}
