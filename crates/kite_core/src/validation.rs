//! crates/kite_core/src/validation.rs
//!
//! Field-keyed validation that collects every violation instead of stopping
//! at the first one.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::domain::Difficulty;
use crate::tokens::TOKEN_PLAINTEXT_LENGTH;

/// Longest word text accepted, in characters.
pub const MAX_WORD_TEXT_CHARS: usize = 255;

/// Accumulates `field -> message` pairs. Only the first message per field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn into_errors(self) -> BTreeMap<String, String> {
        self.errors
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_RX: OnceLock<Regex> = OnceLock::new();
    EMAIL_RX.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        )
        .expect("email pattern is a valid regex")
    })
}

/// Checks the client-supplied word fields and parses the difficulty.
///
/// Returns the difficulty only when it is one of the known values; every
/// problem found is recorded in `v`.
pub fn validate_word(v: &mut Validator, text: &str, difficulty: &str, user_id: i64) -> Option<Difficulty> {
    v.check(!text.trim().is_empty(), "text", "must be provided");
    v.check(
        text.chars().count() <= MAX_WORD_TEXT_CHARS,
        "text",
        "must not be more than 255 characters long",
    );

    let parsed = difficulty.parse::<Difficulty>().ok();
    v.check(
        parsed.is_some(),
        "difficulty",
        "must be one of: easy, medium, hard",
    );

    v.check(user_id > 0, "user_id", "must be a valid user id");
    parsed
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(
        email_regex().is_match(email),
        "email",
        "must be a valid email address",
    );
}

pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(password.len() >= 8, "password", "must be at least 8 bytes long");
    v.check(password.len() <= 72, "password", "must not be more than 72 bytes long");
}

pub fn validate_token_plaintext(v: &mut Validator, token: &str) {
    v.check(!token.is_empty(), "token", "must be provided");
    v.check(
        token.len() == TOKEN_PLAINTEXT_LENGTH,
        "token",
        "must be 26 bytes long",
    );
}
