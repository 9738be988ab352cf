use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use super::clock::Clock;
use super::collaborators::{Mailer, MailerError};

/// Codes stay verifiable for ten minutes after issue.
pub const CODE_TTL_MINUTES: i64 = 10;

const CODE_SPACE: u32 = 1_000_000;

/// Lifecycle state of the code for one email. Absence from the map is the
/// NoCode state; `Consumed` is terminal for a code instance and only a fresh
/// send leaves it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CodeState {
    Sent {
        code_hash: [u8; 32],
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        attempts: u32,
    },
    Consumed {
        verified_at: DateTime<Utc>,
    },
}

/// Issues, verifies, and expires one-time verification codes.
///
/// At most one live code exists per email: a resend overwrites, a successful
/// verification consumes, and a failed delivery leaves no code at all. Only
/// the SHA-256 hash of a code is ever retained.
pub struct OtpService<M> {
    mailer: Arc<M>,
    clock: Arc<Clock>,
    ttl: Duration,
    codes: Mutex<HashMap<String, CodeState>>,
}

impl<M: Mailer> OtpService<M> {
    pub fn new(mailer: Arc<M>, clock: Arc<Clock>) -> Self {
        OtpService {
            mailer,
            clock,
            ttl: Duration::minutes(CODE_TTL_MINUTES),
            codes: Mutex::new(HashMap::new()),
        }
    }

    /// Generates a fresh six-digit code, delivers it, and records its hash
    /// with the expiry.
    ///
    /// Fail-closed: any previously live code is invalidated before the
    /// delivery attempt, so a failed send never leaves a verifiable code the
    /// candidate was never told about.
    pub async fn send(&self, email: &str) -> Result<(), MailerError> {
        let code = generate_code();

        self.codes
            .lock()
            .expect("otp mutex poisoned")
            .remove(email);

        self.mailer.send_code(email, &code).await?;

        let issued_at = self.clock.now();
        self.codes.lock().expect("otp mutex poisoned").insert(
            email.to_string(),
            CodeState::Sent {
                code_hash: hash_code(&code),
                issued_at,
                expires_at: issued_at + self.ttl,
                attempts: 0,
            },
        );
        Ok(())
    }

    /// Checks a candidate code. False for a missing record, a consumed
    /// record, an expired record, or a hash mismatch; no distinction is
    /// surfaced. A match consumes the record so it verifies at most once.
    pub fn verify(&self, email: &str, candidate_code: &str) -> bool {
        let now = self.clock.now();
        let mut codes = self.codes.lock().expect("otp mutex poisoned");

        let mut verified = false;
        if let Some(CodeState::Sent {
            code_hash,
            expires_at,
            attempts,
            ..
        }) = codes.get_mut(email)
        {
            if now > *expires_at {
                // Expired records stay for the sweep; verification just fails.
            } else if *code_hash == hash_code(candidate_code) {
                verified = true;
            } else {
                *attempts += 1;
            }
        }

        if verified {
            codes.insert(
                email.to_string(),
                CodeState::Consumed { verified_at: now },
            );
        }
        verified
    }

    /// Reclaims expired codes and spent markers. Returns how many entries
    /// were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut codes = self.codes.lock().expect("otp mutex poisoned");
        let before = codes.len();
        codes.retain(|_, state| match state {
            CodeState::Sent { expires_at, .. } => now <= *expires_at,
            CodeState::Consumed { .. } => false,
        });
        before - codes.len()
    }

    #[cfg(test)]
    pub(crate) fn tracked_emails(&self) -> usize {
        self.codes.lock().expect("otp mutex poisoned").len()
    }
}

fn generate_code() -> String {
    let value = rand::thread_rng().gen_range(0..CODE_SPACE);
    format!("{value:06}")
}

fn hash_code(code: &str) -> [u8; 32] {
    Sha256::digest(code.as_bytes()).into()
}
