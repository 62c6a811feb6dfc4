use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

const TOKEN_PREFIX: &str = "tkt";
const TOKEN_VERSION: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a verified QR token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrClaims {
    pub ticket_id: Uuid,
    pub event_id: Uuid,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QrError {
    #[error("QR payload is malformed")]
    Malformed,
    #[error("QR signature does not match")]
    BadSignature,
}

/// Verifies (and issues) HMAC-SHA256 signed ticket tokens of the form
/// `tkt.v1.<ticket_id>.<event_id>.<hex signature>`.
pub struct QrVerifier {
    secret: String,
}

impl QrVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, ticket_id: Uuid, event_id: Uuid) -> String {
        let signature = self.sign(&signing_payload(ticket_id, event_id));
        format!("{TOKEN_PREFIX}.{TOKEN_VERSION}.{ticket_id}.{event_id}.{signature}")
    }

    pub fn verify(&self, raw: &str) -> Result<QrClaims, QrError> {
        let parts: Vec<&str> = raw.trim().split('.').collect();
        if parts.len() != 5 || parts[0] != TOKEN_PREFIX || parts[1] != TOKEN_VERSION {
            return Err(QrError::Malformed);
        }
        let ticket_id = Uuid::parse_str(parts[2]).map_err(|_| QrError::Malformed)?;
        let event_id = Uuid::parse_str(parts[3]).map_err(|_| QrError::Malformed)?;

        let expected = self.sign(&signing_payload(ticket_id, event_id));
        if !eq_constant_time(&expected, parts[4]) {
            return Err(QrError::BadSignature);
        }

        Ok(QrClaims {
            ticket_id,
            event_id,
        })
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(payload.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

fn signing_payload(ticket_id: Uuid, event_id: Uuid) -> String {
    format!("{TOKEN_PREFIX}|{TOKEN_VERSION}|{ticket_id}|{event_id}")
}

fn eq_constant_time(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> QrVerifier {
        QrVerifier::new("test-secret")
    }

    #[test]
    fn issued_tokens_verify() {
        let ticket_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let token = verifier().issue(ticket_id, event_id);

        let claims = verifier().verify(&token).expect("verify issued token");
        assert_eq!(claims.ticket_id, ticket_id);
        assert_eq!(claims.event_id, event_id);
    }

    #[test]
    fn signature_is_hex_sha256() {
        let token = verifier().issue(Uuid::new_v4(), Uuid::new_v4());
        let signature = token.rsplit('.').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn tampered_ids_are_rejected() {
        let ticket_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let token = verifier().issue(ticket_id, event_id);

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[3] = Uuid::new_v4().to_string();
        let forged = parts.join(".");

        assert_eq!(verifier().verify(&forged), Err(QrError::BadSignature));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = verifier().issue(Uuid::new_v4(), Uuid::new_v4());
        let other = QrVerifier::new("another-secret");
        assert_eq!(other.verify(&token), Err(QrError::BadSignature));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let v = verifier();
        assert_eq!(v.verify(""), Err(QrError::Malformed));
        assert_eq!(v.verify("tkt.v1.not-a-uuid"), Err(QrError::Malformed));
        assert_eq!(
            v.verify("tkt.v2.00000000-0000-0000-0000-000000000000.00000000-0000-0000-0000-000000000000.abc"),
            Err(QrError::Malformed)
        );
        assert_eq!(
            v.verify("tkt.v1.not-a-uuid.00000000-0000-0000-0000-000000000000.abc"),
            Err(QrError::Malformed)
        );
    }
}
