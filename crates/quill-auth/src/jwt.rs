//! Signed identity tokens
//!
//! Tokens are compact JWS strings (`header.payload.signature`) signed with
//! HMAC-SHA256. The accepted algorithm is fixed here and never taken from
//! the token itself.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use quill_db::UserRole;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::{AuthError, ValidationError, ValidationErrorKind};

/// The only signing algorithm this service issues or accepts
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Secrets shorter than the HMAC-SHA256 block output are accepted but weak
const MIN_SECRET_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User role
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

/// Identity carried by a token that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIdentity {
    pub subject_id: i64,
    pub role: UserRole,
}

/// Issues and validates identity tokens
///
/// Built once at startup from immutable configuration and shared behind an
/// `Arc`; it holds no mutable state.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    default_ttl_secs: i64,
}

impl TokenCodec {
    /// Create a new token codec
    pub fn new(secret: &str, issuer: &str, default_ttl_secs: i64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "token signing secret is missing".to_string(),
            ));
        }
        if issuer.is_empty() {
            return Err(AuthError::Configuration("token issuer is empty".to_string()));
        }
        if default_ttl_secs <= 0 {
            return Err(AuthError::Configuration(format!(
                "token ttl must be positive, got {}",
                default_ttl_secs
            )));
        }
        if secret.len() < MIN_SECRET_LEN {
            warn!(
                "Token signing secret is shorter than {} bytes; use a longer random secret",
                MIN_SECRET_LEN
            );
        }

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        // Expiry is checked against the caller-supplied clock in `validate_at`.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "iat", "exp", "iss"]);
        validation.set_issuer(&[issuer]);

        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: issuer.to_string(),
            default_ttl_secs,
        })
    }

    /// Lifetime used for tokens issued at login
    pub fn default_ttl(&self) -> i64 {
        self.default_ttl_secs
    }

    /// Issue a token for a subject, valid for `ttl_secs` from now
    pub fn issue(&self, subject_id: i64, role: UserRole, ttl_secs: i64) -> Result<String, AuthError> {
        self.issue_at(Utc::now(), subject_id, role, ttl_secs)
    }

    /// Issue a token as of the given instant
    pub fn issue_at(
        &self,
        now: DateTime<Utc>,
        subject_id: i64,
        role: UserRole,
        ttl_secs: i64,
    ) -> Result<String, AuthError> {
        if ttl_secs <= 0 {
            return Err(AuthError::Configuration(format!(
                "token ttl must be positive, got {}",
                ttl_secs
            )));
        }

        let iat = now.timestamp();
        let exp = iat.checked_add(ttl_secs).ok_or_else(|| {
            AuthError::Configuration(format!("token ttl {} is out of range", ttl_secs))
        })?;

        let claims = Claims {
            sub: subject_id.to_string(),
            role,
            iat,
            exp,
            iss: self.issuer.clone(),
        };

        debug!("Issuing token for subject {} ({})", subject_id, role);

        encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Validate a token and return the identity it carries
    pub fn validate(&self, token: &str) -> Result<TokenIdentity, ValidationError> {
        self.validate_at(Utc::now(), token)
    }

    /// Validate a token as of the given instant
    ///
    /// The integrity tag is checked before any part of the token is parsed,
    /// so any change to the signed bytes is reported as
    /// [`ValidationErrorKind::TamperedPayload`].
    pub fn validate_at(
        &self,
        now: DateTime<Utc>,
        token: &str,
    ) -> Result<TokenIdentity, ValidationError> {
        let (signing_input, signature) =
            split_token(token).ok_or(ValidationErrorKind::MalformedToken)?;

        self.verify_signature(signing_input, signature)?;

        let header = decode_header(token).map_err(|_| ValidationErrorKind::MalformedToken)?;
        if header.alg != TOKEN_ALGORITHM {
            debug!("Rejecting token signed with {:?}", header.alg);
            return Err(ValidationErrorKind::MalformedToken.into());
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Token claims rejected: {}", e);
                ValidationErrorKind::MalformedToken
            })?
            .claims;

        let subject_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| ValidationErrorKind::MalformedToken)?;

        if now.timestamp() >= claims.exp {
            return Err(ValidationErrorKind::Expired.into());
        }

        Ok(TokenIdentity {
            subject_id,
            role: claims.role,
        })
    }

    /// Constant-time check of the HMAC-SHA256 tag over `header.payload`
    fn verify_signature(&self, signing_input: &str, signature: &str) -> Result<(), ValidationError> {
        let tag = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| ValidationErrorKind::TamperedPayload)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| ValidationErrorKind::TamperedPayload)?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| ValidationErrorKind::TamperedPayload.into())
    }
}

/// Split a compact token into its signing input and signature segment
fn split_token(token: &str) -> Option<(&str, &str)> {
    let (signing_input, signature) = token.rsplit_once('.')?;
    let (header, payload) = signing_input.split_once('.')?;
    if header.is_empty() || payload.is_empty() || signature.is_empty() || payload.contains('.') {
        return None;
    }
    Some((signing_input, signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-with-at-least-32-bytes";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, "quill", 3600).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn kind(result: Result<TokenIdentity, ValidationError>) -> ValidationErrorKind {
        result.unwrap_err().kind()
    }

    /// Sign arbitrary header/claims JSON with the codec's key
    fn forge(codec: &TokenCodec, header_json: &str, claims_json: &str) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let mut mac = HmacSha256::new_from_slice(&codec.secret).unwrap();
        mac.update(signing_input.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", signing_input, tag)
    }

    #[test]
    fn test_token_issue_and_validate() {
        let codec = codec();
        let now = at(1_700_000_000);

        let token = codec.issue_at(now, 42, UserRole::User, 60).unwrap();
        let identity = codec.validate_at(now, &token).unwrap();
        assert_eq!(identity, TokenIdentity { subject_id: 42, role: UserRole::User });

        let admin = codec.issue_at(now, 7, UserRole::Admin, 60).unwrap();
        assert_eq!(codec.validate_at(at(1_700_000_059), &admin).unwrap().role, UserRole::Admin);
    }

    #[test]
    fn test_wall_clock_round_trip() {
        let codec = codec();
        let token = codec.issue(5, UserRole::User, codec.default_ttl()).unwrap();
        assert_eq!(codec.validate(&token).unwrap().subject_id, 5);
    }

    #[test]
    fn test_token_expires_at_ttl() {
        let codec = codec();
        let issued = 1_700_000_000;
        let token = codec.issue_at(at(issued), 1, UserRole::User, 30).unwrap();

        assert!(codec.validate_at(at(issued + 29), &token).is_ok());
        assert_eq!(kind(codec.validate_at(at(issued + 30), &token)), ValidationErrorKind::Expired);
        assert_eq!(kind(codec.validate_at(at(issued + 86_400), &token)), ValidationErrorKind::Expired);
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let codec = codec();
        for ttl in [0, -1, -3600] {
            assert!(matches!(
                codec.issue(1, UserRole::User, ttl),
                Err(AuthError::Configuration(_))
            ));
        }
        assert!(matches!(
            codec.issue(1, UserRole::User, i64::MAX),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(TokenCodec::new("", "quill", 60), Err(AuthError::Configuration(_))));
        assert!(matches!(TokenCodec::new(SECRET, "", 60), Err(AuthError::Configuration(_))));
        assert!(matches!(TokenCodec::new(SECRET, "quill", 0), Err(AuthError::Configuration(_))));
        assert!(TokenCodec::new("short", "quill", 60).is_ok());
    }

    #[test]
    fn test_every_flipped_bit_is_rejected() {
        let codec = codec();
        let now = at(1_700_000_000);
        let token = codec.issue_at(now, 42, UserRole::User, 60).unwrap();

        // Masks below 0x80 keep every byte ASCII.
        for (i, byte) in token.bytes().enumerate() {
            for mask in 1u8..=0x7F {
                let mut bytes = token.clone().into_bytes();
                bytes[i] ^= mask;
                let flipped = bytes[i];
                let tampered = String::from_utf8(bytes).unwrap();

                // Adding or removing a separator changes the segment count.
                let expected = if byte == b'.' || flipped == b'.' {
                    ValidationErrorKind::MalformedToken
                } else {
                    ValidationErrorKind::TamperedPayload
                };
                assert_eq!(
                    kind(codec.validate_at(now, &tampered)),
                    expected,
                    "flipping mask {:#04x} at byte {}",
                    mask,
                    i
                );
            }
        }
    }

    #[test]
    fn test_wrong_secret_is_tampering() {
        let now = at(1_700_000_000);
        let token = codec().issue_at(now, 1, UserRole::Admin, 60).unwrap();
        let other = TokenCodec::new("another-secret-key-with-32-bytes-or-more", "quill", 60).unwrap();
        assert_eq!(kind(other.validate_at(now, &token)), ValidationErrorKind::TamperedPayload);
    }

    #[test]
    fn test_malformed_shapes() {
        let codec = codec();
        let now = at(1_700_000_000);
        let token = codec.issue_at(now, 1, UserRole::User, 60).unwrap();
        let (signing_input, _) = token.rsplit_once('.').unwrap();

        for bad in [
            "",
            "garbage",
            "a.b",
            "a..c",
            ".b.c",
            "a.b.c.d",
            &format!("{}.", signing_input),
            &format!("{}.extra", token),
        ] {
            assert_eq!(
                kind(codec.validate_at(now, bad)),
                ValidationErrorKind::MalformedToken,
                "{:?} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_other_algorithms_rejected() {
        let codec = codec();
        let now = at(1_700_000_000);
        let claims = r#"{"sub":"1","role":"admin","iat":1700000000,"exp":1700003600,"iss":"quill"}"#;

        // Correct HMAC-SHA256 tag, but the header advertises another algorithm.
        let relabelled = forge(&codec, r#"{"typ":"JWT","alg":"HS512"}"#, claims);
        assert_eq!(kind(codec.validate_at(now, &relabelled)), ValidationErrorKind::MalformedToken);

        let unsigned = forge(&codec, r#"{"alg":"none"}"#, claims);
        assert_eq!(kind(codec.validate_at(now, &unsigned)), ValidationErrorKind::MalformedToken);

        // A token actually signed with HS512 never reaches the header check.
        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &Claims {
                sub: "1".to_string(),
                role: UserRole::Admin,
                iat: 1_700_000_000,
                exp: 1_700_003_600,
                iss: "quill".to_string(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(kind(codec.validate_at(now, &hs512)), ValidationErrorKind::TamperedPayload);

        // Sanity check: the forging helper produces tokens the codec accepts.
        let genuine = forge(&codec, r#"{"typ":"JWT","alg":"HS256"}"#, claims);
        assert_eq!(codec.validate_at(now, &genuine).unwrap().role, UserRole::Admin);
    }

    #[test]
    fn test_bad_claims_are_malformed() {
        let codec = codec();
        let now = at(1_700_000_000);
        let header = r#"{"typ":"JWT","alg":"HS256"}"#;

        for claims in [
            r#"{"sub":"alice","role":"user","iat":1700000000,"exp":1700003600,"iss":"quill"}"#,
            r#"{"sub":"1","role":"root","iat":1700000000,"exp":1700003600,"iss":"quill"}"#,
            r#"{"sub":"1","role":"user","iat":1700000000,"exp":1700003600,"iss":"elsewhere"}"#,
            r#"{"sub":"1","role":"user","iat":1700000000,"iss":"quill"}"#,
            r#"not json"#,
        ] {
            let token = forge(&codec, header, claims);
            assert_eq!(
                kind(codec.validate_at(now, &token)),
                ValidationErrorKind::MalformedToken,
                "{} should be malformed",
                claims
            );
        }
    }

    #[test]
    fn test_issuer_is_pinned() {
        let now = at(1_700_000_000);
        let token = codec().issue_at(now, 1, UserRole::User, 60).unwrap();
        let other_service = TokenCodec::new(SECRET, "other-service", 60).unwrap();
        assert_eq!(
            kind(other_service.validate_at(now, &token)),
            ValidationErrorKind::MalformedToken
        );
    }
}
