use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::claims::{role_views, RefreshClaims, TokenPayload, REFRESH_TOKEN_TYPE};
use super::error::AuthError;
use super::resolver::PermissionResolver;
use crate::config::JwtConfig;
use crate::database::models::User;

/// Source of the current time in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A signed access token together with the payload it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub payload: TokenPayload,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: i64,
}

impl SigningKeys {
    fn new(secret: &str, lifetime: std::time::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

/// Issues and validates HS256 access and refresh tokens.
///
/// Expiry is checked against the injected clock with no leeway: a token
/// whose `exp` is at or before the current second is expired.
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    clock: Arc<dyn Clock>,
    resolver: PermissionResolver,
}

impl TokenService {
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>, resolver: PermissionResolver) -> Self {
        Self {
            access: SigningKeys::new(&config.secret, config.token_expiry),
            refresh: SigningKeys::new(&config.refresh_secret, config.refresh_expiry),
            clock,
            resolver,
        }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Resolve `user`'s permissions and sign them into an access token.
    pub fn issue_access(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let iat = self.clock.now();
        let payload = TokenPayload {
            id: user.id,
            email: user.email.clone(),
            roles: role_views(user),
            permissions: self.resolver.resolve(user),
            iat,
            exp: iat.saturating_add(self.access.lifetime),
        };

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.access.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, payload })
    }

    pub fn validate_access(&self, token: &str) -> Result<TokenPayload, AuthError> {
        let payload: TokenPayload = self.decode_checked(token, &self.access.decoding)?;
        self.ensure_fresh(payload.exp)?;
        Ok(payload)
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String, AuthError> {
        let iat = self.clock.now();
        let claims = RefreshClaims {
            id: user.id,
            email: user.email.clone(),
            typ: REFRESH_TOKEN_TYPE.to_string(),
            iat,
            exp: iat.saturating_add(self.refresh.lifetime),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn validate_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let claims: RefreshClaims = self.decode_checked(token, &self.refresh.decoding)?;
        if claims.typ != REFRESH_TOKEN_TYPE {
            return Err(AuthError::TokenInvalid);
        }
        self.ensure_fresh(claims.exp)?;
        Ok(claims)
    }

    fn decode_checked<T: DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<T, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against the injected clock instead.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<T>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("Rejected token: {}", e);
                AuthError::TokenInvalid
            })
    }

    fn ensure_fresh(&self, exp: i64) -> Result<(), AuthError> {
        if exp <= self.clock.now() {
            return Err(AuthError::TokenExpired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resolver::GrantPrecedence;
    use crate::database::models::{Permission, Role};
    use std::time::Duration;

    const T0: i64 = 1_700_000_000;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "access-secret".into(),
            token_expiry: Duration::from_secs(3600),
            refresh_secret: "refresh-secret".into(),
            refresh_expiry: Duration::from_secs(7 * 86_400),
        }
    }

    fn service(clock: Arc<ManualClock>) -> TokenService {
        TokenService::new(
            &config(),
            clock,
            PermissionResolver::new(GrantPrecedence::LastWriteWins),
        )
    }

    fn admin() -> User {
        let now = Utc::now();
        let all = Permission {
            id: 1,
            name: "all:*".into(),
            url: "*".into(),
            regex: ".*".into(),
            enable: true,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        User {
            id: 42,
            name: "Admin".into(),
            email: "admin@example.com".into(),
            password_hash: "x".into(),
            enable: true,
            deleted: false,
            created_at: now,
            updated_at: now,
            roles: vec![Role {
                id: 1,
                name: "super_admin".into(),
                enable: true,
                deleted: false,
                created_at: now,
                updated_at: now,
                permissions: vec![all],
            }],
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let tokens = service(Arc::new(ManualClock::new(T0)));
        let issued = tokens.issue_access(&admin()).unwrap();

        let decoded = tokens.validate_access(&issued.token).unwrap();
        assert_eq!(decoded, issued.payload);
        assert_eq!(decoded.id, 42);
        assert_eq!(decoded.email, "admin@example.com");
        assert_eq!(decoded.exp, T0 + 3600);
        assert_eq!(decoded.permissions["*"].role_name, "super_admin");
        assert_eq!(decoded.roles[0].permissions[0].regex, ".*");
    }

    #[test]
    fn payload_uses_wire_field_names() {
        let tokens = service(Arc::new(ManualClock::new(T0)));
        let issued = tokens.issue_access(&admin()).unwrap();
        let json = serde_json::to_value(&issued.payload).unwrap();

        assert_eq!(json["permissions"]["*"]["roleId"], 1);
        assert_eq!(json["permissions"]["*"]["roleName"], "super_admin");
        assert_eq!(json["permissions"]["*"]["permission"]["url"], "*");
        assert!(json["roles"][0]["permissions"].is_array());
    }

    #[test]
    fn token_expires_exactly_at_exp() {
        let clock = Arc::new(ManualClock::new(T0));
        let tokens = service(clock.clone());
        let issued = tokens.issue_access(&admin()).unwrap();

        clock.advance(3599);
        assert!(tokens.validate_access(&issued.token).is_ok());

        clock.advance(1);
        assert!(matches!(
            tokens.validate_access(&issued.token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_invalid() {
        let tokens = service(Arc::new(ManualClock::new(T0)));
        let issued = tokens.issue_access(&admin()).unwrap();

        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push(if issued.token.ends_with('A') { 'B' } else { 'A' });
        assert!(matches!(
            tokens.validate_access(&tampered),
            Err(AuthError::TokenInvalid)
        ));

        let mut other = config();
        other.secret = "somebody-else".into();
        let foreign = TokenService::new(
            &other,
            Arc::new(ManualClock::new(T0)),
            PermissionResolver::default(),
        )
        .issue_access(&admin())
        .unwrap();
        assert!(matches!(
            tokens.validate_access(&foreign.token),
            Err(AuthError::TokenInvalid)
        ));

        assert!(matches!(
            tokens.validate_access("not.a.jwt"),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn refresh_and_access_tokens_are_not_interchangeable() {
        let clock = Arc::new(ManualClock::new(T0));
        let tokens = service(clock.clone());
        let user = admin();

        let refresh = tokens.issue_refresh(&user).unwrap();
        let claims = tokens.validate_refresh(&refresh).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.exp, T0 + 7 * 86_400);

        let access = tokens.issue_access(&user).unwrap();
        assert!(tokens.validate_refresh(&access.token).is_err());
        assert!(tokens.validate_access(&refresh).is_err());

        clock.advance(7 * 86_400);
        assert!(matches!(
            tokens.validate_refresh(&refresh),
            Err(AuthError::TokenExpired)
        ));
    }
}
