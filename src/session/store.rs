use crate::error::{Error, Result};
use crate::session::codec::CookieCodec;
use crate::session::models::{OAuthState, UserSession};
use chrono::Utc;
use tower_cookies::cookie::{time::Duration, SameSite};
use tower_cookies::{Cookie, Cookies};
use tracing::debug;

pub const SESSION_COOKIE: &str = "gitcdn_session";
pub const OAUTH_STATE_COOKIE: &str = "gitcdn_oauth_state";

pub const SESSION_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;
pub const OAUTH_STATE_TTL_MILLIS: i64 = 10 * 60 * 1000;

/// Reads and writes the encrypted session and OAuth-state cookies.
///
/// Absence, corruption and expiry all collapse into the same outward
/// "unauthenticated" signal so a tampered cookie leaks nothing about why it
/// was rejected.
#[derive(Clone)]
pub struct SessionStore {
    codec: CookieCodec,
    secure: bool,
}

impl SessionStore {
    pub fn new(codec: CookieCodec, secure: bool) -> Self {
        Self { codec, secure }
    }

    fn build_cookie(&self, name: &'static str, value: String, max_age_millis: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .secure(self.secure)
            .max_age(Duration::milliseconds(max_age_millis))
            .build()
    }

    fn removal_cookie(name: &'static str) -> Cookie<'static> {
        Cookie::build((name, "")).path("/").build()
    }

    /// Decrypt and validate the session cookie. Returns `None` when the
    /// cookie is absent, corrupt, expired, or missing a token.
    pub fn read(&self, cookies: &Cookies) -> Option<UserSession> {
        let cookie = cookies.get(SESSION_COOKIE)?;
        let session: UserSession = self.codec.decrypt(cookie.value())?;
        if session.is_valid(Utc::now().timestamp_millis()) {
            Some(session)
        } else {
            None
        }
    }

    /// Decrypt the session cookie without enforcing validity. Used only to
    /// preserve repo/branch selection across a re-authentication, where the
    /// previous session has typically already expired.
    pub fn peek(&self, cookies: &Cookies) -> Option<UserSession> {
        let cookie = cookies.get(SESSION_COOKIE)?;
        self.codec.decrypt(cookie.value())
    }

    /// As `read`, but a failure clears the session cookie and yields an
    /// unauthorized outcome.
    pub fn require(&self, cookies: &Cookies) -> Result<UserSession> {
        match self.read(cookies) {
            Some(session) => Ok(session),
            None => {
                self.clear_session(cookies);
                Err(Error::Unauthorized)
            }
        }
    }

    /// Stamp a fresh issue/expiry pair, encrypt, and set the session cookie.
    pub fn issue(&self, cookies: &Cookies, mut session: UserSession) -> Result<UserSession> {
        let now = Utc::now().timestamp_millis();
        session.issued_at = now;
        session.expires_at = now + SESSION_TTL_MILLIS;

        let token = self.codec.encrypt(&session)?;
        cookies.add(self.build_cookie(SESSION_COOKIE, token, SESSION_TTL_MILLIS));
        debug!("Issued session for {}", session.username);
        Ok(session)
    }

    pub fn clear_session(&self, cookies: &Cookies) {
        cookies.remove(Self::removal_cookie(SESSION_COOKIE));
    }

    /// Mint the short-lived OAuth-state cookie.
    pub fn write_state(&self, cookies: &Cookies, state: &str) -> Result<()> {
        let payload = OAuthState {
            state: state.to_string(),
            expires_at: Utc::now().timestamp_millis() + OAUTH_STATE_TTL_MILLIS,
        };
        let token = self.codec.encrypt(&payload)?;
        cookies.add(self.build_cookie(OAUTH_STATE_COOKIE, token, OAUTH_STATE_TTL_MILLIS));
        Ok(())
    }

    /// Consume the OAuth-state cookie: it is cleared unconditionally, so a
    /// state token can never be presented twice. Returns `None` when the
    /// cookie is absent, corrupt, or expired.
    pub fn take_state(&self, cookies: &Cookies) -> Option<OAuthState> {
        let value = cookies.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
        cookies.remove(Self::removal_cookie(OAUTH_STATE_COOKIE));

        let state: OAuthState = self.codec.decrypt(&value?)?;
        if state.is_valid(Utc::now().timestamp_millis()) {
            Some(state)
        } else {
            None
        }
    }

    pub fn clear_state(&self, cookies: &Cookies) {
        cookies.remove(Self::removal_cookie(OAUTH_STATE_COOKIE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(CookieCodec::new(Some("test-secret")), false)
    }

    fn sample_session() -> UserSession {
        UserSession {
            github_token: "gho_abc".to_string(),
            username: "octocat".to_string(),
            avatar_url: String::new(),
            selected_repo: None,
            selected_branch: None,
            issued_at: 0,
            expires_at: 0,
        }
    }

    #[test]
    fn test_issue_then_read() {
        let store = store();
        let cookies = Cookies::default();

        let issued = store.issue(&cookies, sample_session()).unwrap();
        assert_eq!(issued.expires_at, issued.issued_at + SESSION_TTL_MILLIS);

        let read = store.read(&cookies).unwrap();
        assert_eq!(read, issued);
    }

    #[test]
    fn test_read_absent_cookie() {
        assert!(store().read(&Cookies::default()).is_none());
    }

    #[test]
    fn test_read_garbage_cookie() {
        let cookies = Cookies::default();
        cookies.add(Cookie::new(SESSION_COOKIE, "not.a.token"));
        assert!(store().read(&cookies).is_none());
    }

    #[test]
    fn test_expired_session_reads_as_absent() {
        let store = store();
        let cookies = Cookies::default();

        let mut session = sample_session();
        session.issued_at = 1000;
        session.expires_at = 2000; // long past
        let token = CookieCodec::new(Some("test-secret")).encrypt(&session).unwrap();
        cookies.add(Cookie::new(SESSION_COOKIE, token));

        assert!(store.read(&cookies).is_none());
        assert!(store.require(&cookies).is_err());
        // peek still surfaces the stale payload for selection recovery
        assert!(store.peek(&cookies).is_some());
    }

    #[test]
    fn test_require_clears_cookie_on_failure() {
        let store = store();
        let cookies = Cookies::default();
        cookies.add(Cookie::new(SESSION_COOKIE, "garbage"));

        assert!(matches!(store.require(&cookies), Err(Error::Unauthorized)));
        // removal leaves an expired tombstone, not a readable session
        assert!(store.read(&cookies).is_none());
    }

    #[test]
    fn test_state_is_one_shot() {
        let store = store();
        let cookies = Cookies::default();

        store.write_state(&cookies, "random-state").unwrap();
        let first = store.take_state(&cookies).unwrap();
        assert_eq!(first.state, "random-state");

        assert!(store.take_state(&cookies).is_none());
    }

    #[test]
    fn test_expired_state_is_rejected_but_still_cleared() {
        let store = store();
        let cookies = Cookies::default();

        let stale = OAuthState {
            state: "old".to_string(),
            expires_at: Utc::now().timestamp_millis() - 1,
        };
        let token = CookieCodec::new(Some("test-secret")).encrypt(&stale).unwrap();
        cookies.add(Cookie::new(OAUTH_STATE_COOKIE, token));

        assert!(store.take_state(&cookies).is_none());
        assert!(cookies.get(OAUTH_STATE_COOKIE).map(|c| c.value().is_empty()).unwrap_or(true));
    }
}
