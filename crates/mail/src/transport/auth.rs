//! XOAUTH2 SASL mechanism

/// Answers the XOAUTH2 challenge with a bearer token
pub struct XOAuth2 {
    user: String,
    access_token: String,
}

impl XOAuth2 {
    pub const MECHANISM: &'static str = "XOAUTH2";

    pub fn new(user: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            access_token: access_token.into(),
        }
    }

    /// `user=<user>\x01auth=Bearer <token>\x01\x01`
    pub fn initial_response(&self) -> String {
        format!(
            "user={}\x01auth=Bearer {}\x01\x01",
            self.user, self.access_token
        )
    }
}

impl imap::Authenticator for XOAuth2 {
    type Response = String;

    fn process(&self, _challenge: &[u8]) -> Self::Response {
        self.initial_response()
    }
}
