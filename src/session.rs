use soundscope_spotify_api::token_record::TokenRecord;

/// Values an in-flight authorize redirect must come back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_verifier: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// One-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Per-browser login state.
///
/// Two states: unauthenticated and authenticated. Only a successful token
/// exchange moves a session to authenticated, and any failed downstream call
/// moves it back.
#[derive(Debug, Default)]
pub struct Session {
    authenticated: bool,
    token: Option<TokenRecord>,
    pending: Option<PendingAuthorization>,
    notice: Option<Notice>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn token(&self) -> Option<&TokenRecord> {
        self.token.as_ref()
    }

    /// Commit a freshly obtained token.
    pub fn authenticate(&mut self, token: TokenRecord) {
        self.token = Some(token);
        self.authenticated = true;
        self.pending = None;
    }

    /// Replace the token of an authenticated session, e.g. after a refresh.
    pub fn update_token(&mut self, token: TokenRecord) {
        self.token = Some(token);
    }

    /// Drop back to unauthenticated so the page offers the connect action again.
    pub fn demote(&mut self) {
        self.authenticated = false;
        self.token = None;
        self.pending = None;
    }

    pub fn begin_pending(&mut self, pending: PendingAuthorization) {
        self.pending = Some(pending);
    }

    pub fn pending(&self) -> Option<&PendingAuthorization> {
        self.pending.as_ref()
    }

    pub fn take_pending(&mut self) -> Option<PendingAuthorization> {
        self.pending.take()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}
