pub mod bearer_token;
pub mod client;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod fetch;
pub mod get_current_user;
pub mod get_top_tracks;
pub mod paging;
pub mod token_record;
pub mod track;
pub mod user;
pub mod auth {
    pub mod authorization_code;
    pub mod pkce;
    pub mod token_cache;
}
