//! Social platform clients for the minting worker
//!
//! Two read paths: the paginated author-set search used for bulk scoring,
//! and the authoritative per-post lookup used to re-verify high-engagement
//! posts. The user-directory connector resolves on-chain registration order
//! into the handles those queries take.

use thiserror::Error;

mod api;
mod directory;

pub use api::{HttpSocialApi, PostsPage, RawPost, SocialApi, SocialApiConfig};
pub use directory::{
    DirectoryConnector, DirectoryConfig, HandleResolver, HttpDirectoryClient, UserRegistry,
    RESOLVE_CHUNK_SIZE,
};

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage error: {0}")]
    Storage(#[from] engagemint_storage::StorageError),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("post not found: {0}")]
    PostNotFound(String),

    #[error("directory error: {0}")]
    Directory(String),
}
