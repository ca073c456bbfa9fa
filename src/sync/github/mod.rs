mod client;
pub mod content;

pub use client::{GitHubClient, GitHubError, PutFileRequest, RemoteFile};
pub use content::{decode_document, encode_document};
