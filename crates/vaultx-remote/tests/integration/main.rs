//! Integration tests for vaultx-remote
//!
//! A wiremock server stands in for both the metadata API and the blob
//! storage behind pre-signed URLs.

mod common;

mod test_blobs;
mod test_login;
mod test_metadata;
