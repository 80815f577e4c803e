//! Conversation core shared by the `server` and `cli` crates.
//!
//! This crate owns the persisted session model, the key-value storage it
//! lives in, the gateway boundary to the hosted language model, and the
//! composer that ties a user's input to both. Binaries stay thin: the server
//! is a stateless pass-through over [`llm`], the CLI renders a
//! [`store::SessionStore`] and drives a [`composer::Composer`].

pub mod api;
pub mod composer;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod markdown;
pub mod message;
pub mod session;
pub mod storage;
pub mod store;

pub use composer::{ComposeError, Composer, ComposerState, PendingRequest, Resolution};
pub use credential::{CredentialError, CredentialStore};
pub use error::ErrorCode;
pub use gateway::{APOLOGY, ChatGateway, DirectGateway, GatewayError, RemoteGateway};
pub use message::{Message, Role, Turn};
pub use session::{GREETING, Session, SessionId};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{SessionStore, StoreConfig, StoreError};
