//! FrigoFlow Core Library
//!
//! Shared family shopping lists with a realtime mirror of each list.
//!
//! ## Overview
//!
//! Families share shopping lists; any member can add, check off or remove
//! items, and everyone looking at a list sees the change without polling.
//! The data lives in a relational backend that also pushes row-level change
//! notifications. This crate provides:
//!
//! - **Backend contract** ([`backend`]): item store and change feed traits,
//!   plus [`LocalBackend`], a redb-backed implementation
//! - **Realtime sync** ([`sync`]): [`ListSynchronizer`] keeps an ordered,
//!   observable snapshot of one list in step with the change feed
//! - **Sessions** ([`session`]): explicit session handle, onboarding state,
//!   list and item actions
//! - **Invites** ([`invite`]) and **product lookup** ([`products`])
//!
//! ## Quick Start
//!
//! ```ignore
//! use frigoflow_core::{NewItem, Session, UserId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open("~/.frigoflow/data", Some(UserId::from("alice")))?;
//!     session.create_family("Dupont", "Alice")?;
//!     let list = session.create_list("Courses")?;
//!
//!     let sync = session.watch_list(&list.id);
//!     session.add_item(&list.id, NewItem::new("Milk"))?;
//!
//!     let mut snapshots = sync.observe();
//!     while snapshots.changed().await.is_ok() {
//!         println!("{:?}", snapshots.borrow().labels());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod invite;
pub mod logging;
pub mod products;
pub mod session;
pub mod storage;
pub mod sync;
pub mod types;

// Re-exports
pub use backend::{
    Backend, ChangeFeed, ChangeHub, FeedSubscription, ItemStore, LocalBackend, RawChange,
    SubscriptionId,
};
pub use config::{FrigoConfig, Ordering};
pub use error::{FrigoError, FrigoResult};
pub use invite::{Invite, InviteCode};
pub use products::{OpenFoodFactsClient, ProductInfo, ProductLookup};
pub use session::{BootstrapOutcome, Session};
pub use storage::Storage;
pub use sync::{ChangeEvent, ItemMirror, ListSnapshot, ListSynchronizer};
pub use types::*;
