//! Notes Module
//! Mission: Notes that only ever reference their owner's folders and tags

pub mod api;
pub mod models;
pub mod ownership;
pub mod store;

pub use ownership::{OwnershipError, OwnershipValidator};
pub use store::NoteStore;
