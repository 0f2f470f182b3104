//! Keel: declarative records mapped to SQL tables.
//!
//! ```rust,ignore
//! use keel::{QueryOptions, Record};
//!
//! #[derive(Debug, Default, Record)]
//! struct User {
//!     #[sql("primary_key,auto_increment,where")]
//!     id: i64,
//!     #[sql("size=64,unique")]
//!     name: String,
//!     age: Option<u32>,
//! }
//!
//! User::auto_migrate(&mut connection).await?;
//! let mut user = User { name: "ann".into(), ..Default::default() };
//! user.insert(&mut connection, QueryOptions::new()).await?;
//! let adults = User::list(&mut connection, QueryOptions::new().selector("age>17")).await?;
//! ```

pub use keel_core::*;
pub use keel_macros::*;
