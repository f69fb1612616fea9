pub mod db;
pub mod error;
pub mod store;
pub mod tx;
pub mod types;

pub use error::{Result, StoreError};
pub use store::Store;
pub use tx::Tx;
