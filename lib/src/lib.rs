pub mod api;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod identifiers;
pub mod ledger;
pub mod util;
