//! Data models for board member records and update requests.
//!
//! Record models match the JSON layout of the site's `officers.json` exactly.

mod record;
mod request;

pub use record::*;
pub use request::*;
