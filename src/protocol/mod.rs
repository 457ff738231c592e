pub mod request;
pub mod response;

pub use request::{Command, CommandProbe, Environment};
pub use response::{FindEntry, Reply};
