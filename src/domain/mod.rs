mod account;
mod credentials;
mod ledger;
mod money;
mod transaction;

pub use account::*;
pub use credentials::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
