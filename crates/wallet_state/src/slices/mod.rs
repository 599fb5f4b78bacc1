pub mod contract;
pub mod settings;
pub mod toast;
pub mod transaction;
pub mod wallet;
