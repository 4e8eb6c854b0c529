pub mod chain;
pub mod messages;
pub mod pool;
pub mod protocol;
pub mod quote;
pub mod route;
pub mod state;
pub mod token;
