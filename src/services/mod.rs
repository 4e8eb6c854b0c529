pub mod candidates;
pub mod error;
pub mod gas;
pub mod observer;
pub mod providers;
pub mod quotes;
pub mod router;
pub mod search;
pub mod trade;

#[cfg(test)]
pub(crate) mod test_support;
