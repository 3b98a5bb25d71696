pub mod connector;
pub mod driver;
pub mod handle;
pub mod mongo;
pub mod options;

#[cfg(test)]
pub(crate) mod mock;
