pub mod datastore;
pub mod processor;
