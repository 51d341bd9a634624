pub mod dynamo_repo;
pub mod memory_repo;
pub mod record;

#[cfg(test)]
mod record_test;

pub use dynamo_repo::DynamoPreferencesRepository;
pub use memory_repo::InMemoryPreferencesRepository;
