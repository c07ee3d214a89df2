//! Subject store implementations and the subject service

mod postgres_repository;
mod repository;
mod service;

pub use postgres_repository::PostgresSubjectRepository;
pub use repository::InMemorySubjectRepository;
pub use service::{CreateAdminRequest, RegisterUserRequest, SubjectService};
