//! Persistence adapters for `AuthRepository`.

pub mod seaorm;

pub use seaorm::SeaOrmAuthRepository;
