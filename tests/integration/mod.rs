//! Integration tests module
//!
//! This module organizes all integration tests for the jellyresume application.

// Import individual test modules
pub mod config_test;
pub mod jellyfin_client_test;
pub mod local_resume_test;
pub mod reporting_session_test;
