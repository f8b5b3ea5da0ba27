//! # Gridpoint - PDU Account Management Library
//!
//! This is a facade crate that re-exports all public APIs from the gridpoint
//! account components. Use this crate to get access to the full account
//! lifecycle, authentication and session functionality in one place.
//!
//! ## Usage
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! gridpoint = { path = "../gridpoint" }
//! ```
//!
//! ## Structure
//!
//! - **Core domain types**: `Email`, `Password`, `User`, `AccountState`, etc.
//! - **Repository traits**: `UserRepository`, `MailSender`, `MxResolver`
//! - **Managers**: `UserManager`, `TotpManager` - the account lifecycle operations
//! - **Adapters**: `InMemoryUserRepository`, `JwtSessions`, `StaticMxResolver`, etc.

// ============================================================================
// Core Domain Types
// ============================================================================

/// Core domain types and value objects
pub mod core {
    pub use gridpoint_core::*;
}

// Re-export most commonly used core types at the root level
pub use gridpoint_core::{
    AccountState, Email, Language, NewUser, Password, StateError, User, UserError, UserRole,
    UserTotp,
};

// ============================================================================
// Port Traits
// ============================================================================

/// Port trait definitions
pub mod ports {
    pub use gridpoint_core::{
        Mail, MailError, MailSender, MxLookup, MxResolver, RepositoryError, UserRepository,
    };
}

// Re-export port traits at root level
pub use gridpoint_core::{MailSender, MxResolver, RepositoryError, UserRepository};

// ============================================================================
// Managers (Application Layer)
// ============================================================================

/// Application layer: lifecycle orchestration
pub mod managers {
    pub use gridpoint_application::*;
}

// Re-export managers at root level
pub use gridpoint_application::{AccountError, NewTotp, TotpManager, UserManager};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    /// Persistence implementations
    pub mod persistence {
        pub use gridpoint_adapters::persistence::*;
    }

    /// Mail sender implementations
    pub mod mail {
        pub use gridpoint_adapters::mail::*;
    }

    /// MX resolution
    pub mod dns {
        pub use gridpoint_adapters::dns::*;
    }

    /// JWT session utilities
    pub mod session {
        pub use gridpoint_adapters::session::*;
    }

    /// Configuration
    pub mod config {
        pub use gridpoint_adapters::settings::*;
    }
}

// Re-export commonly used adapters at root level
pub use gridpoint_adapters::{
    InMemoryUserRepository, JwtSessions, RecordingMailSender, SessionKeys, Settings,
    StaticMxResolver,
};

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing port traits
pub use async_trait::async_trait;

/// Re-export secrecy for working with secrets
pub use secrecy::{ExposeSecret, Secret};
