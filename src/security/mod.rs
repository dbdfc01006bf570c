//! Security subsystem.
//!
//! # Responsibilities
//! - Define permission flags consulted while finalizing responses
//! - Provide the permission-check seam (`PermissionCheck`)
//!
//! # Design Decisions
//! - The permission model itself lives elsewhere; the finalizer only asks yes/no
//! - Absent users never hold a permission

pub mod permissions;

pub use permissions::{IdentityPermissions, Permission, PermissionCheck};
