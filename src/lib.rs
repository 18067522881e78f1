//! Adminboard — session and access core for the admin dashboard.
//!
//! ARCHITECTURE
//! ============
//! The edge gate ([`edge`]) runs first on every navigation and sees cookies
//! only. Once the app mounts, the session context ([`session::context`])
//! asks the session client to turn stored tokens into a user, and the route
//! guard ([`guard`]) decides what a protected screen shows. Data screens go
//! through [`resources`], which rides the same refresh-and-retry path, and
//! the payment widgets are fed by [`summary`].

pub mod config;
pub mod edge;
pub mod guard;
pub mod records;
pub mod resources;
pub mod routes;
pub mod session;
pub mod summary;
