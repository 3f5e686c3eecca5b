//! Cubby turns a spare Linux box into a tiny NAS: one shared folder,
//! exported over Samba for the local network and over HTTP for everything
//! else on it.
//!
//! The crate is built to be embedded. [`plugin::NasPlugin`] binds the whole
//! lifecycle — shared directory, smb.conf, Samba service, HTTP file server —
//! to a host's load/unload hooks, and the `cubby` binary is a thin
//! standalone runner around that same adapter.

pub mod config;
pub mod logging;
pub mod plugin;
pub mod samba;
pub mod server;
pub mod storage;
