//! Photo-library admin client for the instabao service.
//!
//! The binary wires a set of long-running [`task::Task`]s together in
//! `main`: an interactive command line feeds the [`admin`] task, which owns
//! the session's view of the photo [`library`] and drives the
//! [`upload::UploadPipeline`] (resolve metadata, encode media, send) for
//! one asset at a time. The [`uploaded`] set mirrors the server's list of
//! already-uploaded assets.

pub mod admin;
pub mod cli;
pub mod config;
pub mod geocode;
pub mod library;
pub mod media;
pub mod task;
pub mod upload;
pub mod uploaded;
pub mod util;
