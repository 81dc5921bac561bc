//! Pokedex battle client
//!
//! A terminal client for the course pokedex service: browse the dex, pick a
//! creature and battle a server-chosen opponent. Winning unlocks the
//! opponent for later battles.

pub mod action;
pub mod api;
pub mod battle;
pub mod config;
pub mod effect;
pub mod error;
pub mod reducer;
pub mod roster;
pub mod session;
pub mod state;
pub mod ui;
pub mod view;
pub mod wire;
