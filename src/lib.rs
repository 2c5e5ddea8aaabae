//! Attendance beacon library — portable discovery-and-report core.
//!
//! On command the beacon enumerates nearby devices, either by listening for
//! BLE advertisements for a bounded window or by reading the station table of
//! its own access point, and posts the identifiers as JSON to a collection
//! endpoint. This crate holds everything except the radios and sockets, so it
//! is testable on any host with `cargo test`. The ESP-IDF firmware in
//! `firmware-std/` is a thin consumer that implements the collaborator traits
//! ([`scanner::AdvertisementRadio`], [`scanner::StationRoster`],
//! [`report::Uplink`], [`report::JsonPoster`]) and serves HTTP.
//!
//! `no_std`, no allocator; device lists and JSON bodies are fixed-capacity.

#![cfg_attr(not(test), no_std)]

pub mod beacon;
pub mod board;
pub mod comm;
pub mod defaults;
pub mod protocol;
pub mod report;
pub mod scanner;
pub mod session;
