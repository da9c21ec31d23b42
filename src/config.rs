//! # Configuration Module
//!
//! This module defines the global [`Config`] struct using the [`config_generator!`] macro.
//!
//! It holds the process-wide defaults a [`Logger`](crate::Logger) starts from. Each value can
//! still be overridden per logger through its `with_*` builder methods.
//!
//! ## Fields
//! - `default_listener_name`: Name used by [`Logger::listen_default`](crate::Logger::listen_default)
//! - `enabled_flags`: Flag expression parsed into the initial [`Flags`](crate::Flags),
//!   e.g. `"info,error"` or `"all,-debug"`
//! - `queue_capacity`: Bounded queue size per listener worker; producers block when it is full
//! - `recover_panics`: Whether a panicking listener keeps receiving later events
//!
//! ## Safety
//!
//! Calling `from_hashmap()` multiple times has no effect after the first call.
//! Values that fail to parse fall back to their defaults.
use crate::flags::DEFAULT_FLAGS;
use macro_keeper::config_generator;

config_generator!(
    Config,
    CONFIG,
    [
        (default_listener_name, String, "default".to_string()),
        (enabled_flags, String, DEFAULT_FLAGS.to_string()),
        (queue_capacity, usize, 1024),
        (recover_panics, bool, true),
    ]
);
