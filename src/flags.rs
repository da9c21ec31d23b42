//! # Flag Set
//!
//! The gate consulted on every trigger and emit: a set of enabled event
//! categories with bulk `all`/`none` modes that individual entries can
//! still refine.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Error;

/// Informational messages.
pub const INFO: &str = "info";
/// Diagnostic messages, disabled by default.
pub const DEBUG: &str = "debug";
/// Potential problems.
pub const WARNING: &str = "warning";
/// Failed operations.
pub const ERROR: &str = "error";
/// Unrecoverable failures.
pub const FATAL: &str = "fatal";

/// Bulk keyword enabling every flag.
pub const ALL: &str = "all";
/// Bulk keyword disabling every flag.
pub const NONE: &str = "none";

/// Flags enabled when nothing else is configured.
pub const DEFAULT_FLAGS: &str = "info,warning,error,fatal";

#[derive(Debug, Default, Clone)]
struct FlagState {
    all: bool,
    none: bool,
    flags: HashMap<String, bool>,
}

/// A thread-safe set of enabled flags.
///
/// Reads take a shared lock so concurrent dispatch does not serialize on it.
#[derive(Debug, Default)]
pub struct Flags {
    state: RwLock<FlagState>,
}

impl Clone for Flags {
    fn clone(&self) -> Self {
        Self {
            state: RwLock::new(self.read().clone()),
        }
    }
}

impl Flags {
    /// Creates an empty set: every flag is disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set with the given flags enabled.
    pub fn with_enabled<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = Self::new();
        for flag in flags {
            set.enable(flag);
        }
        set
    }

    fn read(&self) -> RwLockReadGuard<'_, FlagState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FlagState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enable(&self, flag: impl Into<String>) {
        let mut state = self.write();
        state.none = false;
        state.flags.insert(flag.into(), true);
    }

    /// Disables a single flag. In all-mode this vetoes just that flag.
    pub fn disable(&self, flag: impl Into<String>) {
        self.write().flags.insert(flag.into(), false);
    }

    pub fn enable_all(&self) {
        let mut state = self.write();
        state.all = true;
        state.none = false;
    }

    /// Disables everything and forgets individual entries.
    pub fn disable_all(&self) {
        let mut state = self.write();
        state.all = false;
        state.none = true;
        state.flags.clear();
    }

    pub fn is_enabled(&self, flag: &str) -> bool {
        let state = self.read();
        if state.all {
            return state.flags.get(flag).copied().unwrap_or(true);
        }
        if state.none {
            return false;
        }
        state.flags.get(flag).copied().unwrap_or(false)
    }

    pub fn is_all(&self) -> bool {
        self.read().all
    }

    pub fn is_none(&self) -> bool {
        let state = self.read();
        !state.all && (state.none || !state.flags.values().any(|enabled| *enabled))
    }
}

impl FromStr for Flags {
    type Err = Error;

    /// Parses a comma separated flag expression such as `"all,-debug"` or
    /// `"info, error"`.
    fn from_str(s: &str) -> Result<Self, Error> {
        let flags = Flags::new();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            match item {
                ALL => flags.enable_all(),
                NONE => flags.disable_all(),
                _ => match item.strip_prefix('-') {
                    Some(name) if name.trim().is_empty() => {
                        return Err(Error::InvalidFlag(item.to_string()))
                    }
                    Some(name) => flags.disable(name.trim()),
                    None => flags.enable(item),
                },
            }
        }
        Ok(flags)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        let mut items: Vec<String> = Vec::new();
        if state.all {
            items.push(ALL.to_string());
        } else if state.none {
            items.push(NONE.to_string());
        }

        let mut entries: Vec<(&String, &bool)> = state.flags.iter().collect();
        entries.sort();
        for (flag, enabled) in entries {
            match (*enabled, state.all) {
                (true, false) => items.push(flag.clone()),
                (false, _) => items.push(format!("-{flag}")),
                (true, true) => {}
            }
        }
        write!(f, "{}", items.join(","))
    }
}
