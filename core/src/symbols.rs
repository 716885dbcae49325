//! Global symbol table: one-byte ids for every call target.
//!
//! Ids are assigned in first-seen order, callable imports first and local functions
//! after, skipping the runtime helpers in [`DENYLIST`]. The table is built once and
//! never changes afterwards.

use hashbrown::HashMap;

use crate::api::Error;
use crate::host::Import;
use crate::{String, ToString, Vec};

/// Runtime helpers that must never become interpreted call targets.
pub const DENYLIST: [&str; 12] = [
    "_memcpy",
    "_memset",
    "copyTempDouble",
    "copyTempFloat",
    "_strlen",
    "stackAlloc",
    "setThrew",
    "stackRestore",
    "setTempRet0",
    "getTempRet0",
    "stackSave",
    "runPostSets",
];

/// Exclusive upper bound on the number of symbols.
pub const MAX_SYMBOLS: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    names: Vec<String>,
    ids: HashMap<String, u8>,
}

impl SymbolTable {
    /// Build the table from the module's imports and local function names.
    ///
    /// Non-callable imports are skipped, as are denylisted names. A name seen twice
    /// keeps its first id.
    pub fn build<'a, I, F>(imports: I, functions: F) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a Import>,
        F: IntoIterator<Item = &'a str>,
    {
        let candidates = imports
            .into_iter()
            .filter(|import| import.is_callable())
            .map(|import| import.name.as_str())
            .chain(functions)
            .filter(|name| !is_denied(name));

        let mut names: Vec<String> = Vec::new();
        let mut seen: hashbrown::HashSet<&str> = hashbrown::HashSet::new();
        for name in candidates {
            if seen.insert(name) {
                names.push(name.to_string());
            }
        }

        if names.len() >= MAX_SYMBOLS {
            return Err(Error::SymbolSpaceExhausted { count: names.len() });
        }

        let ids = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as u8))
            .collect();
        tracing::debug!(count = names.len(), "built global symbol table");
        Ok(Self { names, ids })
    }

    pub fn id_of(&self, name: &str) -> Option<u8> {
        self.ids.get(name).copied()
    }

    pub fn name_of(&self, id: u8) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(id, name)| (id as u8, name.as_str()))
    }
}

pub fn is_denied(name: &str) -> bool {
    DENYLIST.contains(&name)
}
