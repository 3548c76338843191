//! Single implicit poll kept in a JSON file, one vote per client address.

mod file;

pub use file::*;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::util::{name_key, non_blank};

const SEED_OPTIONS: [&str; 2] = ["Deuses Gregos", "Animes"];

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct BallotSheet {
    /// Option name to the names of everyone who voted for it, in the
    /// order options were added.
    #[serde(rename = "opcoes")]
    pub options: IndexMap<String, Vec<String>>,
    /// Client address to the option name it voted for.
    #[serde(rename = "votos_por_ip", default)]
    pub votes_by_address: IndexMap<String, String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CastError {
    AlreadyVoted,
    DuplicateOption(String),
    InvalidOption(String),
    NoSelection,
    MissingName,
}

impl Default for BallotSheet {
    fn default() -> Self {
        BallotSheet {
            options: SEED_OPTIONS.iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
            votes_by_address: IndexMap::new(),
        }
    }
}

impl BallotSheet {
    /// Existing option whose name matches ignoring case.
    pub fn find_option(&self, name: &str) -> Option<&str> {
        let key = name_key(name);
        self.options.keys()
            .find(|existing| name_key(existing) == key)
            .map(String::as_str)
    }

    pub fn has_voted(&self, address: &str) -> bool {
        self.votes_by_address.contains_key(address)
    }

    /// Records one vote and returns the option it went to. A non-blank
    /// `new_option` must not collide with an existing option; otherwise
    /// `selected` must name one.
    pub fn cast(&mut self,
        address: &str,
        voter: &str,
        selected: Option<&str>,
        new_option: Option<&str>,
    ) -> Result<String, CastError> {
        if self.has_voted(address) {
            return Err(CastError::AlreadyVoted);
        }
        let voter = non_blank(Some(voter)).ok_or(CastError::MissingName)?;

        let option = if let Some(new_option) = non_blank(new_option) {
            if let Some(existing) = self.find_option(new_option) {
                return Err(CastError::DuplicateOption(existing.to_owned()));
            }
            new_option.to_owned()
        } else {
            let selected = non_blank(selected).ok_or(CastError::NoSelection)?;
            self.find_option(selected)
                .ok_or_else(|| CastError::InvalidOption(selected.to_owned()))?
                .to_owned()
        };

        self.options.entry(option.clone())
            .or_default()
            .push(voter.to_owned());
        self.votes_by_address.insert(address.to_owned(), option.clone());
        Ok(option)
    }

    pub fn tallies(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.options.iter().map(|(name, voters)| (name.as_str(), voters.len()))
    }
}

/// Decides whether a client address may use the ballot box at all.
pub trait AddressGate {
    fn is_blocked(&self, address: &str) -> bool;
}

#[derive(Clone, Default)]
pub struct Blocklist {
    addresses: HashSet<String>,
}

impl Blocklist {
    pub fn new<I, S>(addresses: I) -> Blocklist
    where I: IntoIterator<Item = S>, S: Into<String> {
        Blocklist {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }
}

impl AddressGate for Blocklist {
    fn is_blocked(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }
}
