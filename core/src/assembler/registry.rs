use alloc::collections::BTreeMap;

use crate::Vec;
use crate::isa::Signature;

/// Distinct call signatures seen per target, in first-seen order.
///
/// A signature's position in its target's list is the `sig` operand of `CALL`, so
/// entries are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSignatureRegistry {
    by_target: BTreeMap<u8, Vec<Signature>>,
}

impl CallSignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `signature` for `target`, appending it if new.
    ///
    /// Returns `None` once the target already holds 256 distinct signatures.
    pub fn register(&mut self, target: u8, signature: &Signature) -> Option<u8> {
        let signatures = self.by_target.entry(target).or_default();
        if let Some(index) = signatures.iter().position(|s| s == signature) {
            return Some(index as u8);
        }
        let index = u8::try_from(signatures.len()).ok()?;
        signatures.push(signature.clone());
        Some(index)
    }

    pub fn signatures(&self, target: u8) -> &[Signature] {
        self.by_target.get(&target).map_or(&[], Vec::as_slice)
    }

    pub fn signature(&self, target: u8, index: u8) -> Option<&Signature> {
        self.signatures(target).get(index as usize)
    }

    /// Targets with at least one signature, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &[Signature])> {
        self.by_target
            .iter()
            .map(|(target, signatures)| (*target, signatures.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}
