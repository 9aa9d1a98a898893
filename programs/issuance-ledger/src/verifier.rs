use anchor_lang::prelude::*;
use solana_sdk::signature::Signature;

/// Checks that `claimed` produced `signature` over `message`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, message: &[u8], signature: &Signature, claimed: &Pubkey) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &Signature, claimed: &Pubkey) -> bool {
        signature.verify(claimed.as_ref(), message)
    }
}
