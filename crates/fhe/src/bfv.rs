// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::values::{pack_limbs, PlaintextValue};
use anyhow::{anyhow, bail, Result};
use fhe::bfv::{BfvParameters, BfvParametersBuilder, Encoding, Plaintext, PublicKey};
use fhe::Error as FheError;
use fhe_traits::{DeserializeParametrized, FheEncoder, FheEncrypter, Serialize};
use rand::thread_rng;
use serde::{Deserialize, Serialize as SerdeSerialize};
use std::sync::Arc;

/// Smallest plaintext modulus that can carry a 16-bit limb.
const MIN_PLAINTEXT_MODULUS: u64 = 0x1_0000;

/// Public BFV parameters published by the relayer.
#[derive(Debug, Clone, PartialEq, Eq, SerdeSerialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BfvParamSet {
    pub degree: usize,
    pub plaintext_modulus: u64,
    pub moduli: Vec<u64>,
}

impl BfvParamSet {
    pub fn build(&self) -> Result<Arc<BfvParameters>> {
        if self.plaintext_modulus < MIN_PLAINTEXT_MODULUS {
            bail!(
                "plaintext modulus {} cannot hold 16-bit limbs",
                self.plaintext_modulus
            );
        }
        BfvParametersBuilder::new()
            .set_degree(self.degree)
            .set_plaintext_modulus(self.plaintext_modulus)
            .set_moduli(&self.moduli)
            .build_arc()
            .map_err(|e| anyhow!("Failed to build BFV parameters: {e}"))
    }
}

/// The network key every input batch is encrypted under.
#[derive(Debug, Clone)]
pub struct NetworkKey {
    params: Arc<BfvParameters>,
    public_key: PublicKey,
}

impl NetworkKey {
    pub fn from_bytes(param_set: &BfvParamSet, public_key: &[u8]) -> Result<Self> {
        let params = param_set.build()?;
        let public_key = PublicKey::from_bytes(public_key, &params)
            .map_err(|e| anyhow!("Error deserializing public key: {e}"))?;
        Ok(Self { params, public_key })
    }

    pub fn params(&self) -> &Arc<BfvParameters> {
        &self.params
    }

    /// Encrypt the whole batch as one plaintext of 16-bit limbs.
    pub fn encrypt_batch(&self, values: &[PlaintextValue]) -> Result<Vec<u8>> {
        let limbs = pack_limbs(values);
        if limbs.len() > self.params.degree() {
            bail!(
                "batch needs {} slots but the network key only has {}",
                limbs.len(),
                self.params.degree()
            );
        }

        let pt = Plaintext::try_encode(&limbs, Encoding::poly(), &self.params)
            .map_err(|e: FheError| anyhow!("Error encoding plaintext: {e}"))?;

        let ct = self
            .public_key
            .try_encrypt(&pt, &mut thread_rng())
            .map_err(|e| anyhow!("Error encrypting data: {e}"))?;

        Ok(ct.to_bytes())
    }
}
