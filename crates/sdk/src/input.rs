// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{context::EncryptionContext, error::SdkError};
use alloy::primitives::Address;
use shade_fhe::{EncryptedInput, PlaintextValue};
use shade_utils::hex_summary;
use tracing::{debug, instrument};

/// Collects values for one contract call and encrypts them as a single batch.
///
/// `handles[i]` of the result belongs to the i-th value added, which is also the
/// position the contract expects it in.
pub struct EncryptedInputSession {
    context: EncryptionContext,
    contract: Address,
    user: Address,
    values: Vec<PlaintextValue>,
}

impl EncryptedInputSession {
    pub(crate) fn new(context: EncryptionContext, contract: Address, user: Address) -> Self {
        Self {
            context,
            contract,
            user,
            values: Vec::new(),
        }
    }

    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.add(value)
    }

    pub fn add_u8(&mut self, value: u8) -> &mut Self {
        self.add(value)
    }

    pub fn add_u16(&mut self, value: u16) -> &mut Self {
        self.add(value)
    }

    pub fn add_u32(&mut self, value: u32) -> &mut Self {
        self.add(value)
    }

    pub fn add_u64(&mut self, value: u64) -> &mut Self {
        self.add(value)
    }

    pub fn add_address(&mut self, value: Address) -> &mut Self {
        self.add(value)
    }

    pub fn add(&mut self, value: impl Into<PlaintextValue>) -> &mut Self {
        self.values.push(value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[PlaintextValue] {
        &self.values
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn user(&self) -> Address {
        self.user
    }

    /// Encrypt everything added so far in one backend call.
    #[instrument(skip(self), fields(contract = %self.contract, count = self.values.len()))]
    pub async fn encrypt(self) -> Result<EncryptedInput, SdkError> {
        self.context.ensure_ready()?;
        if self.values.is_empty() {
            return Err(SdkError::EncryptionFailure(
                "nothing to encrypt: no values were added".into(),
            ));
        }

        let input = self
            .context
            .backend()
            .encrypt(self.contract, self.user, &self.values)
            .await
            .map_err(|e| SdkError::EncryptionFailure(format!("{e:#}")))?;

        self.check_alignment(&input)?;
        debug!(
            "encrypted {} values, proof {}",
            input.handles.len(),
            hex_summary(&input.proof)
        );
        Ok(input)
    }

    fn check_alignment(&self, input: &EncryptedInput) -> Result<(), SdkError> {
        if input.handles.len() != self.values.len() {
            return Err(SdkError::EncryptionFailure(format!(
                "backend returned {} handles for {} values",
                input.handles.len(),
                self.values.len()
            )));
        }
        for (i, (handle, value)) in input.handles.iter().zip(&self.values).enumerate() {
            let actual = handle
                .fhe_type()
                .map_err(|e| SdkError::EncryptionFailure(e.to_string()))?;
            if actual != value.fhe_type() {
                return Err(SdkError::EncryptionFailure(format!(
                    "handle {} is {}, expected {}",
                    i,
                    actual,
                    value.fhe_type()
                )));
            }
        }
        Ok(())
    }
}
