// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{context::EncryptionContext, error::SdkError};
use alloy::primitives::{Address, U256};
use shade_fhe::{
    ClearValue, FheValue, Handle, HandleContractPair, KeyPair, TypedHandle, UserDecryptRequest,
};
use shade_utils::strip_hex_prefix;
use std::{
    collections::{HashMap, HashSet},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{info, instrument, warn};

/// Plaintexts for exactly the handles that were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptionResult {
    values: HashMap<Handle, ClearValue>,
}

impl DecryptionResult {
    pub fn get<T: FheValue>(&self, handle: &TypedHandle<T>) -> Option<T> {
        self.values.get(&handle.handle()).and_then(T::from_clear)
    }

    pub fn clear_value(&self, handle: &Handle) -> Option<&ClearValue> {
        self.values.get(handle)
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.values.contains_key(handle)
    }

    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> HashMap<Handle, ClearValue> {
        self.values
    }
}

/// One user decryption: fresh keypair, one signature, one backend round trip.
///
/// Decrypting never publishes anything; making a value public is a separate
/// ledger write.
pub struct DecryptionSession {
    context: EncryptionContext,
    validity_days: u64,
}

impl DecryptionSession {
    pub(crate) fn new(context: EncryptionContext) -> Self {
        let validity_days = context.validity_days();
        Self {
            context,
            validity_days,
        }
    }

    pub fn with_validity_days(mut self, validity_days: u64) -> Self {
        self.validity_days = validity_days.max(1);
        self
    }

    #[instrument(skip_all, fields(requested = pairs.len()))]
    pub async fn decrypt(self, pairs: &[HandleContractPair]) -> Result<DecryptionResult, SdkError> {
        self.context.ensure_ready()?;

        // one handle may be requested under several contracts; each contract is authorized
        let mut seen = HashSet::new();
        let pairs: Vec<HandleContractPair> =
            pairs.iter().copied().filter(|p| seen.insert(*p)).collect();
        if pairs.is_empty() {
            return Err(SdkError::DecryptionFailure("no handles requested".into()));
        }
        let mut contracts = Vec::new();
        for pair in &pairs {
            if !contracts.contains(&pair.contract_address) {
                contracts.push(pair.contract_address);
            }
        }

        let keypair = KeyPair::generate();
        let start_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SdkError::DecryptionFailure(format!("system clock: {e}")))?
            .as_secs();

        let typed_data = self
            .context
            .backend()
            .create_authorization(
                &keypair.public_key(),
                &contracts,
                start_timestamp,
                self.validity_days,
            )
            .map_err(|e| SdkError::DecryptionFailure(format!("authorization payload: {e:#}")))?;

        let wallet = self.context.wallet();
        let signature = wallet
            .sign_typed_data(&typed_data)
            .await
            .map_err(|e| SdkError::authorization(&e))?;
        info!("decryption authorized for {} contract(s)", contracts.len());

        let request = UserDecryptRequest {
            pairs: pairs.clone(),
            keypair,
            signature: strip_hex_prefix(&signature).to_string(),
            contract_addresses: contracts,
            user_address: wallet.address(),
            start_timestamp,
            duration_days: self.validity_days,
        };
        let raw = self
            .context
            .backend()
            .user_decrypt(request)
            .await
            .map_err(|e| SdkError::DecryptionFailure(format!("{e:#}")))?;

        collect_requested(&pairs, raw)
    }

    /// Decrypt handles of one kind, returning values in request order.
    pub async fn decrypt_typed<T: FheValue>(
        self,
        handles: &[(TypedHandle<T>, Address)],
    ) -> Result<Vec<T>, SdkError> {
        let pairs: Vec<_> = handles
            .iter()
            .map(|(h, contract)| HandleContractPair::new(h.handle(), *contract))
            .collect();
        let result = self.decrypt(&pairs).await?;
        handles
            .iter()
            .map(|(h, _)| {
                result.get(h).ok_or_else(|| {
                    SdkError::DecryptionFailure(format!("{} did not decode as expected", h.handle()))
                })
            })
            .collect()
    }
}

fn collect_requested(
    pairs: &[HandleContractPair],
    mut raw: HashMap<Handle, U256>,
) -> Result<DecryptionResult, SdkError> {
    let mut values = HashMap::with_capacity(pairs.len());
    for pair in pairs {
        if values.contains_key(&pair.handle) {
            continue;
        }
        let value = raw.remove(&pair.handle).ok_or_else(|| {
            SdkError::DecryptionFailure(format!("backend returned no value for {}", pair.handle))
        })?;
        let fhe_type = pair
            .handle
            .fhe_type()
            .map_err(|e| SdkError::DecryptionFailure(e.to_string()))?;
        let clear = ClearValue::decode(fhe_type, value)
            .map_err(|e| SdkError::DecryptionFailure(format!("{}: {e}", pair.handle)))?;
        values.insert(pair.handle, clear);
    }
    if !raw.is_empty() {
        warn!("dropping {} unrequested values from the backend", raw.len());
    }
    Ok(DecryptionResult { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_fhe::FheType;

    fn handle(index: u8, ty: FheType) -> Handle {
        Handle::compose([0x5a; 21], index, 31337, ty)
    }

    #[test]
    fn test_collect_keeps_exactly_requested() -> Result<(), SdkError> {
        let a = handle(0, FheType::Bool);
        let b = handle(1, FheType::Uint64);
        let extra = handle(2, FheType::Uint64);
        let pairs = [
            HandleContractPair::new(a, Address::ZERO),
            HandleContractPair::new(b, Address::ZERO),
        ];
        let raw = HashMap::from([
            (a, U256::from(1)),
            (b, U256::from(1000)),
            (extra, U256::from(5)),
        ]);

        let result = collect_requested(&pairs, raw)?;
        assert_eq!(result.len(), 2);
        assert!(!result.contains(&extra));
        assert_eq!(result.get(&TypedHandle::<bool>::new(a).unwrap()), Some(true));
        assert_eq!(result.get(&TypedHandle::<u64>::new(b).unwrap()), Some(1000));
        Ok(())
    }

    #[test]
    fn test_missing_handle_fails_whole_batch() {
        let a = handle(0, FheType::Bool);
        let b = handle(1, FheType::Uint64);
        let pairs = [
            HandleContractPair::new(a, Address::ZERO),
            HandleContractPair::new(b, Address::ZERO),
        ];
        let raw = HashMap::from([(a, U256::from(1))]);
        assert!(matches!(
            collect_requested(&pairs, raw),
            Err(SdkError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_out_of_range_value_is_rejected() {
        let a = handle(0, FheType::Uint8);
        let pairs = [HandleContractPair::new(a, Address::ZERO)];
        let raw = HashMap::from([(a, U256::from(300))]);
        assert!(collect_requested(&pairs, raw).is_err());
    }
}
