// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    authorization::{authorization_typed_data, EXTRA_DATA},
    backend::{FheBackend, HandleContractPair, NetworkContext, UserDecryptRequest},
    bfv::{BfvParamSet, NetworkKey},
    handle::{EncryptedInput, Handle},
    keys::{SealedValue, NONCE_LEN},
    values::PlaintextValue,
};
use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, Bytes, U256},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shade_utils::{decode_hex, encode_hex_prefixed, hex_summary};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("relayer backend has not been initialized")]
    NotInitialized,
    #[error("relayer request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("relayer returned HTTP {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("malformed relayer response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeysResponse {
    #[serde(flatten)]
    params: BfvParamSet,
    public_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputProofRequest {
    contract_chain_id: u64,
    contract_address: Address,
    user_address: Address,
    ciphertext: String,
    types: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputProofResponse {
    handles: Vec<Handle>,
    input_proof: Bytes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestValidity {
    start_timestamp: String,
    duration_days: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDecryptBody {
    handle_contract_pairs: Vec<HandleContractPair>,
    request_validity: RequestValidity,
    contracts_chain_id: u64,
    contract_addresses: Vec<Address>,
    user_address: Address,
    signature: String,
    public_key: String,
    extra_data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedEntry {
    handle: Handle,
    ephemeral_public_key: String,
    nonce: String,
    ciphertext: String,
}

#[derive(Debug, Deserialize)]
struct UserDecryptResponse {
    response: Vec<SealedEntry>,
}

impl SealedEntry {
    fn into_sealed(self) -> Result<SealedValue, RelayerError> {
        let ephemeral_public_key = fixed::<32>(&self.ephemeral_public_key, "ephemeralPublicKey")?;
        let nonce = fixed::<NONCE_LEN>(&self.nonce, "nonce")?;
        let ciphertext = decode_hex(&self.ciphertext)
            .map_err(|e| RelayerError::Malformed(format!("ciphertext: {e}")))?;
        Ok(SealedValue {
            handle: self.handle,
            ephemeral_public_key,
            nonce,
            ciphertext,
        })
    }
}

fn fixed<const N: usize>(value: &str, field: &str) -> Result<[u8; N], RelayerError> {
    let bytes = decode_hex(value).map_err(|e| RelayerError::Malformed(format!("{field}: {e}")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        RelayerError::Malformed(format!("{field}: expected {N} bytes, got {}", b.len()))
    })
}

struct Session {
    network: NetworkContext,
    key: NetworkKey,
}

/// [`FheBackend`] talking to an HTTP relayer.
///
/// Inputs are encrypted locally under the network key and sent to the relayer
/// for proving. Decrypted values come back sealed to the request's keypair.
pub struct RelayerBackend {
    client: reqwest::Client,
    base_url: String,
    session: RwLock<Option<Arc<Session>>>,
}

impl RelayerBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build relayer HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        })
    }

    fn session(&self) -> Result<Arc<Session>> {
        self.session
            .read()
            .map_err(|_| anyhow!("relayer session lock poisoned"))?
            .clone()
            .ok_or_else(|| RelayerError::NotInitialized.into())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        url: String,
        response: reqwest::Result<reqwest::Response>,
    ) -> Result<T, RelayerError> {
        let response = response.map_err(|source| RelayerError::Transport {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayerError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RelayerError::Malformed(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RelayerError> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await;
        Self::read_json(url, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RelayerError> {
        let url = self.url(path);
        let response = self.client.post(&url).json(body).send().await;
        Self::read_json(url, response).await
    }
}

#[async_trait]
impl FheBackend for RelayerBackend {
    #[instrument(skip_all, fields(chain_id = network.chain_id))]
    async fn initialize(&self, network: &NetworkContext) -> Result<()> {
        let keys: KeysResponse = self.get("/v1/keys").await?;
        let public_key = decode_hex(&keys.public_key).context("Invalid network public key")?;
        let key = NetworkKey::from_bytes(&keys.params, &public_key)?;
        info!(
            "loaded network key (degree {}, {} moduli)",
            keys.params.degree,
            keys.params.moduli.len()
        );

        let session = Arc::new(Session {
            network: network.clone(),
            key,
        });
        *self
            .session
            .write()
            .map_err(|_| anyhow!("relayer session lock poisoned"))? = Some(session);
        Ok(())
    }

    #[instrument(skip_all, fields(contract = %contract, count = values.len()))]
    async fn encrypt(
        &self,
        contract: Address,
        user: Address,
        values: &[PlaintextValue],
    ) -> Result<EncryptedInput> {
        let session = self.session()?;
        let ciphertext = session.key.encrypt_batch(values)?;
        debug!("encrypted batch: {}", hex_summary(&ciphertext));

        let request = InputProofRequest {
            contract_chain_id: session.network.chain_id,
            contract_address: contract,
            user_address: user,
            ciphertext: encode_hex_prefixed(&ciphertext),
            types: values.iter().map(|v| v.fhe_type().id()).collect(),
        };
        let response: InputProofResponse = self.post("/v1/input-proof", &request).await?;

        Ok(EncryptedInput {
            handles: response.handles,
            proof: response.input_proof,
        })
    }

    fn create_authorization(
        &self,
        public_key: &[u8],
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Result<TypedData> {
        let session = self.session()?;
        Ok(authorization_typed_data(
            session.network.chain_id,
            session.network.verifying_contract,
            public_key,
            contract_addresses,
            start_timestamp,
            duration_days,
        ))
    }

    #[instrument(skip_all, fields(handles = request.pairs.len()))]
    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<HashMap<Handle, U256>> {
        let session = self.session()?;
        let body = user_decrypt_body(session.network.chain_id, &request);
        let response: UserDecryptResponse = self.post("/v1/user-decrypt", &body).await?;

        let mut values = HashMap::with_capacity(response.response.len());
        for entry in response.response {
            let sealed = entry.into_sealed()?;
            let value = request.keypair.open(&sealed)?;
            values.insert(sealed.handle, value);
        }
        debug!("opened {} sealed values", values.len());
        Ok(values)
    }
}

fn user_decrypt_body(chain_id: u64, request: &UserDecryptRequest) -> UserDecryptBody {
    UserDecryptBody {
        handle_contract_pairs: request.pairs.clone(),
        request_validity: RequestValidity {
            start_timestamp: request.start_timestamp.to_string(),
            duration_days: request.duration_days.to_string(),
        },
        contracts_chain_id: chain_id,
        contract_addresses: request.contract_addresses.clone(),
        user_address: request.user_address,
        signature: request.signature.clone(),
        public_key: request.keypair.public_key_hex(),
        extra_data: encode_hex_prefixed(EXTRA_DATA),
    }
}
