use std::collections::HashMap;

use aws_config::BehaviorVersion;
use aws_sdk_kms::config::Credentials;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::Client;

use super::{block_on, sdk_error};
use crate::error::ProviderError;
use crate::lookup::{KmsClient, KmsConnector, KmsSession};
use crate::reconcile::ProviderResult;

/// Opens SDK KMS clients, one per lookup session.
#[derive(Debug, Default)]
pub struct SdkKmsConnector;

struct SdkKms {
    client: Client,
}

impl KmsConnector for SdkKmsConnector {
    fn connect(&self, session: &KmsSession) -> ProviderResult<Box<dyn KmsClient>> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &session.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(profile) = &session.profile {
            loader = loader.profile_name(profile);
        }
        if let (Some(key), Some(secret)) = (&session.access_key_id, &session.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key,
                secret,
                session.session_token.clone(),
                None,
                "awsible-kms-lookup",
            ));
        }

        let config = block_on(async { Ok::<_, ProviderError>(loader.load().await) })?;
        Ok(Box::new(SdkKms {
            client: Client::new(&config),
        }))
    }
}

impl KmsClient for SdkKms {
    fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &HashMap<String, String>,
    ) -> ProviderResult<Option<Vec<u8>>> {
        block_on(async {
            let output = self
                .client
                .encrypt()
                .key_id(key_id)
                .plaintext(Blob::new(plaintext))
                .set_encryption_context(Some(context.clone()))
                .send()
                .await
                .map_err(sdk_error)?;
            Ok::<_, ProviderError>(output.ciphertext_blob().map(|b| b.as_ref().to_vec()))
        })
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &HashMap<String, String>,
    ) -> ProviderResult<Option<Vec<u8>>> {
        block_on(async {
            let output = self
                .client
                .decrypt()
                .ciphertext_blob(Blob::new(ciphertext))
                .set_encryption_context(Some(context.clone()))
                .send()
                .await
                .map_err(sdk_error)?;
            Ok::<_, ProviderError>(output.plaintext().map(|b| b.as_ref().to_vec()))
        })
    }
}
