//! Print the provider's CustomResourceDefinitions as a multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/crds.yaml
//! ```

use anyhow::Result;
use kube::CustomResourceExt;
use r2_credentials_controller::{Credentials, ProviderConfig, ProviderConfigUsage};

fn main() -> Result<()> {
    let crds = [
        Credentials::crd(),
        ProviderConfig::crd(),
        ProviderConfigUsage::crd(),
    ];
    for crd in crds {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
