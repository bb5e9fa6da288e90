pub mod client;
pub mod descriptor;

pub use client::{CredentialProvisioner, IssuedCredential, PanelClient, PanelError};
