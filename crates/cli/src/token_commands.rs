use {
    anyhow::{Result, bail},
    breadcord_auth::{Credential, CredentialStore, KeyringStore, keyring_is_persistent},
    breadcord_config::BreadcordConfig,
    clap::Subcommand,
};

#[derive(Subcommand)]
pub enum TokenAction {
    /// Store a credential in the OS keyring.
    Set {
        /// The account token.
        token: String,
    },
    /// Show whether a credential is stored (redacted).
    Status,
    /// Remove the stored credential.
    Clear,
}

pub async fn handle_token(action: TokenAction, config: &BreadcordConfig) -> Result<()> {
    let store = KeyringStore::new(config.credentials.service.as_str());
    match action {
        TokenAction::Set { token } => {
            let Some(credential) = Credential::parse(&token) else {
                bail!("refusing to store an empty token");
            };
            store.save(credential.expose()).await?;
            println!("stored {credential} for {}", store.account());
            if !keyring_is_persistent() {
                eprintln!("warning: this keyring backend does not keep entries across reboots");
            }
        },
        TokenAction::Status => match store.load().await? {
            Some(credential) => println!("logged in: {credential} ({})", store.account()),
            None => println!("no credential stored for {}", store.account()),
        },
        TokenAction::Clear => {
            store.delete().await?;
            println!("credential removed for {}", store.account());
        },
    }
    Ok(())
}
