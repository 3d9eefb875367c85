use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PUBLIC_RSA_KEY: &str = "public-rsa-key";
pub const ARG_PRIVATE_RSA_KEY: &str = "private-rsa-key";

/// Base64 encoded RSA key pair, PEM or DER inside.
#[derive(Debug, Clone)]
pub struct Options {
    pub public_rsa_key: String,
    pub private_rsa_key: SecretString,
}

impl Options {
    /// Parse key arguments from matches.
    ///
    /// # Errors
    /// Returns an error if either key is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(public_rsa_key) = get_non_empty(ARG_PUBLIC_RSA_KEY) else {
            anyhow::bail!("missing required argument: --{ARG_PUBLIC_RSA_KEY}");
        };
        let Some(private_rsa_key) = get_non_empty(ARG_PRIVATE_RSA_KEY) else {
            anyhow::bail!("missing required argument: --{ARG_PRIVATE_RSA_KEY}");
        };

        Ok(Self {
            public_rsa_key,
            private_rsa_key: SecretString::from(private_rsa_key),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PUBLIC_RSA_KEY)
                .long(ARG_PUBLIC_RSA_KEY)
                .help("Base64 encoded RSA public key (PEM or DER) used to verify tokens")
                .env("FASTSURVEY_PUBLIC_RSA_KEY"),
        )
        .arg(
            Arg::new(ARG_PRIVATE_RSA_KEY)
                .long(ARG_PRIVATE_RSA_KEY)
                .help("Base64 encoded RSA private key (PEM or DER) used to sign tokens")
                .env("FASTSURVEY_PRIVATE_RSA_KEY")
                .hide_env_values(true),
        )
}
