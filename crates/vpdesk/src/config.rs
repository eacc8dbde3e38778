//! CLI configuration: a thin layer over `vpdesk_config` that applies the
//! global flag overrides (--api-url, --token, --insecure, --timeout).

use secrecy::SecretString;

use vpdesk_core::{GatewayConfig, SessionConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use vpdesk_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config, store_token,
};

/// Everything a VP command needs to talk to the server.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build gateway and session settings from the config file, the active
/// profile, and CLI overrides. Flags win over the profile.
///
/// Without a matching profile, `--api-url` and a token are enough.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.api_url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };
    apply_overrides(&mut profile, global);

    let token = match global.token {
        Some(ref token) => SecretString::from(token.clone()),
        None => vpdesk_config::resolve_token(&profile, &profile_name)?,
    };

    let gateway = vpdesk_config::profile_to_gateway_config(&profile, &cfg.defaults, token)?;
    let session = vpdesk_config::profile_to_session_config(&profile, &cfg.defaults);

    Ok(Resolved {
        profile_name,
        gateway,
        session,
    })
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
