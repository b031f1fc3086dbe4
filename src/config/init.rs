// ABOUTME: Config scaffolding for new harnesses.
// ABOUTME: Creates config/base_config.yml template files.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::Config;

/// Write a commented template for `environment` to
/// `<dir>/config/base_config.yml` and return its path.
pub fn init_config(dir: &Path, environment: &str, force: bool) -> Result<PathBuf> {
    let config_path = Config::default_path(dir);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config_path, generate_template_yaml(environment))?;

    Ok(config_path)
}

fn generate_template_yaml(environment: &str) -> String {
    format!(
        r#"{environment}:
  ssh:
    # Try keys held by the SSH agent before the key file.
    use_ssh_agent: false
    # rsa, dsa, ecdsa or ed25519
    key_type: rsa
    # key_path: ~/.ssh/id_rsa
    # key_password:
    #   env: QUALL_KEY_PASSWORD
    # Reject hosts missing from, or changed in, known_hosts.
    check_host_keys: false
    # known_hosts_path: ~/.ssh/known_hosts
    # auth_methods: [agent, key, password]
    connect_timeout: 30s
  webdriver:
    start_selenium: false
    # selenium_location: /opt/selenium/selenium-server-standalone.jar
    # selenium_port: 4444
    selenium_args: ""
    shutdown_grace: 30s
    command_executor: http://localhost
    driver: Chrome
    desired_capabilities_base: CHROME
"#
    )
}
