//! Serve command - Host the automation API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use trdp_api::ServerConfig;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Catalog directory (overrides the config file)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

/// Resolve the server configuration; flags win over file values.
pub fn resolve_config(args: &ServeArgs) -> Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = args.bind {
        config = config.bind(bind);
    }
    if let Some(catalog) = &args.catalog {
        config = config.catalog_dir(catalog.clone());
    }
    Ok(config)
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    trdp_api::serve(config)
        .await
        .context("Automation API server stopped with an error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_config() {
        let args = ServeArgs {
            config: None,
            bind: None,
            catalog: None,
        };
        assert_eq!(resolve_config(&args).unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"127.0.0.1:9100\"").unwrap();
        writeln!(file, "catalog_dir = \"/srv/trdp\"").unwrap();
        writeln!(file, "application_name = \"bench\"").unwrap();

        let args = ServeArgs {
            config: Some(file.path().to_path_buf()),
            bind: Some("0.0.0.0:9200".parse().unwrap()),
            catalog: None,
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.bind.port(), 9200);
        assert_eq!(config.catalog_dir, PathBuf::from("/srv/trdp"));
        assert_eq!(config.application_name, "bench");
    }

    #[test]
    fn test_bad_config_file_is_an_error() {
        let args = ServeArgs {
            config: Some(PathBuf::from("/nonexistent/trdp.toml")),
            bind: None,
            catalog: None,
        };
        assert!(resolve_config(&args).is_err());
    }
}
