//! Configuration for voltdoor.
//!
//! CLI arguments with environment-variable fallbacks via clap. The binary
//! loads a `.env` file first, so every option can live there too.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::error::Error;

const DEV_STATIC_DIR: &str = "../volt.link-frontend/build/";
const PROD_STATIC_DIR: &str = "../volt.link-frontend/";
const DEV_GRAPHQL_URL: &str = "http://localhost:4004/graphql/v1/";
const PROD_GRAPHQL_URL: &str = "https://api.volt.link/graphql/v1/";

/// voltdoor - front door for VoltLink
#[derive(Parser, Debug, Clone)]
#[command(name = "voltdoor")]
#[command(about = "Serves VoltLink assets, resolves slugs and renders shells")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:4003")]
    pub listen: SocketAddr,

    /// Development mode: local frontend build and local content graph
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Directory holding the client build (index.html and assets)
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Content-graph GraphQL endpoint
    #[arg(long, env = "GRAPHQL_URL")]
    pub graphql_url: Option<String>,

    /// Image proxy used for social-preview images
    #[arg(long, env = "IMAGE_PROXY_URL", default_value = "https://api.volt.link/download_url")]
    pub image_proxy_url: String,

    /// Product domain; it and its subdomains pass CORS
    #[arg(long, env = "SITE_DOMAIN", default_value = "volt.link")]
    pub site_domain: String,

    /// host:port suffixes of local development origins that pass CORS
    #[arg(
        long,
        env = "DEV_ORIGINS",
        value_delimiter = ',',
        default_value = "localhost:3000,localhost:4000,0.0.0.0:3000,0.0.0.0:4000,localhost:19006"
    )]
    pub dev_origins: Vec<String>,

    /// Shell title when no record supplies one
    #[arg(long, env = "DEFAULT_TITLE", default_value = "VoltLink")]
    pub default_title: String,

    /// Shell description when no record supplies a title
    #[arg(
        long,
        env = "DEFAULT_DESCRIPTION",
        default_value = "VoltLink is an information-hub about Volt Europa."
    )]
    pub default_description: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Asset directory, defaulting by mode.
    pub fn static_dir(&self) -> PathBuf {
        self.static_dir.clone().unwrap_or_else(|| {
            PathBuf::from(if self.dev_mode { DEV_STATIC_DIR } else { PROD_STATIC_DIR })
        })
    }

    /// Content-graph endpoint, defaulting by mode.
    pub fn graphql_url(&self) -> String {
        self.graphql_url.clone().unwrap_or_else(|| {
            (if self.dev_mode { DEV_GRAPHQL_URL } else { PROD_GRAPHQL_URL }).to_owned()
        })
    }

    /// The shell template inside the asset directory.
    pub fn template_path(&self) -> PathBuf {
        self.static_dir().join("index.html")
    }

    pub fn validate(&self) -> Result<(), Error> {
        let graphql_url = self.graphql_url();
        if !is_http_url(&graphql_url) {
            return Err(Error::Config(format!("GRAPHQL_URL must be an http(s) URL, got `{graphql_url}`")));
        }
        if !is_http_url(&self.image_proxy_url) {
            return Err(Error::Config(format!(
                "IMAGE_PROXY_URL must be an http(s) URL, got `{}`",
                self.image_proxy_url
            )));
        }
        if self.site_domain.trim().is_empty() {
            return Err(Error::Config("SITE_DOMAIN must not be empty".to_owned()));
        }
        Ok(())
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}
